/// Grow `buf` to at least `len` elements, doubling so repeated growth stays amortized.
///
/// Never shrinks; existing contents are kept.
pub(crate) fn ensure_len<T: Copy + Default>(buf: &mut Vec<T>, len: usize) {
    if buf.len() < len {
        let target = len.max(buf.len() * 2);
        buf.resize(target, T::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_geometrically_and_never_shrinks() {
        let mut buf: Vec<f64> = Vec::new();
        ensure_len(&mut buf, 5);
        assert_eq!(buf.len(), 5);
        ensure_len(&mut buf, 6);
        assert_eq!(buf.len(), 10);
        ensure_len(&mut buf, 3);
        assert_eq!(buf.len(), 10);
    }
}
