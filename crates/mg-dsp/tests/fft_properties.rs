//! FFT engine against its inverse and against `realfft`.

use std::sync::Arc;

use mg_dsp::fft::{FftEngine, TrigCache};
use realfft::RealFftPlanner;

fn signal(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            (0.013 * t * t).sin() + 0.5 * (0.3 * t).cos() - 0.1
        })
        .collect()
}

#[test]
fn complex_round_trip_every_size() {
    let fft = FftEngine::new();
    let mut n = 4;
    while n <= 4096 {
        let re0 = signal(n);
        let im0: Vec<f64> = signal(n).iter().rev().map(|v| v * 0.7).collect();
        let mut re = re0.clone();
        let mut im = im0.clone();
        fft.fft(&mut re, &mut im).expect("fft");
        fft.ifft(&mut re, &mut im).expect("ifft");
        for k in 0..n {
            assert!((re[k] - re0[k]).abs() < 1e-10, "n={n} re[{k}]");
            assert!((im[k] - im0[k]).abs() < 1e-10, "n={n} im[{k}]");
        }
        n *= 2;
    }
}

#[test]
fn real_transform_matches_realfft() {
    let fft = FftEngine::new();
    let mut planner = RealFftPlanner::<f64>::new();

    for n in [8, 16, 128, 1024, 4096] {
        let r2c = planner.plan_fft_forward(n);
        let mut input = r2c.make_input_vec();
        input.copy_from_slice(&signal(n));
        let mut spectrum = r2c.make_output_vec();
        r2c.process(&mut input, &mut spectrum).expect("realfft");

        let mut x = signal(n);
        let mut y = vec![0.0; n];
        fft.fftr(&mut x, &mut y).expect("fftr");

        let scale = n as f64;
        for (k, bin) in spectrum.iter().enumerate() {
            assert!((x[k] - bin.re).abs() < 1e-9 * scale, "n={n} re[{k}]");
            assert!((y[k] - bin.im).abs() < 1e-9 * scale, "n={n} im[{k}]");
        }
        // Hermitian upper half
        for k in 1..n / 2 {
            assert_eq!(x[n - k], x[k]);
            assert_eq!(y[n - k], -y[k]);
        }
    }
}

#[test]
fn shared_cache_serves_smaller_sizes() {
    let cache = TrigCache::shared();
    let big = FftEngine::with_cache(Arc::clone(&cache));
    let small = FftEngine::with_cache(Arc::clone(&cache));

    let mut x = signal(2048);
    let mut y = vec![0.0; 2048];
    big.fftr(&mut x, &mut y).expect("fftr 2048");
    assert_eq!(cache.capacity(), 2048);

    let mut a = signal(64);
    let mut b = vec![0.0; 64];
    small.fftr(&mut a, &mut b).expect("fftr 64");
    assert_eq!(cache.capacity(), 2048);

    let mut c = signal(64);
    let mut d = vec![0.0; 64];
    FftEngine::new().fftr(&mut c, &mut d).expect("private table");
    assert_eq!(a, c);
    assert_eq!(b, d);
}
