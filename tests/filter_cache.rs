// Test intent: verifies filter-spectrum caching, invalidation on resize and the pre-packed filter path.
use hcconv::{Convolver, ConvolverError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_vec(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

fn fresh_result(filter: &[f32], signal: &[f32]) -> Vec<f32> {
    let mut conv = Convolver::new(8).expect("Invariant: operation should succeed");
    conv.set_time_domain_filter(filter);
    conv.convolve(signal, 1.0)
        .expect("Invariant: operation should succeed")
}

#[test]
fn resize_up_and_down_matches_fresh_engines() {
    let mut rng = StdRng::seed_from_u64(5);
    let filter = random_vec(&mut rng, 31);
    let short = random_vec(&mut rng, 50);
    let long = random_vec(&mut rng, 700);

    let mut conv = Convolver::new(8).expect("Invariant: operation should succeed");
    conv.set_time_domain_filter(&filter);

    let a = conv.convolve(&short, 1.0).unwrap();
    assert_eq!(conv.working_len(), 128);
    let b = conv.convolve(&long, 1.0).unwrap();
    assert_eq!(conv.working_len(), 1024);
    let c = conv.convolve(&short, 1.0).unwrap();
    assert_eq!(conv.working_len(), 128);

    assert!(max_abs_diff(&a, &fresh_result(&filter, &short)) < 1e-5);
    assert!(max_abs_diff(&b, &fresh_result(&filter, &long)) < 1e-5);
    assert!(max_abs_diff(&c, &fresh_result(&filter, &short)) < 1e-5);
    assert!(max_abs_diff(&a, &c) < 1e-6);
}

#[test]
fn spectrum_is_cached_until_resize() {
    let mut conv = Convolver::new(8).expect("Invariant: operation should succeed");
    conv.set_time_domain_filter(&[0.5, 0.25]);
    assert!(!conv.has_cached_spectrum());
    conv.convolve(&[1.0; 5], 1.0).unwrap();
    assert!(conv.has_cached_spectrum());
    conv.convolve(&[2.0; 7], 1.0).unwrap();
    assert_eq!(conv.working_len(), 8);
    assert!(conv.has_cached_spectrum());
    conv.convolve(&[1.0; 20], 1.0).unwrap();
    assert_eq!(conv.working_len(), 32);
    assert!(conv.has_cached_spectrum());
}

#[test]
fn prepared_spectrum_matches_time_domain_filter() {
    let mut rng = StdRng::seed_from_u64(9);
    let filter = random_vec(&mut rng, 40);
    let signal = random_vec(&mut rng, 200);

    let mut time_domain = Convolver::new(8).expect("Invariant: operation should succeed");
    time_domain.set_time_domain_filter(&filter);
    let expected = time_domain.convolve(&signal, 0.75).unwrap();
    let len = time_domain.working_len();

    let spectrum = Convolver::prepare_impulse_response(&filter, len)
        .expect("Invariant: operation should succeed");
    let mut prepared = Convolver::new(len).expect("Invariant: operation should succeed");
    assert!(prepared.set_frequency_domain_filter(&spectrum));
    let out = prepared.convolve(&signal, 0.75).unwrap();

    assert_eq!(prepared.working_len(), len);
    assert!(max_abs_diff(&out, &expected) < 1e-5);
}

#[test]
fn one_engine_serves_many_prepared_filters() {
    let mut rng = StdRng::seed_from_u64(21);
    let signal = random_vec(&mut rng, 100);
    let filters: Vec<Vec<f32>> = (0..4).map(|_| random_vec(&mut rng, 20)).collect();
    let spectra: Vec<Vec<f32>> = filters
        .iter()
        .map(|f| Convolver::prepare_impulse_response(f, 128).unwrap())
        .collect();

    let mut conv = Convolver::new(128).expect("Invariant: operation should succeed");
    for (filter, spectrum) in filters.iter().zip(spectra.iter()) {
        assert!(conv.set_frequency_domain_filter(spectrum));
        let out = conv.convolve(&signal, 1.0).unwrap();
        assert!(max_abs_diff(&out, &fresh_result(filter, &signal)) < 1e-5);
    }
}

#[test]
fn time_domain_filter_replaces_prepared_spectrum() {
    let mut conv = Convolver::new(16).expect("Invariant: operation should succeed");
    let spectrum = Convolver::prepare_impulse_response(&[0.0, 0.0, 1.0], 16).unwrap();
    assert!(conv.set_frequency_domain_filter(&spectrum));
    let delayed = conv.convolve(&[1.0, 2.0], 1.0).unwrap();
    assert!((delayed[2] - 1.0).abs() < 1e-5 && (delayed[3] - 2.0).abs() < 1e-5);

    assert!(conv.set_time_domain_filter(&[1.0]));
    let direct = conv.convolve(&[1.0, 2.0], 1.0).unwrap();
    assert_eq!(direct.len(), 8);
    assert!((direct[0] - 1.0).abs() < 1e-5 && (direct[1] - 2.0).abs() < 1e-5);
}

#[test]
fn invalid_filters_keep_last_known_good() {
    let mut conv = Convolver::new(16).expect("Invariant: operation should succeed");
    conv.set_time_domain_filter(&[2.0]);
    assert!(!conv.set_time_domain_filter(&[]));
    assert!(!conv.set_frequency_domain_filter(&[1.0; 8]));
    assert!(!conv.set_frequency_domain_filter(&[]));
    let out = conv.convolve(&[1.0], 1.0).unwrap();
    assert!((out[0] - 2.0).abs() < 1e-5);

    conv.reset_filter();
    let out = conv.convolve(&[1.0], 1.0).unwrap();
    assert!((out[0] - 1.0).abs() < 1e-5);
}

#[test]
fn prepare_checks_target_length() {
    assert_eq!(
        Convolver::prepare_impulse_response(&[1.0], 4),
        Err(ConvolverError::InvalidLength { len: 4 })
    );
    let spectrum = Convolver::prepare_impulse_response(&[1.0], 8).unwrap();
    // unit impulse: every real part is one, every imaginary part zero
    assert_eq!(spectrum.len(), 8);
    for (i, v) in spectrum.iter().enumerate() {
        let expected = if i <= 4 { 1.0 } else { 0.0 };
        assert!((v - expected).abs() < 1e-6, "[{i}] {v}");
    }
}
