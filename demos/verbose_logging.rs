//! Demonstrates enabling verbose logging for hcconv.
use hcconv::Convolver;

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .init();

    let mut conv = Convolver::new(8).unwrap();
    conv.set_time_domain_filter(&[]);
    conv.set_time_domain_filter(&[0.25; 12]);
    conv.convolve(&[1.0; 100], 1.0).unwrap();
    conv.convolve(&[1.0; 3], 1.0).unwrap();
}
