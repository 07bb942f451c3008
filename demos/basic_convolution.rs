//! Basic usage example for hcconv
//!
//! Convolves a short signal with a few impulse responses, then reuses one
//! engine with pre-packed filter spectra.

use hcconv::{linear_len, Convolver};

fn main() -> Result<(), hcconv::ConvolverError> {
    println!("=== hcconv Basic Usage Example ===\n");

    let signal = [1.0f32, 2.0, 3.0, 4.0];
    let mut conv = Convolver::new(8)?;
    println!("Multiplier: {}", conv.multiplier_kind());

    // 1. Identity filter
    println!("1. Identity filter");
    let out = conv.convolve(&signal, 1.0)?;
    println!("   Output: {:?}\n", out);

    // 2. Moving average, trimmed to the linear convolution length
    println!("2. Two-tap moving average");
    let filter = [0.5f32, 0.5];
    conv.set_time_domain_filter(&filter);
    let mut out = conv.convolve(&signal, 1.0)?;
    out.truncate(linear_len(signal.len(), filter.len()));
    println!(
        "   Output: {:?}",
        out.iter().map(|v| format!("{:.2}", v)).collect::<Vec<_>>()
    );
    println!("   Working length: {}\n", conv.working_len());

    // 3. Pre-packed spectra for one engine
    println!("3. Pre-packed filters");
    let len = conv.working_len();
    for delay in 0..3 {
        let mut ir = vec![0.0f32; delay + 1];
        ir[delay] = 1.0;
        let spectrum = Convolver::prepare_impulse_response(&ir, len)?;
        conv.set_frequency_domain_filter(&spectrum);
        let out = conv.convolve(&signal, 2.0)?;
        println!(
            "   delay {delay}: {:?}",
            out.iter().map(|v| format!("{:.1}", v)).collect::<Vec<_>>()
        );
    }
    Ok(())
}
