//! Shared inputs for the hcconv benchmarks.

/// Deterministic test signal of `len` samples in `[-1, 1]`.
pub fn signal(len: usize) -> Vec<f32> {
    (0..len).map(|i| ((i * 7919) % 2000) as f32 / 1000.0 - 1.0).collect()
}

/// Exponentially decaying impulse response of `len` samples.
pub fn decaying_ir(len: usize) -> Vec<f32> {
    (0..len).map(|i| (-(i as f32) / (len as f32 / 4.0)).exp()).collect()
}
