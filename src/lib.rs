//! # hcconv - non-partitioned FFT convolution
//!
//! Convolves a whole signal with a fixed impulse response in one FFT, for
//! offline work where accuracy matters more than latency (applying a room
//! or filter response to recorded audio, for example).
//!
//! ## Features
//!
//! - **Exact linear convolution**: the transform length is always large
//!   enough that circular convolution equals linear convolution
//! - **Cached filter spectrum**: re-planned and recomputed only when the
//!   working length or the filter changes
//! - **Half-complex packing**: spectra are regrouped into blocks of four
//!   real and four imaginary parts for 4-wide complex arithmetic
//! - **SIMD spectral multiply**: SSE on x86_64, NEON on AArch64, portable
//!   scalar fallback, chosen once at runtime
//!
//! ## Cargo Features
//!
//! - `simd` (default): enable the vector multipliers
//!
//! ## Environment
//!
//! - `HCCONV_FORCE_SCALAR`: any value other than `0` forces the scalar
//!   multiplier
//!
//! ## Example
//!
//! ```
//! use hcconv::Convolver;
//!
//! let mut conv = Convolver::new(8)?;
//! let out = conv.convolve(&[1.0, 2.0, 3.0, 4.0], 1.0)?;
//! assert!((out[2] - 3.0).abs() < 1e-5);
//! # Ok::<(), hcconv::ConvolverError>(())
//! ```
//!
//! ## License
//!
//! Licensed under either of
//! - Apache License, Version 2.0 (https://www.apache.org/licenses/LICENSE-2.0)
//! - MIT license (https://opensource.org/licenses/MIT)
//!
//! at your option.

/// Convolution engine
///
/// Sizing, filter caching and the per-call transform pipeline.
pub mod convolver;

/// Error type shared by every module.
pub mod error;

/// Complex multiply-accumulate of packed spectra
///
/// Scalar and SIMD strategies behind one trait.
pub mod multiply;

/// Half-complex spectrum packing
///
/// Closed-form permutation between half-complex and blocked order.
pub mod pack;

/// Forward and inverse half-complex transforms on top of `realfft`.
pub mod plan;

pub use convolver::{linear_len, required_working_len, Convolver, DEFAULT_WORKING_LEN};
pub use error::ConvolverError;
pub use multiply::{MultiplierKind, SpectralMultiplier};
