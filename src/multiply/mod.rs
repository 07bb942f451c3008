//! Complex multiply-accumulate of packed spectra.
//!
//! Both operands and the accumulator are in the blocked layout produced by
//! [`crate::pack`]. For every block and lane `k`:
//!
//! ```text
//! acc.re[k] += s.re[k] * f.re[k] - s.im[k] * f.im[k]
//! acc.im[k] += s.re[k] * f.im[k] + s.im[k] * f.re[k]
//! ```
//!
//! DC (offset 0) and Nyquist (offset 4) are real-only and get a plain real
//! product instead. The block loop treats them like any other lane, so their
//! results are computed up front and written back after the loop.
//!
//! Strategies are chosen once per process by [`detect`]; [`new_multiplier`]
//! hands out the best one available.

use core::fmt;
use std::sync::OnceLock;

use log::debug;

use crate::error::ConvolverError;
use crate::pack::{check_len, BLOCK, DC_OFFSET, LANES, NYQUIST_OFFSET};

#[cfg(all(feature = "simd", target_arch = "aarch64"))]
mod neon;
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod sse;

#[cfg(all(feature = "simd", target_arch = "aarch64"))]
pub use neon::NeonMultiplier;
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
pub use sse::SseMultiplier;

/// Environment variable that forces the scalar strategy when set to anything
/// other than `0` or the empty string.
pub const FORCE_SCALAR_ENV: &str = "HCCONV_FORCE_SCALAR";

static DETECTED: OnceLock<MultiplierKind> = OnceLock::new();

/// Available spectral multiply strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiplierKind {
    /// Portable per-element loop.
    Scalar,
    /// 4-wide SSE on x86_64.
    Sse,
    /// 4-wide NEON on AArch64.
    Neon,
}

impl MultiplierKind {
    pub fn name(self) -> &'static str {
        match self {
            MultiplierKind::Scalar => "scalar",
            MultiplierKind::Sse => "sse",
            MultiplierKind::Neon => "neon",
        }
    }
}

impl fmt::Display for MultiplierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Multiply-accumulate of two packed spectra.
pub trait SpectralMultiplier: Send + Sync {
    fn kind(&self) -> MultiplierKind;

    /// Accumulate `signal * filter` into `acc`.
    ///
    /// All slices must have the same length, a multiple of [`BLOCK`].
    /// `acc` must be zeroed by the caller to obtain a plain product.
    fn multiply_accumulate(
        &self,
        signal: &[f32],
        filter: &[f32],
        acc: &mut [f32],
    ) -> Result<(), ConvolverError>;
}

/// Portable strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarMultiplier;

impl SpectralMultiplier for ScalarMultiplier {
    fn kind(&self) -> MultiplierKind {
        MultiplierKind::Scalar
    }

    fn multiply_accumulate(
        &self,
        signal: &[f32],
        filter: &[f32],
        acc: &mut [f32],
    ) -> Result<(), ConvolverError> {
        check_operands(signal, filter, acc)?;
        let (dc, nyquist) = real_bins(signal, filter, acc);
        for ((s, f), a) in signal
            .chunks_exact(BLOCK)
            .zip(filter.chunks_exact(BLOCK))
            .zip(acc.chunks_exact_mut(BLOCK))
        {
            for k in 0..LANES {
                let (sr, si) = (s[k], s[k + LANES]);
                let (fr, fi) = (f[k], f[k + LANES]);
                a[k] += sr * fr - si * fi;
                a[k + LANES] += sr * fi + si * fr;
            }
        }
        acc[DC_OFFSET] = dc;
        acc[NYQUIST_OFFSET] = nyquist;
        Ok(())
    }
}

/// Validate operand lengths shared by every strategy.
pub(crate) fn check_operands(
    signal: &[f32],
    filter: &[f32],
    acc: &[f32],
) -> Result<(), ConvolverError> {
    let len = acc.len();
    check_len(len)?;
    for other in [signal.len(), filter.len()] {
        if other != len {
            return Err(ConvolverError::LengthMismatch {
                expected: len,
                actual: other,
            });
        }
    }
    Ok(())
}

/// Accumulated DC and Nyquist values, computed before the block loop
/// overwrites their slots.
#[inline(always)]
pub(crate) fn real_bins(signal: &[f32], filter: &[f32], acc: &[f32]) -> (f32, f32) {
    (
        acc[DC_OFFSET] + signal[DC_OFFSET] * filter[DC_OFFSET],
        acc[NYQUIST_OFFSET] + signal[NYQUIST_OFFSET] * filter[NYQUIST_OFFSET],
    )
}

/// Whether the running CPU and build support `kind`.
pub fn is_supported(kind: MultiplierKind) -> bool {
    match kind {
        MultiplierKind::Scalar => true,
        MultiplierKind::Sse => sse_available(),
        MultiplierKind::Neon => neon_available(),
    }
}

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
fn sse_available() -> bool {
    std::arch::is_x86_feature_detected!("sse")
}

#[cfg(not(all(feature = "simd", target_arch = "x86_64")))]
fn sse_available() -> bool {
    false
}

#[cfg(all(feature = "simd", target_arch = "aarch64"))]
fn neon_available() -> bool {
    std::arch::is_aarch64_feature_detected!("neon")
}

#[cfg(not(all(feature = "simd", target_arch = "aarch64")))]
fn neon_available() -> bool {
    false
}

fn force_scalar() -> bool {
    std::env::var(FORCE_SCALAR_ENV)
        .map(|v| !v.is_empty() && v != "0")
        .unwrap_or(false)
}

/// Best strategy for this process, resolved once.
pub fn detect() -> MultiplierKind {
    *DETECTED.get_or_init(|| {
        let kind = if force_scalar() {
            MultiplierKind::Scalar
        } else if is_supported(MultiplierKind::Sse) {
            MultiplierKind::Sse
        } else if is_supported(MultiplierKind::Neon) {
            MultiplierKind::Neon
        } else {
            MultiplierKind::Scalar
        };
        debug!("spectral multiplier: {kind}");
        kind
    })
}

/// Build the strategy for `kind`, or `None` if it is not available here.
pub fn multiplier_for(kind: MultiplierKind) -> Option<Box<dyn SpectralMultiplier>> {
    match kind {
        MultiplierKind::Scalar => Some(Box::new(ScalarMultiplier)),
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        MultiplierKind::Sse if sse_available() => Some(Box::new(SseMultiplier)),
        #[cfg(all(feature = "simd", target_arch = "aarch64"))]
        MultiplierKind::Neon if neon_available() => Some(Box::new(NeonMultiplier)),
        _ => None,
    }
}

/// Capability-checked factory returning the best available strategy.
pub fn new_multiplier() -> Box<dyn SpectralMultiplier> {
    multiplier_for(detect()).unwrap_or_else(|| Box::new(ScalarMultiplier))
}
