//! SSE spectral multiply for x86_64.

use core::arch::x86_64::*;

use super::{check_operands, real_bins, MultiplierKind, SpectralMultiplier};
use crate::error::ConvolverError;
use crate::pack::{BLOCK, DC_OFFSET, LANES, NYQUIST_OFFSET};

/// 4-wide SSE strategy. Obtained through [`super::multiplier_for`], which
/// checks CPU support first.
#[derive(Debug)]
#[non_exhaustive]
pub struct SseMultiplier;

impl SpectralMultiplier for SseMultiplier {
    fn kind(&self) -> MultiplierKind {
        MultiplierKind::Sse
    }

    fn multiply_accumulate(
        &self,
        signal: &[f32],
        filter: &[f32],
        acc: &mut [f32],
    ) -> Result<(), ConvolverError> {
        check_operands(signal, filter, acc)?;
        // Safety: construction is gated on runtime SSE detection and the
        // operand lengths were checked to be equal whole blocks.
        unsafe { multiply_accumulate_sse(signal, filter, acc) };
        Ok(())
    }
}

#[target_feature(enable = "sse")]
unsafe fn multiply_accumulate_sse(signal: &[f32], filter: &[f32], acc: &mut [f32]) {
    let (dc, nyquist) = real_bins(signal, filter, acc);
    let s = signal.as_ptr();
    let f = filter.as_ptr();
    let a = acc.as_mut_ptr();
    for block in 0..acc.len() / BLOCK {
        let re = block * BLOCK;
        let im = re + LANES;
        let s_re = _mm_loadu_ps(s.add(re));
        let s_im = _mm_loadu_ps(s.add(im));
        let f_re = _mm_loadu_ps(f.add(re));
        let f_im = _mm_loadu_ps(f.add(im));
        let prod_re = _mm_sub_ps(_mm_mul_ps(s_re, f_re), _mm_mul_ps(s_im, f_im));
        let prod_im = _mm_add_ps(_mm_mul_ps(s_re, f_im), _mm_mul_ps(s_im, f_re));
        _mm_storeu_ps(a.add(re), _mm_add_ps(_mm_loadu_ps(a.add(re)), prod_re));
        _mm_storeu_ps(a.add(im), _mm_add_ps(_mm_loadu_ps(a.add(im)), prod_im));
    }
    acc[DC_OFFSET] = dc;
    acc[NYQUIST_OFFSET] = nyquist;
}
