//! NEON spectral multiply for AArch64.

use core::arch::aarch64::*;

use super::{check_operands, real_bins, MultiplierKind, SpectralMultiplier};
use crate::error::ConvolverError;
use crate::pack::{BLOCK, DC_OFFSET, LANES, NYQUIST_OFFSET};

/// 4-wide NEON strategy. Obtained through [`super::multiplier_for`], which
/// checks CPU support first.
#[derive(Debug)]
#[non_exhaustive]
pub struct NeonMultiplier;

impl SpectralMultiplier for NeonMultiplier {
    fn kind(&self) -> MultiplierKind {
        MultiplierKind::Neon
    }

    fn multiply_accumulate(
        &self,
        signal: &[f32],
        filter: &[f32],
        acc: &mut [f32],
    ) -> Result<(), ConvolverError> {
        check_operands(signal, filter, acc)?;
        // Safety: construction is gated on runtime NEON detection and the
        // operand lengths were checked to be equal whole blocks.
        unsafe { multiply_accumulate_neon(signal, filter, acc) };
        Ok(())
    }
}

// Separate multiply and subtract/add rather than vmlaq/vfmaq keeps results
// identical to the scalar strategy.
#[target_feature(enable = "neon")]
unsafe fn multiply_accumulate_neon(signal: &[f32], filter: &[f32], acc: &mut [f32]) {
    let (dc, nyquist) = real_bins(signal, filter, acc);
    let s = signal.as_ptr();
    let f = filter.as_ptr();
    let a = acc.as_mut_ptr();
    for block in 0..acc.len() / BLOCK {
        let re = block * BLOCK;
        let im = re + LANES;
        let s_re = vld1q_f32(s.add(re));
        let s_im = vld1q_f32(s.add(im));
        let f_re = vld1q_f32(f.add(re));
        let f_im = vld1q_f32(f.add(im));
        let prod_re = vsubq_f32(vmulq_f32(s_re, f_re), vmulq_f32(s_im, f_im));
        let prod_im = vaddq_f32(vmulq_f32(s_re, f_im), vmulq_f32(s_im, f_re));
        vst1q_f32(a.add(re), vaddq_f32(vld1q_f32(a.add(re)), prod_re));
        vst1q_f32(a.add(im), vaddq_f32(vld1q_f32(a.add(im)), prod_im));
    }
    acc[DC_OFFSET] = dc;
    acc[NYQUIST_OFFSET] = nyquist;
}
