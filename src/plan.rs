//! Transform planning on top of `realfft`.
//!
//! The convolution core needs exactly two things from an FFT library: a
//! real-to-half-complex forward transform and its unnormalised inverse,
//! both executed in place on a caller-owned buffer. [`HalfComplexPlan`]
//! wraps one direction of a `realfft` plan and converts between the
//! library's `n/2 + 1` complex bins and the half-complex layout
//! `[r0, r1, .., r(n/2), i(n/2-1), .., i1]`. [`PlanCache`] keeps one
//! forward/inverse pair alive for the current working length.

use std::sync::Arc;

use log::debug;
use realfft::num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::error::ConvolverError;

/// Number of bits an `f32` sample must occupy for the blocked spectral layout.
pub const SAMPLE_BITS: u32 = 32;

/// Mantissa digits of an IEEE-754 single.
const SINGLE_MANTISSA_DIGITS: u32 = 24;

/// Verify that `f32` is a 32-bit IEEE single.
///
/// The vector multipliers load four samples into one 128-bit register; any
/// other representation would silently break that layout.
pub fn check_sample_width() -> Result<(), ConvolverError> {
    let bits = (core::mem::size_of::<f32>() * 8) as u32;
    if bits != SAMPLE_BITS || f32::MANTISSA_DIGITS != SINGLE_MANTISSA_DIGITS {
        return Err(ConvolverError::UnsupportedSampleWidth { bits });
    }
    Ok(())
}

/// Transform direction of a [`HalfComplexPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Real samples to half-complex spectrum.
    Forward,
    /// Half-complex spectrum to real samples, without `1/n` scaling.
    Inverse,
}

enum Kernel {
    Forward(Arc<dyn RealToComplex<f32>>),
    Inverse(Arc<dyn ComplexToReal<f32>>),
}

/// One planned transform of a fixed length and direction.
pub struct HalfComplexPlan {
    len: usize,
    kernel: Kernel,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl HalfComplexPlan {
    /// Plan a transform of `len` samples.
    ///
    /// A throwaway planner is used so the library's own plan cache never
    /// keeps a plan alive past the owner of this value.
    pub fn new(len: usize, direction: Direction) -> Result<Self, ConvolverError> {
        if len < 2 || len % 2 != 0 {
            return Err(ConvolverError::InvalidLength { len });
        }
        let mut planner = RealFftPlanner::<f32>::new();
        let (kernel, spectrum, scratch) = match direction {
            Direction::Forward => {
                let r2c = planner.plan_fft_forward(len);
                let spectrum = r2c.make_output_vec();
                let scratch = r2c.make_scratch_vec();
                (Kernel::Forward(r2c), spectrum, scratch)
            }
            Direction::Inverse => {
                let c2r = planner.plan_fft_inverse(len);
                let spectrum = c2r.make_input_vec();
                let scratch = c2r.make_scratch_vec();
                (Kernel::Inverse(c2r), spectrum, scratch)
            }
        };
        Ok(Self {
            len,
            kernel,
            spectrum,
            scratch,
        })
    }

    /// Number of real samples the plan transforms.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; a plan covers at least two samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Execute the transform in place on `buf`.
    pub fn execute(&mut self, buf: &mut [f32]) -> Result<(), ConvolverError> {
        if buf.len() != self.len {
            return Err(ConvolverError::LengthMismatch {
                expected: self.len,
                actual: buf.len(),
            });
        }
        let n = self.len;
        let half = n / 2;
        match &self.kernel {
            Kernel::Forward(r2c) => {
                // realfft uses its input as workspace, so `buf` is free to
                // receive the half-complex result afterwards.
                r2c.process_with_scratch(buf, &mut self.spectrum, &mut self.scratch)?;
                for (k, bin) in self.spectrum.iter().enumerate().take(half + 1) {
                    buf[k] = bin.re;
                }
                for k in 1..half {
                    buf[n - k] = self.spectrum[k].im;
                }
            }
            Kernel::Inverse(c2r) => {
                self.spectrum[0] = Complex32::new(buf[0], 0.0);
                for k in 1..half {
                    self.spectrum[k] = Complex32::new(buf[k], buf[n - k]);
                }
                self.spectrum[half] = Complex32::new(buf[half], 0.0);
                c2r.process_with_scratch(&mut self.spectrum, buf, &mut self.scratch)?;
            }
        }
        Ok(())
    }
}

/// Forward and inverse plans sharing one length.
pub struct PlanPair {
    pub forward: HalfComplexPlan,
    pub inverse: HalfComplexPlan,
}

impl PlanPair {
    pub fn new(len: usize) -> Result<Self, ConvolverError> {
        Ok(Self {
            forward: HalfComplexPlan::new(len, Direction::Forward)?,
            inverse: HalfComplexPlan::new(len, Direction::Inverse)?,
        })
    }
}

/// Owns the plan pair for the current working length.
///
/// Re-planning drops the previous pair before the new one is built, so two
/// pairs never coexist.
pub struct PlanCache {
    len: usize,
    plans: Option<PlanPair>,
}

impl PlanCache {
    pub fn new(len: usize) -> Result<Self, ConvolverError> {
        debug!("planning transforms of length {len}");
        Ok(Self {
            len,
            plans: Some(PlanPair::new(len)?),
        })
    }

    /// Length the cached plans were built for, zero after a failed re-plan.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no plan pair is held, as after a failed re-plan.
    pub fn is_empty(&self) -> bool {
        self.plans.is_none()
    }

    /// Make sure plans for `len` exist. Returns `true` if a re-plan happened.
    pub fn ensure(&mut self, len: usize) -> Result<bool, ConvolverError> {
        if self.plans.is_some() && self.len == len {
            return Ok(false);
        }
        debug!("re-planning transforms: {} -> {len}", self.len);
        self.plans = None;
        self.len = 0;
        let pair = PlanPair::new(len)?;
        self.plans = Some(pair);
        self.len = len;
        Ok(true)
    }

    pub fn forward(&mut self, buf: &mut [f32]) -> Result<(), ConvolverError> {
        self.pair_mut()?.forward.execute(buf)
    }

    pub fn inverse(&mut self, buf: &mut [f32]) -> Result<(), ConvolverError> {
        self.pair_mut()?.inverse.execute(buf)
    }

    fn pair_mut(&mut self) -> Result<&mut PlanPair, ConvolverError> {
        let len = self.len;
        self.plans
            .as_mut()
            .ok_or(ConvolverError::InvalidLength { len })
    }
}
