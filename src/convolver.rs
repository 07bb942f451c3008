//! Non-partitioned FFT convolution engine.
//!
//! [`Convolver`] convolves a whole signal with one impulse response per
//! call. The transform length follows the signal: every call picks the
//! smallest power of two that holds the full linear convolution, re-plans
//! only when that length changes, and keeps the packed filter spectrum
//! cached between calls of the same length.
//!
//! One engine must not be shared between threads while in use; every
//! mutating operation takes `&mut self`. Use one engine per stream.

use core::fmt;

use log::{debug, trace, warn};

use crate::error::ConvolverError;
use crate::multiply::{new_multiplier, MultiplierKind, SpectralMultiplier};
use crate::pack::{self, BLOCK};
use crate::plan::{check_sample_width, Direction, HalfComplexPlan, PlanCache};

/// Working length used by [`Convolver::default_sized`].
pub const DEFAULT_WORKING_LEN: usize = 1024;

/// Smallest working length; one packed block.
pub const MIN_WORKING_LEN: usize = BLOCK;

/// Length of the linear convolution of `signal_len` and `filter_len` samples.
pub fn linear_len(signal_len: usize, filter_len: usize) -> usize {
    if signal_len == 0 || filter_len == 0 {
        0
    } else {
        signal_len + filter_len - 1
    }
}

/// Smallest valid working length that holds the linear convolution of
/// `signal_len` and `filter_len` samples without circular aliasing.
pub fn required_working_len(signal_len: usize, filter_len: usize) -> usize {
    linear_len(signal_len, filter_len)
        .max(signal_len)
        .max(filter_len)
        .max(MIN_WORKING_LEN)
        .next_power_of_two()
}

fn check_working_len(len: usize) -> Result<(), ConvolverError> {
    if len < MIN_WORKING_LEN || !len.is_power_of_two() {
        return Err(ConvolverError::InvalidLength { len });
    }
    Ok(())
}

/// Relative level below which a recovered filter's tail counts as zero.
const RECOVERED_TAIL_LEVEL: f32 = 1.0e-6;

/// Number of leading samples of `filter` up to its last sample above
/// [`RECOVERED_TAIL_LEVEL`] of the peak; at least one.
fn filter_extent(filter: &[f32]) -> usize {
    let peak = filter.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    let floor = peak * RECOVERED_TAIL_LEVEL;
    filter
        .iter()
        .rposition(|v| v.abs() > floor)
        .map_or(1, |last| last + 1)
}

/// Allocate `len` zeroed samples, reporting allocation failure as an error.
fn zeroed(len: usize) -> Result<Vec<f32>, ConvolverError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ConvolverError::Allocation { len })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

/// Buffers whose length is the working length.
struct WorkBuffers {
    signal_spectrum: Vec<f32>,
    accumulator: Vec<f32>,
    pack_scratch: Vec<f32>,
    zero_fill: Vec<f32>,
}

impl WorkBuffers {
    fn new(len: usize) -> Result<Self, ConvolverError> {
        Ok(Self {
            signal_spectrum: zeroed(len)?,
            accumulator: zeroed(len)?,
            pack_scratch: zeroed(len)?,
            zero_fill: zeroed(len)?,
        })
    }
}

/// Which filter representation is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterSource {
    TimeDomain,
    Spectrum,
}

/// Single-call FFT convolution engine.
///
/// A new engine holds the identity filter (a unit impulse), so convolving
/// with it returns the signal scaled by the weighting factor.
///
/// # Example
/// ```
/// use hcconv::Convolver;
///
/// let mut conv = Convolver::new(8).unwrap();
/// conv.set_time_domain_filter(&[0.5, 0.5]);
/// let out = conv.convolve(&[1.0, 2.0, 3.0, 4.0], 1.0).unwrap();
/// assert_eq!(out.len(), 8);
/// assert!((out[1] - 1.5).abs() < 1e-5);
/// ```
pub struct Convolver {
    working_len: usize,
    filter: Vec<f32>,
    source: FilterSource,
    /// Packed spectrum of the filter; stale unless its length is `working_len`.
    filter_spectrum: Vec<f32>,
    buffers: WorkBuffers,
    plans: PlanCache,
    multiplier: Box<dyn SpectralMultiplier>,
}

impl Convolver {
    /// Create an engine with transforms planned for `working_len` samples.
    ///
    /// # Errors
    /// - [`ConvolverError::UnsupportedSampleWidth`] if `f32` is not a 32-bit
    ///   single; this is fatal, see [`ConvolverError::is_fatal`].
    /// - [`ConvolverError::InvalidLength`] unless `working_len` is a power of
    ///   two of at least [`MIN_WORKING_LEN`].
    /// - [`ConvolverError::Allocation`] if a working buffer cannot be
    ///   allocated; a smaller length may still succeed.
    pub fn new(working_len: usize) -> Result<Self, ConvolverError> {
        check_sample_width()?;
        check_working_len(working_len)?;
        let buffers = WorkBuffers::new(working_len)?;
        let plans = PlanCache::new(working_len)?;
        let multiplier = new_multiplier();
        debug!(
            "convolver ready: working length {working_len}, {} multiplier",
            multiplier.kind()
        );
        Ok(Self {
            working_len,
            filter: vec![1.0],
            source: FilterSource::TimeDomain,
            filter_spectrum: Vec::new(),
            buffers,
            plans,
            multiplier,
        })
    }

    /// Create an engine with [`DEFAULT_WORKING_LEN`].
    pub fn default_sized() -> Result<Self, ConvolverError> {
        Self::new(DEFAULT_WORKING_LEN)
    }

    /// Replace the spectral multiply strategy.
    pub fn with_multiplier(mut self, multiplier: Box<dyn SpectralMultiplier>) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn working_len(&self) -> usize {
        self.working_len
    }

    /// Length of the active filter. For a frequency-domain filter this is the
    /// working length it was installed at.
    pub fn filter_len(&self) -> usize {
        match self.source {
            FilterSource::TimeDomain => self.filter.len(),
            FilterSource::Spectrum => self.working_len,
        }
    }

    pub fn multiplier_kind(&self) -> MultiplierKind {
        self.multiplier.kind()
    }

    /// Whether a packed filter spectrum matching the working length is cached.
    pub fn has_cached_spectrum(&self) -> bool {
        self.filter_spectrum.len() == self.working_len
    }

    /// Install a time-domain impulse response.
    ///
    /// An empty `filter` is ignored with a warning and the previous filter
    /// stays active. Returns whether the filter was installed.
    pub fn set_time_domain_filter(&mut self, filter: &[f32]) -> bool {
        if filter.is_empty() {
            warn!(
                "ignoring empty time-domain filter, keeping the active {}-sample filter",
                self.filter_len()
            );
            return false;
        }
        self.filter.clear();
        self.filter.extend_from_slice(filter);
        self.source = FilterSource::TimeDomain;
        self.filter_spectrum.clear();
        true
    }

    /// Install a packed spectrum as produced by
    /// [`Convolver::prepare_impulse_response`] for the current working length.
    ///
    /// The caller is responsible for zero-padding that leaves room for the
    /// signals it will convolve. Empty spectra and spectra whose length is
    /// not the working length are ignored with a warning. Returns whether
    /// the spectrum was installed.
    ///
    /// A later signal longer than the working length turns the spectrum back
    /// into a time-domain filter, dropping its trailing near-zero samples, so
    /// the engine can size itself from the filter's real extent again.
    pub fn set_frequency_domain_filter(&mut self, spectrum: &[f32]) -> bool {
        if spectrum.is_empty() {
            warn!("ignoring empty frequency-domain filter");
            return false;
        }
        if spectrum.len() != self.working_len {
            warn!(
                "ignoring frequency-domain filter of {} bins, working length is {}",
                spectrum.len(),
                self.working_len
            );
            return false;
        }
        self.filter_spectrum.clear();
        self.filter_spectrum.extend_from_slice(spectrum);
        self.filter.clear();
        self.source = FilterSource::Spectrum;
        true
    }

    /// Reinstall the identity filter.
    pub fn reset_filter(&mut self) {
        self.set_time_domain_filter(&[1.0]);
    }

    /// Zero-pad `filter` to `target_len`, transform and pack it.
    ///
    /// The result can be handed to [`Convolver::set_frequency_domain_filter`]
    /// of an engine whose working length is `target_len`. Plans are created
    /// and dropped on every call, so prefer the engine's cached path when the
    /// same filter is used repeatedly.
    pub fn prepare_impulse_response(
        filter: &[f32],
        target_len: usize,
    ) -> Result<Vec<f32>, ConvolverError> {
        check_working_len(target_len)?;
        if filter.is_empty() {
            return Err(ConvolverError::EmptyFilter);
        }
        if filter.len() > target_len {
            return Err(ConvolverError::FilterTooLong {
                filter_len: filter.len(),
                target_len,
            });
        }
        let mut spectrum = zeroed(target_len)?;
        spectrum[..filter.len()].copy_from_slice(filter);
        let mut plan = HalfComplexPlan::new(target_len, Direction::Forward)?;
        plan.execute(&mut spectrum)?;
        let mut scratch = zeroed(target_len)?;
        pack::pack(&mut spectrum, &mut scratch)?;
        Ok(spectrum)
    }

    /// Convolve `signal` with the active filter and scale by `weight`.
    ///
    /// The output has the working length chosen for this call; samples past
    /// [`linear_len`] are the zero-padded tail.
    ///
    /// With a time-domain filter the working length always holds the full
    /// linear convolution. With a frequency-domain filter it stays at the
    /// installed length for any signal no longer than it, so a signal that
    /// leaves less room than the filter's extent wraps around circularly.
    pub fn convolve(&mut self, signal: &[f32], weight: f32) -> Result<Vec<f32>, ConvolverError> {
        let mut output = Vec::new();
        self.convolve_into(signal, weight, &mut output)?;
        Ok(output)
    }

    /// Like [`Convolver::convolve`] but writes into `output`, reusing its
    /// allocation.
    pub fn convolve_into(
        &mut self,
        signal: &[f32],
        weight: f32,
        output: &mut Vec<f32>,
    ) -> Result<(), ConvolverError> {
        let required = self.required_len(signal.len())?;
        self.resize(required)?;
        self.ensure_filter_spectrum()?;

        let len = self.working_len;
        trace!(
            "convolving {} samples with {}-sample filter at length {len}",
            signal.len(),
            self.filter_len()
        );
        let WorkBuffers {
            signal_spectrum,
            accumulator,
            pack_scratch,
            zero_fill,
        } = &mut self.buffers;

        signal_spectrum.copy_from_slice(zero_fill);
        signal_spectrum[..signal.len()].copy_from_slice(signal);
        self.plans.forward(signal_spectrum)?;
        pack::pack(signal_spectrum, pack_scratch)?;

        accumulator.copy_from_slice(zero_fill);
        self.multiplier
            .multiply_accumulate(signal_spectrum, &self.filter_spectrum, accumulator)?;
        pack::unpack(accumulator, pack_scratch)?;
        self.plans.inverse(accumulator)?;

        let scale = weight / len as f32;
        output.clear();
        output
            .try_reserve_exact(len)
            .map_err(|_| ConvolverError::Allocation { len })?;
        output.extend(accumulator.iter().map(|&v| v * scale));
        Ok(())
    }

    /// Working length needed for a signal of `signal_len` samples.
    ///
    /// A frequency-domain filter pins the working length while signals fit
    /// into it. A longer signal needs the filter at a new length, so its
    /// time-domain form is recovered first.
    fn required_len(&mut self, signal_len: usize) -> Result<usize, ConvolverError> {
        if self.source == FilterSource::Spectrum {
            if signal_len <= self.working_len && self.has_cached_spectrum() {
                return Ok(self.working_len);
            }
            self.recover_time_domain_filter()?;
        }
        Ok(required_working_len(signal_len, self.filter.len()))
    }

    fn recover_time_domain_filter(&mut self) -> Result<(), ConvolverError> {
        let len = self.working_len;
        debug!("recovering time-domain filter from {len}-bin spectrum");
        let mut filter = zeroed(len)?;
        filter.copy_from_slice(&self.filter_spectrum);
        pack::unpack(&mut filter, &mut self.buffers.pack_scratch)?;
        self.plans.inverse(&mut filter)?;
        let scale = 1.0 / len as f32;
        filter.iter_mut().for_each(|v| *v *= scale);
        let extent = filter_extent(&filter);
        filter.truncate(extent);
        debug!("recovered filter spans {extent} of {len} samples");
        self.filter = filter;
        self.source = FilterSource::TimeDomain;
        Ok(())
    }

    /// Re-plan for `len` if it differs from the current working length.
    fn resize(&mut self, len: usize) -> Result<(), ConvolverError> {
        if len == self.working_len && self.plans.len() == len {
            return Ok(());
        }
        debug!("working length {} -> {len}", self.working_len);
        let buffers = WorkBuffers::new(len)?;
        self.plans.ensure(len)?;
        self.buffers = buffers;
        self.working_len = len;
        self.filter_spectrum.clear();
        Ok(())
    }

    fn ensure_filter_spectrum(&mut self) -> Result<(), ConvolverError> {
        let len = self.working_len;
        if self.filter_spectrum.len() == len {
            return Ok(());
        }
        debug!(
            "computing spectrum of {}-sample filter at length {len}",
            self.filter.len()
        );
        let mut spectrum = zeroed(len)?;
        spectrum[..self.filter.len()].copy_from_slice(&self.filter);
        self.plans.forward(&mut spectrum)?;
        pack::pack(&mut spectrum, &mut self.buffers.pack_scratch)?;
        self.filter_spectrum = spectrum;
        Ok(())
    }
}

impl fmt::Debug for Convolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Convolver")
            .field("working_len", &self.working_len)
            .field("filter_len", &self.filter_len())
            .field("source", &self.source)
            .field("cached_spectrum", &self.has_cached_spectrum())
            .field("multiplier", &self.multiplier.kind())
            .finish()
    }
}
