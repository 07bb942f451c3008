//! Error type shared by the planner, packer, multiplier and engine.

use core::fmt;

/// Errors produced while planning, packing or convolving.
///
/// [`ConvolverError::UnsupportedSampleWidth`] is a configuration fault and
/// can never be recovered from; see [`ConvolverError::is_fatal`]. Allocation
/// failures are reported separately so callers may retry with a smaller
/// working length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvolverError {
    /// The platform `f32` is not a 32-bit IEEE single.
    UnsupportedSampleWidth { bits: u32 },
    /// A working buffer of `len` samples could not be allocated.
    Allocation { len: usize },
    /// `len` is not a usable transform length.
    InvalidLength { len: usize },
    /// Two buffers that must agree in length do not.
    LengthMismatch { expected: usize, actual: usize },
    /// An impulse response with no samples was supplied.
    EmptyFilter,
    /// The impulse response does not fit into the requested length.
    FilterTooLong { filter_len: usize, target_len: usize },
    /// The FFT library reported a fault.
    Transform(String),
}

impl ConvolverError {
    /// Whether the error is a configuration fault that no retry can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConvolverError::UnsupportedSampleWidth { .. })
    }
}

impl fmt::Display for ConvolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvolverError::UnsupportedSampleWidth { bits } => {
                write!(f, "f32 samples must be 32 bits wide, found {bits}")
            }
            ConvolverError::Allocation { len } => {
                write!(f, "failed to allocate a buffer of {len} samples")
            }
            ConvolverError::InvalidLength { len } => write!(
                f,
                "length {len} must be a power of two and a multiple of {}",
                crate::pack::BLOCK
            ),
            ConvolverError::LengthMismatch { expected, actual } => {
                write!(f, "expected {expected} samples, got {actual}")
            }
            ConvolverError::EmptyFilter => write!(f, "impulse response is empty"),
            ConvolverError::FilterTooLong {
                filter_len,
                target_len,
            } => write!(
                f,
                "impulse response of {filter_len} samples does not fit into {target_len}"
            ),
            ConvolverError::Transform(msg) => write!(f, "transform failed: {msg}"),
        }
    }
}

impl std::error::Error for ConvolverError {}

impl From<realfft::FftError> for ConvolverError {
    fn from(err: realfft::FftError) -> Self {
        ConvolverError::Transform(err.to_string())
    }
}
