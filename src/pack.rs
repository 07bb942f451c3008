//! Half-complex spectrum packing.
//!
//! A real FFT of length `n` in half-complex order stores the real parts of
//! bins `0..=n/2` at indices `0..=n/2` and the imaginary parts of bins
//! `1..n/2` backwards from the end (`i1` at `n-1`). Complex arithmetic on
//! that order needs gathers, so spectra are rewritten into blocks of
//! [`BLOCK`] values:
//!
//! ```text
//! block b:  re(4b) re(4b+1) re(4b+2) re(4b+3) | im(4b) im(4b+1) im(4b+2) im(4b+3)
//! block 0:  re(0)  re(1)    re(2)    re(3)    | re(n/2) im(1)  im(2)    im(3)
//! ```
//!
//! DC and Nyquist are both purely real; the Nyquist real part takes the
//! slot of the (always zero) DC imaginary part.
//!
//! The mapping is a closed-form permutation, see [`native_index`] and
//! [`packed_index`].

use crate::error::ConvolverError;

/// Values per packed block: four real parts followed by four imaginary parts.
pub const BLOCK: usize = 8;

/// Complex bins per packed block.
pub const LANES: usize = BLOCK / 2;

/// Offset of the DC real part in block 0.
pub const DC_OFFSET: usize = 0;

/// Offset of the Nyquist real part in block 0.
pub const NYQUIST_OFFSET: usize = LANES;

/// Ensure `len` can be split into whole blocks.
pub fn check_len(len: usize) -> Result<(), ConvolverError> {
    if len == 0 || len % BLOCK != 0 {
        return Err(ConvolverError::InvalidLength { len });
    }
    Ok(())
}

/// Native half-complex index stored at `packed` in a spectrum of length `len`.
///
/// `len` must be a non-zero multiple of [`BLOCK`] and `packed < len`.
#[inline]
pub fn native_index(packed: usize, len: usize) -> usize {
    debug_assert!(len % BLOCK == 0 && packed < len);
    let block = packed / BLOCK;
    let offset = packed % BLOCK;
    let bin = block * LANES + offset % LANES;
    if offset < LANES {
        bin
    } else if bin == 0 {
        len / 2
    } else {
        len - bin
    }
}

/// Packed position of the native half-complex index `native`.
///
/// Inverse of [`native_index`] for the same `len`.
#[inline]
pub fn packed_index(native: usize, len: usize) -> usize {
    debug_assert!(len % BLOCK == 0 && native < len);
    let half = len / 2;
    let (bin, imaginary) = if native < half {
        (native, false)
    } else if native == half {
        return NYQUIST_OFFSET;
    } else {
        (len - native, true)
    };
    let block = bin / LANES;
    let lane = bin % LANES;
    block * BLOCK + lane + if imaginary { LANES } else { 0 }
}

/// Rewrite the half-complex spectrum `src` into blocked order in `dst`.
pub fn pack_into(src: &[f32], dst: &mut [f32]) -> Result<(), ConvolverError> {
    let len = src.len();
    check_len(len)?;
    if dst.len() != len {
        return Err(ConvolverError::LengthMismatch {
            expected: len,
            actual: dst.len(),
        });
    }
    for (packed, slot) in dst.iter_mut().enumerate() {
        *slot = src[native_index(packed, len)];
    }
    Ok(())
}

/// Rewrite the blocked spectrum `src` back into half-complex order in `dst`.
pub fn unpack_into(src: &[f32], dst: &mut [f32]) -> Result<(), ConvolverError> {
    let len = src.len();
    check_len(len)?;
    if dst.len() != len {
        return Err(ConvolverError::LengthMismatch {
            expected: len,
            actual: dst.len(),
        });
    }
    for (packed, &value) in src.iter().enumerate() {
        dst[native_index(packed, len)] = value;
    }
    Ok(())
}

/// Pack `buf` in place, using `scratch` (same length) as the destination
/// before copying back.
pub fn pack(buf: &mut [f32], scratch: &mut [f32]) -> Result<(), ConvolverError> {
    pack_into(buf, scratch)?;
    buf.copy_from_slice(scratch);
    Ok(())
}

/// Unpack `buf` in place, using `scratch` (same length) as the destination
/// before copying back.
pub fn unpack(buf: &mut [f32], scratch: &mut [f32]) -> Result<(), ConvolverError> {
    unpack_into(buf, scratch)?;
    buf.copy_from_slice(scratch);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn block_zero_pins_dc_and_nyquist() {
        let len = 16;
        assert_eq!(native_index(DC_OFFSET, len), 0);
        assert_eq!(native_index(NYQUIST_OFFSET, len), len / 2);
        // reals of bins 1..4, then imaginaries of bins 1..4 read from the tail
        assert_eq!(native_index(1, len), 1);
        assert_eq!(native_index(3, len), 3);
        assert_eq!(native_index(5, len), 15);
        assert_eq!(native_index(7, len), 13);
        // second block: bins 4..8
        assert_eq!(native_index(8, len), 4);
        assert_eq!(native_index(12, len), 12);
        assert_eq!(native_index(15, len), 9);
    }

    #[test]
    fn mapping_is_a_permutation() {
        for len in [8usize, 16, 64, 1024] {
            let mut seen = vec![false; len];
            for p in 0..len {
                let n = native_index(p, len);
                assert!(!seen[n], "index {n} hit twice for len {len}");
                seen[n] = true;
                assert_eq!(packed_index(n, len), p);
            }
        }
    }

    #[test]
    fn smallest_length_layout() {
        let src: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let mut dst = vec![0.0; 8];
        pack_into(&src, &mut dst).unwrap();
        assert_eq!(dst, vec![0.0, 1.0, 2.0, 3.0, 4.0, 7.0, 6.0, 5.0]);
    }

    #[test]
    fn rejects_lengths_that_are_not_whole_blocks() {
        let mut scratch = vec![0.0; 12];
        let mut buf = vec![0.0; 12];
        assert_eq!(
            pack(&mut buf, &mut scratch),
            Err(ConvolverError::InvalidLength { len: 12 })
        );
        assert_eq!(check_len(0), Err(ConvolverError::InvalidLength { len: 0 }));
    }

    #[test]
    fn rejects_mismatched_scratch() {
        let mut buf = vec![0.0; 16];
        let mut scratch = vec![0.0; 8];
        assert_eq!(
            unpack(&mut buf, &mut scratch),
            Err(ConvolverError::LengthMismatch {
                expected: 16,
                actual: 8
            })
        );
    }

    proptest! {
        #[test]
        fn prop_unpack_inverts_pack(blocks in 1usize..32, seed in proptest::collection::vec(-1.0e3f32..1.0e3, 256)) {
            let len = blocks * BLOCK;
            let original: Vec<f32> = seed.iter().cycle().take(len).cloned().collect();
            let mut buf = original.clone();
            let mut scratch = vec![0.0; len];
            pack(&mut buf, &mut scratch).unwrap();
            unpack(&mut buf, &mut scratch).unwrap();
            prop_assert_eq!(buf, original);
        }
    }
}
