use bitvec::prelude::*;
use thiserror::Error;

use crate::bits::Bits;

// Reversed representation of the CRC-16/X-25 polynomial.
const POLY: u16 = 0x8408;
const INIT: u16 = 0xFFFF;

/// Running frame check sequence state. Each update consumes the old state
/// and returns the new one, so the accumulator threads through a fold.
///
/// Two feeding orders are in play and they are not interchangeable: the
/// byte-oriented [`update`](Fcs::update) runs most-significant bit first
/// within each byte, while [`append`] and [`validate`] feed
/// [`update_bit`](Fcs::update_bit) in stream order, least-significant bit
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fcs(u16);

impl Fcs {
    pub fn new() -> Fcs {
        Fcs(INIT)
    }

    /// Fold one bit into the state.
    #[must_use]
    pub fn update_bit(self, bit: bool) -> Fcs {
        let check = self.0 & 1 == 1;
        let shifted = self.0 >> 1;
        if check != bit {
            Fcs(shifted ^ POLY)
        } else {
            Fcs(shifted)
        }
    }

    /// Fold bytes into the state, most-significant bit first within each byte.
    #[must_use]
    pub fn update(self, bytes: &[u8]) -> Fcs {
        bytes.iter().fold(self, |fcs, &byte| {
            (0..8)
                .rev()
                .fold(fcs, |fcs, i| fcs.update_bit((byte >> i) & 1 == 1))
        })
    }

    /// Finish: one's-complement of the state, as two bytes, least-significant
    /// byte first.
    pub fn digest(self) -> [u8; 2] {
        (!self.0).to_le_bytes()
    }
}

impl Default for Fcs {
    fn default() -> Fcs {
        Fcs::new()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FcsError {
    /// The sequence is shorter than the 16-bit trailer it is supposed to end with.
    #[error("bit sequence shorter than the 16-bit FCS trailer")]
    Truncated,
    /// The recomputed digest disagrees with the received trailer.
    #[error("FCS mismatch: computed {computed:02x?}, received {received:02x?}")]
    Mismatch {
        computed: [u8; 2],
        received: [u8; 2],
    },
}

/// Pass a bit sequence through while accumulating the FCS in stream order,
/// then append the digest bits (little-endian byte order) at the end.
pub fn append(bits: &BitSlice<u8, Lsb0>) -> Bits {
    let fcs = bits.iter().by_vals().fold(Fcs::new(), Fcs::update_bit);
    let mut out = bits.to_bitvec();
    out.extend_from_bitslice(fcs.digest().view_bits::<Lsb0>());
    out
}

/// Receive-side counterpart of [`append`]: treat the final 16 bits as the
/// trailer, recompute the FCS over everything before it, and return those
/// body bits if the digests agree.
pub fn validate(bits: &BitSlice<u8, Lsb0>) -> Result<Bits, FcsError> {
    if bits.len() < 16 {
        return Err(FcsError::Truncated);
    }
    let (body, trailer) = bits.split_at(bits.len() - 16);
    let computed = body
        .iter()
        .by_vals()
        .fold(Fcs::new(), Fcs::update_bit)
        .digest();
    let received = trailer.load_le::<u16>().to_le_bytes();
    if computed != received {
        return Err(FcsError::Mismatch { computed, received });
    }
    Ok(body.to_bitvec())
}

#[cfg(test)]
use crate::bits::from_bytes;

#[test]
fn digest_of_nothing_is_complement_of_seed() {
    assert_eq!(Fcs::new().digest(), [0x00, 0x00]);
}

#[test]
fn byte_update_known_answer() {
    let fcs = Fcs::new().update(b"123456789");
    assert_eq!(fcs.digest(), [0x6b, 0x72]);
}

#[test]
fn byte_update_is_msb_first() {
    // Feeding the same byte's bits by hand, MSB first, must match update().
    let byte = 0x21u8;
    let by_bytes = Fcs::new().update(&[byte]);
    let by_bits = (0..8)
        .rev()
        .fold(Fcs::new(), |fcs, i| fcs.update_bit((byte >> i) & 1 == 1));
    assert_eq!(by_bytes, by_bits);
    assert_eq!(by_bytes.digest(), [0x54, 0x32]);
}

#[test]
fn append_computes_stream_order_digest() {
    // APRS frame bytes with a published X.25 checksum of 7D DC.
    let data: Vec<u8> = vec![
        0x82, 0xa0, 0xb4, 0x60, 0x60, 0x62, 0x60, 0x9a, 0x60, 0xa8, 0x90, 0x86, 0x40, 0xe5,
        0x03, 0xf0, 0x3a, 0x4d, 0x30, 0x54, 0x48, 0x43, 0x2d, 0x31, 0x20, 0x20, 0x3a, 0x68,
        0x65, 0x6c, 0x6c, 0x6f, 0x41,
    ];
    let appended = append(&from_bytes(&data));
    let mut expected = data.clone();
    expected.extend([0x7d, 0xdc]);
    assert_eq!(crate::bits::to_bytes(&appended), expected);
}

#[test]
fn validate_round_trips_append() {
    let data = from_bytes(b"The quick brown fox");
    let appended = append(&data);
    assert_eq!(validate(&appended), Ok(data));
}

#[test]
fn validate_fails_on_any_single_flipped_bit() {
    let appended = append(&from_bytes(b"hi"));
    for i in 0..appended.len() {
        let mut corrupt = appended.clone();
        let flipped = !corrupt[i];
        corrupt.set(i, flipped);
        assert!(
            matches!(validate(&corrupt), Err(FcsError::Mismatch { .. })),
            "flip at bit {} went undetected",
            i
        );
    }
}

#[test]
fn validate_rejects_truncated_input() {
    let bits = from_bytes(&[0xFF]);
    assert_eq!(validate(&bits[..8]), Err(FcsError::Truncated));
}
