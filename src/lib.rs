//! Bit-level AX.25 framing for packet radio.
//!
//! This crate turns AX.25 UI frames into the exact bit sequence that goes to
//! a modulator, and turns received bit sequences back into structured frames.
//! That means working below the byte boundary: HDLC bit stuffing, an
//! incremental 16-bit frame check sequence, and the shifted 7-byte address
//! encoding, all in the wire's little-bit-endian order (least-significant
//! bit of each byte first).
//!
//! A typical transmit path:
//! 1. Parse addresses: `let dest = "APRS".parse::<Callsign>()?;`
//! 2. Build a frame: `Ax25Frame::ui(dest, source, path, info)`
//! 3. Serialize it: `frame.to_bits()?` for a flag-delimited, bit-stuffed,
//!    FCS-appended sequence ready for a modulator.
//!
//! On receive, hand the demodulated bits to `Ax25Frame::from_bits()` and
//! check integrity separately with `DecodedFrame::check_fcs()`, since a
//! frame from a radio channel can decode structurally and still be corrupt.
//!
//! Modulation, TNCs and any physical I/O are out of scope; everything here
//! is a pure function over in-memory bits and bytes.

/// Ordered bit sequences and HDLC bit stuffing.
pub mod bits;

/// Incremental frame check sequence over bits and bytes.
pub mod fcs;

/// Encoding and decoding AX.25 frames between bit sequences and strongly typed structures.
pub mod frame;
