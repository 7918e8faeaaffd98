use std::fmt;
use std::str::FromStr;

use bitvec::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::bits::{self, Bits};
use crate::fcs::{Fcs, FcsError};

/// HDLC flag octet delimiting every frame on the wire.
pub const FLAG: u8 = 0x7E;

/// Control field of a UI (Unnumbered Information) frame.
pub const UI_CONTROL: u8 = 0x03;

/// Protocol identifier for "no layer 3", used by APRS traffic.
pub const UI_PROTOCOL_ID: u8 = 0xF0;

/// Bytes in one encoded address.
const ADDRESS_LEN: usize = 7;
const ADDRESS_BITS: usize = 8 * ADDRESS_LEN;

/// The address field holds destination, source and up to 8 digipeaters.
const MAX_DIGIPEATERS: usize = 8;

// Smallest decodable body: two addresses, control, PID and the FCS trailer.
const MIN_BODY_BITS: usize = 2 * ADDRESS_BITS + 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("callsign must not be empty")]
    EmptyCallsign,
    #[error("callsign {0:?} is longer than 6 characters")]
    CallsignTooLong(String),
    #[error("callsign {0:?} must be ASCII letters and digits only")]
    InvalidCallsign(String),
    #[error("SSID {0:?} must be a single ASCII digit")]
    InvalidSsid(String),
    #[error("address field holds at most 8 digipeaters, got {0}")]
    TooManyDigipeaters(usize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than two flag delimiters were found in the input.
    #[error("fewer than two flag delimiters in received bits")]
    FrameNotFound,
    /// The unstuffed body cannot hold two addresses, control, PID and FCS.
    #[error("frame body of {0} bits is too short to be a frame")]
    FrameTooShort(usize),
    /// The control/PID marker was never seen, so the boundary between the
    /// address field and the payload cannot be located.
    #[error("control/PID marker not found; cannot delimit addresses from payload")]
    HeaderMarkerNotFound,
    /// The bytes between the fixed addresses and the marker do not divide
    /// into whole 7-byte digipeater entries.
    #[error("digipeater field of {0} bytes is not a whole number of addresses")]
    RaggedDigipeaterField(usize),
}

/// A station identifier: 1-6 character base callsign plus a one-digit SSID.
///
/// Parse one from the usual text form with [`FromStr`], e.g. `"WIDE1-1"` or
/// `"APRS"` (no suffix means SSID `0`). Lowercase input is upper-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callsign {
    call: String,
    ssid: char,
}

impl Callsign {
    /// Validate and build a callsign from its parts.
    pub fn new(call: &str, ssid: char) -> Result<Callsign, EncodeError> {
        let call = call.to_uppercase();
        if call.is_empty() {
            return Err(EncodeError::EmptyCallsign);
        }
        if call.len() > 6 {
            return Err(EncodeError::CallsignTooLong(call));
        }
        if !call.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(EncodeError::InvalidCallsign(call));
        }
        if !ssid.is_ascii_digit() {
            return Err(EncodeError::InvalidSsid(ssid.to_string()));
        }
        Ok(Callsign { call, ssid })
    }

    /// Base callsign. For a callsign recovered off the air this includes the
    /// space padding as received; trim it if a clean string is wanted.
    pub fn call(&self) -> &str {
        &self.call
    }

    pub fn ssid(&self) -> char {
        self.ssid
    }

    /// Encode as a fixed 7-byte address field: space-padded to six
    /// characters, SSID appended, then every byte shifted left one bit.
    /// Bit 0 of each byte is left clear for the end-of-address marker.
    pub fn encode(&self) -> [u8; 7] {
        let mut field = [b' ' << 1; 7];
        for (slot, b) in field.iter_mut().zip(self.call.bytes()) {
            *slot = b << 1;
        }
        field[6] = (self.ssid as u8) << 1;
        field
    }

    /// Decode a received 7-byte address field by shifting each byte right
    /// one bit. Received data is taken as-is: padding spaces and the SSID
    /// byte are preserved, nothing is validated or trimmed.
    pub fn decode(field: &[u8]) -> Callsign {
        let call = field.iter().take(6).map(|&b| (b >> 1) as char).collect();
        let ssid = field.get(6).map_or(' ', |&b| (b >> 1) as char);
        Callsign { call, ssid }
    }
}

impl FromStr for Callsign {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((call, ssid)) => {
                let mut chars = ssid.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Callsign::new(call, c),
                    _ => Err(EncodeError::InvalidSsid(ssid.to_string())),
                }
            }
            None => Callsign::new(s, '0'),
        }
    }
}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let call = self.call.trim_end();
        match self.ssid {
            '0' => write!(f, "{}", call),
            ssid => write!(f, "{}-{}", call, ssid),
        }
    }
}

/// An AX.25 frame as structured fields.
///
/// Fields are public; build one directly or through [`Ax25Frame::ui`] for
/// the usual UI datagram. Serialization to and from the wire bit sequence
/// goes through [`to_bits`](Ax25Frame::to_bits) and
/// [`from_bits`](Ax25Frame::from_bits).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Frame {
    pub destination: Callsign,
    pub source: Callsign,
    /// Digipeater path in transmission order, up to 8 entries.
    pub digipeaters: Vec<Callsign>,
    pub control: u8,
    pub protocol_id: u8,
    /// Information field as raw bytes.
    pub info: Vec<u8>,
}

impl Ax25Frame {
    /// Build a UI frame, the connectionless datagram carrying most position
    /// and status traffic. There is no canonical digipeater path; pick one
    /// appropriate for the network (APRS commonly uses `WIDE1-1,WIDE2-1`).
    pub fn ui(
        destination: Callsign,
        source: Callsign,
        digipeaters: Vec<Callsign>,
        info: Vec<u8>,
    ) -> Ax25Frame {
        Ax25Frame {
            destination,
            source,
            digipeaters,
            control: UI_CONTROL,
            protocol_id: UI_PROTOCOL_ID,
            info,
        }
    }

    /// Destination, source and digipeater addresses as one encoded field.
    /// The low bit of the final byte is set to mark the end of the address
    /// field, whichever callsign it falls in.
    pub fn encoded_addresses(&self) -> Result<Vec<u8>, EncodeError> {
        if self.digipeaters.len() > MAX_DIGIPEATERS {
            return Err(EncodeError::TooManyDigipeaters(self.digipeaters.len()));
        }
        let mut bytes = Vec::with_capacity(ADDRESS_LEN * (2 + self.digipeaters.len()));
        bytes.extend_from_slice(&self.destination.encode());
        bytes.extend_from_slice(&self.source.encode());
        for digi in &self.digipeaters {
            bytes.extend_from_slice(&digi.encode());
        }
        if let Some(last) = bytes.last_mut() {
            *last |= 0x01;
        }
        Ok(bytes)
    }

    /// Address field followed by the control byte and protocol identifier.
    pub fn header(&self) -> Result<Vec<u8>, EncodeError> {
        let mut header = self.encoded_addresses()?;
        header.push(self.control);
        header.push(self.protocol_id);
        Ok(header)
    }

    /// FCS digest over the header and information field, byte-oriented.
    pub fn fcs_field(&self) -> Result<[u8; 2], EncodeError> {
        let header = self.header()?;
        Ok(Fcs::new().update(&header).update(&self.info).digest())
    }

    /// Serialize to the transmission bit sequence: an opening flag, the
    /// bit-stuffed header + info + FCS, and a closing flag. The flags
    /// themselves are never subject to stuffing.
    pub fn to_bits(&self) -> Result<Bits, EncodeError> {
        let mut body = self.header()?;
        body.extend_from_slice(&self.info);
        let digest = Fcs::new().update(&body).digest();
        body.extend_from_slice(&digest);

        let flag = FLAG.view_bits::<Lsb0>();
        let mut out = Bits::new();
        out.extend_from_bitslice(flag);
        out.extend(bits::stuff(bits::from_bytes(&body)));
        out.extend_from_bitslice(flag);
        Ok(out)
    }

    /// Best-effort UTF-8 rendering of the information field.
    pub fn info_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.info).into_owned()
    }

    /// Parse a received bit sequence back into structured fields.
    ///
    /// Stages: seek the first two flag patterns, unstuff the bits between
    /// them, then split the body at the control/PID marker. Each stage
    /// reports its own [`DecodeError`]; integrity is not judged here, see
    /// [`DecodedFrame::check_fcs`].
    pub fn from_bits(input: &BitSlice<u8, Lsb0>) -> Result<DecodedFrame, DecodeError> {
        let flag = FLAG.view_bits::<Lsb0>();
        let first = input
            .windows(8)
            .position(|w| w == flag)
            .ok_or(DecodeError::FrameNotFound)?;
        let body_start = first + 8;
        let second = input[body_start..]
            .windows(8)
            .position(|w| w == flag)
            .ok_or(DecodeError::FrameNotFound)?;

        let body: Bits =
            bits::unstuff(input[body_start..body_start + second].iter().by_vals()).collect();
        if body.len() < MIN_BODY_BITS {
            return Err(DecodeError::FrameTooShort(body.len()));
        }
        let body_bytes = bits::to_bytes(&body);

        // The control/PID marker pins down where the digipeater list ends.
        // Stop scanning early enough that control, PID and the FCS trailer
        // always fit after a match.
        let marker = (2 * ADDRESS_LEN..body_bytes.len() - 3)
            .find(|&n| body_bytes[n] == UI_CONTROL && body_bytes[n + 1] == UI_PROTOCOL_ID)
            .ok_or(DecodeError::HeaderMarkerNotFound)?;
        let digi_len = marker - 2 * ADDRESS_LEN;
        if digi_len % ADDRESS_LEN != 0 {
            return Err(DecodeError::RaggedDigipeaterField(digi_len));
        }

        let destination = Callsign::decode(&body_bytes[..ADDRESS_LEN]);
        let source = Callsign::decode(&body_bytes[ADDRESS_LEN..2 * ADDRESS_LEN]);
        let digipeaters: Vec<Callsign> = body_bytes[2 * ADDRESS_LEN..marker]
            .chunks_exact(ADDRESS_LEN)
            .map(Callsign::decode)
            .collect();

        let header_bits = (marker + 2) * 8;
        let info = bits::to_bytes(&body[header_bits..body.len() - 16]);
        let received_fcs = body[body.len() - 16..].load_le::<u16>().to_le_bytes();
        let computed_fcs = Fcs::new()
            .update(&body_bytes[..marker + 2])
            .update(&info)
            .digest();

        let frame = Ax25Frame {
            destination,
            source,
            digipeaters,
            control: body_bytes[marker],
            protocol_id: body_bytes[marker + 1],
            info,
        };
        debug!(
            destination = %frame.destination,
            source = %frame.source,
            digipeaters = frame.digipeaters.len(),
            info = %frame.info_string_lossy(),
            "decoded AX.25 frame"
        );
        Ok(DecodedFrame {
            frame,
            computed_fcs,
            received_fcs,
        })
    }
}

impl fmt::Display for Ax25Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Source\t\t{}", self.source)?;
        writeln!(f, "Destination\t{}", self.destination)?;
        for digi in &self.digipeaters {
            writeln!(f, "Via\t\t{}", digi)?;
        }
        write!(f, "Data\t\t\"{}\"", self.info_string_lossy())
    }
}

/// Outcome of a structurally successful decode.
///
/// Integrity is a separate question: a frame can split cleanly into fields
/// and still be corrupt, so the FCS verdict lives alongside the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub frame: Ax25Frame,
    /// Digest recomputed over the received header and info bytes.
    pub computed_fcs: [u8; 2],
    /// Trailer as it arrived off the air.
    pub received_fcs: [u8; 2],
}

impl DecodedFrame {
    /// Compare the recomputed digest against the received trailer.
    pub fn check_fcs(&self) -> Result<(), FcsError> {
        if self.computed_fcs == self.received_fcs {
            Ok(())
        } else {
            Err(FcsError::Mismatch {
                computed: self.computed_fcs,
                received: self.received_fcs,
            })
        }
    }
}

#[cfg(test)]
fn callsign(s: &str) -> Callsign {
    s.parse().unwrap()
}

#[test]
fn callsign_from_str_forms() {
    assert_eq!(
        "VK7NTK-2".parse::<Callsign>(),
        Callsign::new("VK7NTK", '2')
    );
    assert_eq!("aprs".parse::<Callsign>(), Callsign::new("APRS", '0'));
    assert_eq!(callsign("WIDE1-1").to_string(), "WIDE1-1");
    assert_eq!(callsign("N0CALL").to_string(), "N0CALL");

    assert_eq!("".parse::<Callsign>(), Err(EncodeError::EmptyCallsign));
    assert_eq!(
        "-1".parse::<Callsign>(),
        Err(EncodeError::EmptyCallsign)
    );
    assert_eq!(
        "VK7NTKX".parse::<Callsign>(),
        Err(EncodeError::CallsignTooLong("VK7NTKX".to_string()))
    );
    assert_eq!(
        "VK7NTK-12".parse::<Callsign>(),
        Err(EncodeError::InvalidSsid("12".to_string()))
    );
    assert_eq!(
        "VK7NTK-".parse::<Callsign>(),
        Err(EncodeError::InvalidSsid("".to_string()))
    );
    assert_eq!(
        "VK NTK".parse::<Callsign>(),
        Err(EncodeError::InvalidCallsign("VK NTK".to_string()))
    );
    assert!(matches!(
        Callsign::new("APRS", 'X'),
        Err(EncodeError::InvalidSsid(_))
    ));
}

#[test]
fn callsign_encode_shifts_and_pads() {
    assert_eq!(
        callsign("APRS").encode(),
        [
            b'A' << 1,
            b'P' << 1,
            b'R' << 1,
            b'S' << 1,
            b' ' << 1,
            b' ' << 1,
            b'0' << 1
        ]
    );
}

#[test]
fn callsign_decode_preserves_padding() {
    let decoded = Callsign::decode(&callsign("APRS").encode());
    assert_eq!(decoded.call(), "APRS  ");
    assert_eq!(decoded.ssid(), '0');
    assert_eq!(decoded.to_string(), "APRS");

    let decoded = Callsign::decode(&callsign("WIDE2-1").encode());
    assert_eq!(decoded.call(), "WIDE2 ");
    assert_eq!(decoded.ssid(), '1');
    assert_eq!(decoded.to_string(), "WIDE2-1");
}

#[test]
fn callsign_decode_ignores_end_of_address_bit() {
    let mut field = callsign("N0CALL").encode();
    field[6] |= 0x01;
    let decoded = Callsign::decode(&field);
    assert_eq!(decoded.call(), "N0CALL");
    assert_eq!(decoded.ssid(), '0');
}

#[cfg(test)]
fn sample_ui_frame() -> Ax25Frame {
    Ax25Frame::ui(
        callsign("APRS"),
        callsign("N0CALL"),
        vec![callsign("WIDE1-1"), callsign("WIDE2-1")],
        b"!".to_vec(),
    )
}

#[test]
fn encoded_addresses_marks_only_final_byte() {
    let addresses = sample_ui_frame().encoded_addresses().unwrap();
    assert_eq!(addresses.len(), 28);
    let (last, rest) = addresses.split_last().unwrap();
    assert_eq!(last & 0x01, 0x01);
    assert!(rest.iter().all(|b| b & 0x01 == 0));
}

#[test]
fn header_and_fcs_known_answer() {
    let frame = sample_ui_frame();
    let expected: Vec<u8> = vec![
        0x82, 0xa0, 0xa4, 0xa6, 0x40, 0x40, 0x60, // APRS
        0x9c, 0x60, 0x86, 0x82, 0x98, 0x98, 0x60, // N0CALL
        0xae, 0x92, 0x88, 0x8a, 0x62, 0x40, 0x62, // WIDE1-1
        0xae, 0x92, 0x88, 0x8a, 0x64, 0x40, 0x63, // WIDE2-1, end-of-address bit
        0x03, 0xf0,
    ];
    assert_eq!(frame.header().unwrap(), expected);
    assert_eq!(frame.fcs_field().unwrap(), [0x6c, 0xad]);
}

#[test]
fn to_bits_is_flag_delimited() {
    let wire = sample_ui_frame().to_bits().unwrap();
    let flag = FLAG.view_bits::<Lsb0>();
    assert_eq!(&wire[..8], flag);
    assert_eq!(&wire[wire.len() - 8..], flag);
}

#[test]
fn too_many_digipeaters_is_an_encode_error() {
    let mut frame = sample_ui_frame();
    frame.digipeaters = vec![callsign("WIDE1-1"); 9];
    assert_eq!(
        frame.to_bits(),
        Err(EncodeError::TooManyDigipeaters(9))
    );
}

#[test]
fn from_bits_requires_two_flags() {
    assert_eq!(
        Ax25Frame::from_bits(&Bits::new()),
        Err(DecodeError::FrameNotFound)
    );
    let one_flag = bits::from_bytes(&[FLAG, 0x00]);
    assert_eq!(
        Ax25Frame::from_bits(&one_flag),
        Err(DecodeError::FrameNotFound)
    );
}

#[test]
fn from_bits_rejects_empty_body() {
    let empty = bits::from_bytes(&[FLAG, FLAG]);
    assert_eq!(
        Ax25Frame::from_bits(&empty),
        Err(DecodeError::FrameTooShort(0))
    );
}

#[test]
fn from_bits_without_marker_fails() {
    // Structurally plausible frame, but not a UI frame.
    let mut frame = sample_ui_frame();
    frame.control = 0x3F;
    frame.protocol_id = 0x00;
    let wire = frame.to_bits().unwrap();
    assert_eq!(
        Ax25Frame::from_bits(&wire),
        Err(DecodeError::HeaderMarkerNotFound)
    );
}

#[test]
fn from_bits_round_trips_sample_frame() {
    let frame = sample_ui_frame();
    let decoded = Ax25Frame::from_bits(&frame.to_bits().unwrap()).unwrap();
    assert_eq!(decoded.frame.destination.call(), "APRS  ");
    assert_eq!(decoded.frame.source.call(), "N0CALL");
    assert_eq!(decoded.frame.digipeaters.len(), 2);
    assert_eq!(decoded.frame.digipeaters[0].to_string(), "WIDE1-1");
    assert_eq!(decoded.frame.digipeaters[1].to_string(), "WIDE2-1");
    assert_eq!(decoded.frame.control, UI_CONTROL);
    assert_eq!(decoded.frame.protocol_id, UI_PROTOCOL_ID);
    assert_eq!(decoded.frame.info, b"!");
    assert_eq!(decoded.check_fcs(), Ok(()));
    assert_eq!(decoded.received_fcs, [0x6c, 0xad]);
}
