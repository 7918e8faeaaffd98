//! End-to-end exercises of the wire format: frames out to bits, bits back to
//! frames, and the failure modes a radio channel actually produces.

use ax25_hdlc::bits::{self, Bits};
use ax25_hdlc::fcs::Fcs;
use ax25_hdlc::frame::{Ax25Frame, Callsign, DecodeError, FLAG};
use bitvec::prelude::*;

fn callsign(s: &str) -> Callsign {
    s.parse().unwrap()
}

fn position_report() -> Ax25Frame {
    Ax25Frame::ui(
        callsign("APRS"),
        callsign("N0CALL"),
        vec![callsign("WIDE1-1"), callsign("WIDE2-1")],
        b"!".to_vec(),
    )
}

/// Flag-delimit and stuff raw body bytes, bypassing frame encoding.
fn wire_from_body(body: &[u8]) -> Bits {
    let flag = FLAG.view_bits::<Lsb0>();
    let mut out = Bits::new();
    out.extend_from_bitslice(flag);
    out.extend(bits::stuff(bits::from_bytes(body)));
    out.extend_from_bitslice(flag);
    out
}

#[test]
fn ui_frame_survives_the_air() {
    let frame = position_report();
    let decoded = Ax25Frame::from_bits(&frame.to_bits().unwrap()).unwrap();

    assert_eq!(decoded.frame.destination.call(), "APRS  ");
    assert_eq!(decoded.frame.source.call(), "N0CALL");
    assert_eq!(decoded.frame.digipeaters.len(), 2);
    assert_eq!(decoded.frame.digipeaters[0].to_string(), "WIDE1-1");
    assert_eq!(decoded.frame.digipeaters[1].to_string(), "WIDE2-1");
    assert_eq!(decoded.frame.info, b"!");
    assert_eq!(decoded.check_fcs(), Ok(()));
}

#[test]
fn reencoding_a_decoded_frame_reproduces_the_wire_bits() {
    let wire = position_report().to_bits().unwrap();
    let decoded = Ax25Frame::from_bits(&wire).unwrap();
    assert_eq!(decoded.frame.to_bits().unwrap(), wire);
}

#[test]
fn frame_is_found_amid_channel_noise() {
    let mut noisy = Bits::new();
    // Demodulator garbage either side of the frame, including a lone
    // flag-less 1-run that must not confuse the search.
    noisy.extend([true, false, true, true, true, false, false]);
    noisy.extend_from_bitslice(&position_report().to_bits().unwrap());
    noisy.extend([false, true, true, false]);

    let decoded = Ax25Frame::from_bits(&noisy).unwrap();
    assert_eq!(decoded.frame.source.call(), "N0CALL");
    assert_eq!(decoded.check_fcs(), Ok(()));
}

#[test]
fn payload_with_long_one_runs_round_trips() {
    // 0xFF payload maximizes stuffing activity across byte boundaries.
    let mut frame = position_report();
    frame.info = vec![0xFF; 24];
    let decoded = Ax25Frame::from_bits(&frame.to_bits().unwrap()).unwrap();
    assert_eq!(decoded.frame.info, vec![0xFF; 24]);
    assert_eq!(decoded.check_fcs(), Ok(()));
}

#[test]
fn empty_info_field_round_trips() {
    let mut frame = position_report();
    frame.info = Vec::new();
    let decoded = Ax25Frame::from_bits(&frame.to_bits().unwrap()).unwrap();
    assert!(decoded.frame.info.is_empty());
    assert_eq!(decoded.check_fcs(), Ok(()));
}

#[test]
fn no_digipeater_path_round_trips() {
    let mut frame = position_report();
    frame.digipeaters = Vec::new();
    let decoded = Ax25Frame::from_bits(&frame.to_bits().unwrap()).unwrap();
    assert!(decoded.frame.digipeaters.is_empty());
    assert_eq!(decoded.frame.info, b"!");
    assert_eq!(decoded.check_fcs(), Ok(()));
}

#[test]
fn corrupted_payload_byte_fails_the_fcs_check() {
    // Build the wire image by hand so the payload can be corrupted after
    // the digest was taken, as a noisy channel would.
    let frame = position_report();
    let mut body = frame.header().unwrap();
    body.extend_from_slice(&frame.info);
    body.extend_from_slice(&frame.fcs_field().unwrap());
    let payload_at = body.len() - 3;
    body[payload_at] ^= 0x40;

    let decoded = Ax25Frame::from_bits(&wire_from_body(&body)).unwrap();
    assert_eq!(decoded.frame.info, b"a"); // 0x21 ^ 0x40
    assert!(decoded.check_fcs().is_err());
}

#[test]
fn corrupted_trailer_fails_the_fcs_check() {
    let frame = position_report();
    let mut body = frame.header().unwrap();
    body.extend_from_slice(&frame.info);
    let mut digest = frame.fcs_field().unwrap();
    digest[0] ^= 0x01;
    body.extend_from_slice(&digest);

    let decoded = Ax25Frame::from_bits(&wire_from_body(&body)).unwrap();
    assert_eq!(decoded.frame.info, b"!");
    assert!(decoded.check_fcs().is_err());
}

#[test]
fn missing_flags_are_reported_not_fatal() {
    assert_eq!(
        Ax25Frame::from_bits(&Bits::new()),
        Err(DecodeError::FrameNotFound)
    );
    assert_eq!(
        Ax25Frame::from_bits(&bits::from_bytes(&[0x12, 0x34, 0x56])),
        Err(DecodeError::FrameNotFound)
    );
    assert_eq!(
        Ax25Frame::from_bits(&bits::from_bytes(&[0x12, FLAG, 0x34])),
        Err(DecodeError::FrameNotFound)
    );
}

#[test]
fn ragged_digipeater_field_is_a_decode_error() {
    // Three junk bytes between the fixed addresses and the marker: not a
    // whole 7-byte entry.
    let frame = position_report();
    let mut body = Vec::new();
    body.extend_from_slice(&frame.destination.encode());
    body.extend_from_slice(&frame.source.encode());
    body.extend_from_slice(&[0xAA, 0xBB, 0xCD]);
    body.extend_from_slice(&[0x03, 0xF0]);
    body.extend_from_slice(b"!");
    let digest = Fcs::new().update(&body).digest();
    body.extend_from_slice(&digest);

    assert_eq!(
        Ax25Frame::from_bits(&wire_from_body(&body)),
        Err(DecodeError::RaggedDigipeaterField(3))
    );
}

#[test]
fn truncated_body_is_too_short() {
    // A frame cut off mid-address by squelch closing.
    let header = position_report().header().unwrap();
    assert!(matches!(
        Ax25Frame::from_bits(&wire_from_body(&header[..12])),
        Err(DecodeError::FrameTooShort(_))
    ));
}
