use ax25_hdlc::bits;
use ax25_hdlc::frame::{Ax25Frame, Callsign};
use std::env;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        demo_round_trip();
        return;
    }
    for hex in &args {
        println!("\nParse result for {}:", hex);
        let bytes = match parse_hex(hex) {
            Some(bytes) => bytes,
            None => {
                println!("Not a hex string");
                continue;
            }
        };
        report(&bits::from_bytes(&bytes));
    }
}

fn demo_round_trip() {
    let frame = Ax25Frame::ui(
        "APRS".parse::<Callsign>().unwrap(),
        "N0CALL".parse::<Callsign>().unwrap(),
        vec!["WIDE1-1".parse().unwrap(), "WIDE2-1".parse().unwrap()],
        b"!4903.50N/07201.75W-Test".to_vec(),
    );
    let wire = frame.to_bits().unwrap();

    println!("Transmit bits ({} total):", wire.len());
    for (i, bit) in wire.iter().by_vals().enumerate() {
        if i > 0 && i % 8 == 0 {
            print!(" ");
        }
        print!("{}", if bit { '1' } else { '0' });
    }
    println!("\n");
    report(&wire);
}

fn report(wire: &bits::Bits) {
    match Ax25Frame::from_bits(wire) {
        Ok(decoded) => {
            println!("{:#?}", decoded.frame);
            println!("String content: {}", decoded.frame.info_string_lossy());
            match decoded.check_fcs() {
                Ok(()) => println!("FCS OK"),
                Err(e) => println!("{}", e),
            }
            print!("\nReencoded: ");
            match decoded.frame.to_bits() {
                Ok(bits) => {
                    for byte in bits::to_bytes(&bits) {
                        print!("{:02X} ", byte);
                    }
                    println!();
                }
                Err(e) => println!("Could not reencode! {}", e),
            }
        }
        Err(e) => println!("Could not parse! {}", e),
    }
}

fn parse_hex(s: &str) -> Option<Vec<u8>> {
    let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if !s.is_ascii() || s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
