use bitvec::prelude::*;

/// A bit sequence in wire order. AX.25 serializes each byte with its
/// least-significant bit first, which is exactly `bitvec`'s `Lsb0` ordering.
pub type Bits = BitVec<u8, Lsb0>;

/// Spread bytes into wire order, least-significant bit of each byte first.
pub fn from_bytes(bytes: &[u8]) -> Bits {
    Bits::from_slice(bytes)
}

/// Reinterpret a bit sequence as bytes, least-significant bit first within
/// each byte. A ragged tail shorter than eight bits is dropped.
pub fn to_bytes(bits: &BitSlice<u8, Lsb0>) -> Vec<u8> {
    bits.chunks_exact(8).map(|chunk| chunk.load_le::<u8>()).collect()
}

/// Insert a 0 after every run of five consecutive 1s so that no run of six
/// or more 1s (which would alias the frame delimiter) can appear on air.
///
/// The adapter is lazy; a run of exactly five 1s at the very end of the
/// input still gets its trailing 0.
pub fn stuff<I>(bits: I) -> Stuff<I::IntoIter>
where
    I: IntoIterator<Item = bool>,
{
    Stuff {
        src: bits.into_iter(),
        run: 0,
        pending_zero: false,
    }
}

/// Undo [`stuff`]: discard the 0 that follows every run of five 1s.
pub fn unstuff<I>(bits: I) -> Unstuff<I::IntoIter>
where
    I: IntoIterator<Item = bool>,
{
    Unstuff {
        src: bits.into_iter(),
        run: 0,
        skip_next: false,
    }
}

/// Iterator adapter returned by [`stuff`].
#[derive(Debug, Clone)]
pub struct Stuff<I> {
    src: I,
    run: u8,
    pending_zero: bool,
}

impl<I> Iterator for Stuff<I>
where
    I: Iterator<Item = bool>,
{
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.pending_zero {
            // The synthetic 0 does not count toward a new run.
            self.pending_zero = false;
            self.run = 0;
            return Some(false);
        }
        let bit = self.src.next()?;
        if bit {
            self.run += 1;
            if self.run == 5 {
                self.pending_zero = true;
            }
        } else {
            self.run = 0;
        }
        Some(bit)
    }
}

/// Iterator adapter returned by [`unstuff`].
#[derive(Debug, Clone)]
pub struct Unstuff<I> {
    src: I,
    run: u8,
    skip_next: bool,
}

impl<I> Iterator for Unstuff<I>
where
    I: Iterator<Item = bool>,
{
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        loop {
            let bit = self.src.next()?;
            if self.skip_next {
                // Stuffing bit; discard without counting it.
                self.skip_next = false;
                continue;
            }
            if bit {
                self.run += 1;
                if self.run == 5 {
                    self.skip_next = true;
                    self.run = 0;
                }
            } else {
                self.run = 0;
            }
            return Some(bit);
        }
    }
}

#[cfg(test)]
fn bools(s: &str) -> Vec<bool> {
    s.chars().map(|c| c == '1').collect()
}

#[test]
fn stuff_leaves_short_runs_alone() {
    let input = bools("0010111101");
    let stuffed: Vec<bool> = stuff(input.iter().copied()).collect();
    assert_eq!(stuffed, input);
}

#[test]
fn stuff_inserts_zero_after_five_ones() {
    let stuffed: Vec<bool> = stuff(bools("11111")).collect();
    assert_eq!(stuffed, bools("111110"));
}

#[test]
fn stuff_counter_resets_after_inserted_zero() {
    // Ten 1s become two stuffed runs of five.
    let stuffed: Vec<bool> = stuff(bools("1111111111")).collect();
    assert_eq!(stuffed, bools("111110111110"));
}

#[test]
fn stuff_run_broken_by_zero_restarts_count() {
    let stuffed: Vec<bool> = stuff(bools("111110110")).collect();
    assert_eq!(stuffed, bools("1111100110"));
}

#[test]
fn stuff_known_byte_stream() {
    // Bytes 00 FF 55 in wire order, with the run crossing the FF/55 boundary.
    let input = from_bytes(&[0x00, 0xFF, 0x55]);
    let stuffed: Vec<bool> = stuff(input.iter().by_vals()).collect();
    assert_eq!(stuffed, bools("0000000011111011110101010"));
}

#[test]
fn unstuff_removes_zero_after_five_ones() {
    let unstuffed: Vec<bool> = unstuff(bools("111110111")).collect();
    assert_eq!(unstuffed, bools("11111111"));
}

#[test]
fn unstuff_inverts_stuff() {
    for pattern in [
        "",
        "0",
        "1",
        "11111",
        "111111111111",
        "0111110111110",
        "1010101111101111",
    ] {
        let input = bools(pattern);
        let round: Vec<bool> = unstuff(stuff(input.iter().copied())).collect();
        assert_eq!(round, input, "pattern {:?}", pattern);
    }
}

#[test]
fn unstuff_handles_stuffed_run_at_end_of_stream() {
    // Encoder output for a stream ending in exactly five 1s.
    let unstuffed: Vec<bool> = unstuff(bools("00111110")).collect();
    assert_eq!(unstuffed, bools("0011111"));
}

#[test]
fn byte_round_trip_is_lsb_first() {
    let bits = from_bytes(&[0x7E, 0x01]);
    let expected = bools("0111111010000000");
    assert_eq!(bits.iter().by_vals().collect::<Vec<bool>>(), expected);
    assert_eq!(to_bytes(&bits), vec![0x7E, 0x01]);
}

#[test]
fn to_bytes_drops_ragged_tail() {
    let mut bits = from_bytes(&[0xA5]);
    bits.extend([true, true, true]);
    assert_eq!(to_bytes(&bits), vec![0xA5]);
}
