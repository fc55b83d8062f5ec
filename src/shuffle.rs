//! Amiga odd/even bit interleaving.
//!
//! The Amiga trackdisk format never stores a 32-bit value directly. Instead it splits the word
//! into its odd-indexed and even-indexed bits and writes each half as its own 16-bit quantity,
//! odd half first. `shuffle` performs the split; `unshuffle` is its inverse.

/// Interleave `odd` and `even` back into the 32-bit word they were split from.
///
/// The i-th output bit pair (MSB-first, i = 0 is the topmost pair) is `(odd bit 15-i, even bit
/// 15-i)`, with the odd bit contributing the high bit of the pair.
pub fn unshuffle(odd: u16, even: u16) -> u32 {
    let mut word: u32 = 0;
    for i in 0..16 {
        let shift = 15 - i;
        let odd_bit = (odd >> shift) & 1;
        let even_bit = (even >> shift) & 1;
        word = (word << 2) | ((odd_bit as u32) << 1) | (even_bit as u32);
    }
    word
}

/// Split a 32-bit word into its odd-indexed and even-indexed bit halves.
///
/// Bit `31-2i` of `word` becomes bit `15-i` of `odd`; bit `30-2i` becomes bit `15-i` of `even`.
pub fn shuffle(word: u32) -> (u16, u16) {
    let mut odd: u16 = 0;
    let mut even: u16 = 0;
    for i in 0..16 {
        let odd_bit = (word >> (31 - 2 * i)) & 1;
        let even_bit = (word >> (30 - 2 * i)) & 1;
        odd = (odd << 1) | odd_bit as u16;
        even = (even << 1) | even_bit as u16;
    }
    (odd, even)
}
