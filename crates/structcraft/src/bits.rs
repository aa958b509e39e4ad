//! Low-level integer and bit manipulation helpers shared by the codecs.

/// Mask covering the low `bits` bits (`bits` in 1..=64).
pub fn mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Inclusive value range of a `bits`-wide two's complement or unsigned integer.
pub fn int_range(bits: usize, signed: bool) -> (i128, i128) {
    if signed {
        let half = 1i128 << (bits - 1);
        (-half, half - 1)
    } else {
        (0, (1i128 << bits) - 1)
    }
}

/// Smallest byte width out of 1, 2, 4 and 8 that holds `bits` bits.
pub fn container_bytes(bits: usize) -> Option<usize> {
    [1usize, 2, 4, 8].into_iter().find(|bytes| bits <= bytes * 8)
}
