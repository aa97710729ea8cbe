//! Bit packing and clock-rescaling helpers shared by every format codec.

/// Splits `n` into `bits` binary digits, least-significant bit first.
///
/// # Test
///
/// ```
/// use ircode::pulse::{to_bits_lsb, from_bits_lsb};
///
/// assert_eq!(to_bits_lsb(0b0110, 4), vec![0, 1, 1, 0]);
/// assert_eq!(from_bits_lsb(&to_bits_lsb(201, 8)), 201);
/// ```
pub fn to_bits_lsb(n: u32, bits: u32) -> Vec<u8> {
    (0..bits).map(|i| ((n >> i) & 1) as u8).collect()
}

/// Splits `n` into `bits` binary digits, most-significant bit first.
pub fn to_bits_msb(n: u32, bits: u32) -> Vec<u8> {
    (0..bits).rev().map(|i| ((n >> i) & 1) as u8).collect()
}

/// Inverse of [`to_bits_lsb`].
pub fn from_bits_lsb(bits: &[u8]) -> u32 {
    bits.iter()
        .enumerate()
        .fold(0u32, |acc, (i, &b)| acc | ((b as u32) << i))
}

/// Inverse of [`to_bits_msb`].
pub fn from_bits_msb(bits: &[u8]) -> u32 {
    let reversed: Vec<u8> = bits.iter().rev().copied().collect();
    from_bits_lsb(&reversed)
}

/// Rounds the ratio `num / den` (both non-negative) to the nearest integer,
/// breaking exact ties towards the nearest even integer.
///
/// Implemented with exact integer arithmetic (no floating point) so it stays
/// correct at the magnitudes this crate deals with.
fn round_ratio_half_even(num: i128, den: i128) -> i64 {
    debug_assert!(den > 0);
    let q = num.div_euclid(den);
    let r = num.rem_euclid(den);
    let twice_r = r * 2;
    let rounded = if twice_r < den {
        q
    } else if twice_r > den {
        q + 1
    } else if q % 2 == 0 {
        q
    } else {
        q + 1
    };
    rounded as i64
}

/// Rescales a pulse sequence from one clock to another using cumulative
/// time, so rounding error never accumulates across the sequence: each
/// pulse is the delta between two cumulative-time roundings rather than an
/// independently rounded value.
///
/// # Test
///
/// ```
/// use ircode::pulse::scale_pulses;
///
/// let us = vec![9024, 4512, 563, 1687];
/// let ticks = scale_pulses(&us, 1_000_000, 30453);
/// let back = scale_pulses(&ticks, 30453, 1_000_000);
/// for (a, b) in us.iter().zip(back.iter()) {
///     assert!((a - b).abs() <= 40);
/// }
/// ```
pub fn scale_pulses(pulses: &[i64], from_clock: i64, to_clock: i64) -> Vec<i64> {
    let mut elapsed_source = 0i64;
    let mut last_target_tick = 0i64;
    let mut scaled = Vec::with_capacity(pulses.len());

    for &pulse in pulses {
        elapsed_source += pulse;
        let target_tick =
            round_ratio_half_even(elapsed_source as i128 * to_clock as i128, from_clock as i128);
        scaled.push(target_tick - last_target_tick);
        last_target_tick = target_tick;
    }

    scaled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_pack_round_trip_lsb() {
        for n in 0u32..256 {
            assert_eq!(from_bits_lsb(&to_bits_lsb(n, 8)), n);
        }
    }

    #[test]
    fn bit_pack_round_trip_msb() {
        for n in 0u32..32 {
            assert_eq!(from_bits_msb(&to_bits_msb(n, 5)), n);
        }
    }

    #[test]
    fn to_bits_lsb_matches_manual() {
        assert_eq!(to_bits_lsb(0xED, 8), vec![1, 0, 1, 1, 0, 1, 1, 1]);
    }

    #[test]
    fn to_bits_msb_matches_manual() {
        assert_eq!(to_bits_msb(5, 5), vec![0, 0, 1, 0, 1]);
    }

    #[test]
    fn scale_pulses_identity_clock() {
        let pulses = vec![9024, 4512, 563, 1687, 563, 40000];
        assert_eq!(scale_pulses(&pulses, 1_000_000, 1_000_000), pulses);
    }

    #[test]
    fn scale_pulses_round_trip_drift_bounded() {
        let pulses = vec![563, 563, 1689, 563, 40000];
        let ticks = scale_pulses(&pulses, 1_000_000, 38000);
        let back = scale_pulses(&ticks, 38000, 1_000_000);
        let total_before: i64 = pulses.iter().sum();
        let total_after: i64 = back.iter().sum();
        assert!((total_before - total_after).abs() <= 30);
    }

    #[test]
    fn scale_pulses_half_even_tie() {
        // 1 * 1 / 2 = 0.5 ties to 0 (even); 3 * 1 / 2 = 1.5 ties to 2 (even).
        assert_eq!(scale_pulses(&[1], 2, 1), vec![0]);
        assert_eq!(scale_pulses(&[1, 2], 2, 1), vec![0, 2]);
    }
}
