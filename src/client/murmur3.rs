//! Seedable 128-bit murmur3 (x64 variant), used to derive the `buvid_fp`
//! device fingerprint. The platform validates the fingerprint against the
//! payload it accompanies, so the output must be byte-stable across runs.

const C1: u64 = 0x87c3_7b91_1142_53d5;
const C2: u64 = 0x4cf5_ad43_2745_937f;

fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

fn read_u64_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Hash `data` with the given seed into a 128-bit value (high lane in the
/// upper 64 bits).
pub fn hash128(data: &[u8], seed: u64) -> u128 {
    let mut h1 = seed;
    let mut h2 = seed;

    let blocks = data.len() / 16;
    for i in 0..blocks {
        let k1 = read_u64_le(&data[i * 16..i * 16 + 8]);
        let k2 = read_u64_le(&data[i * 16 + 8..i * 16 + 16]);

        h1 ^= k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
        h1 = h1
            .rotate_left(27)
            .wrapping_add(h2)
            .wrapping_mul(5)
            .wrapping_add(0x52dc_e729);
        h2 ^= k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
        h2 = h2
            .rotate_left(31)
            .wrapping_add(h1)
            .wrapping_mul(5)
            .wrapping_add(0x3849_5ab5);
    }

    // Partial tail block, folded byte by byte.
    let tail = &data[blocks * 16..];
    let mut k1 = 0u64;
    let mut k2 = 0u64;
    for (i, &b) in tail.iter().enumerate() {
        if i < 8 {
            k1 |= u64::from(b) << (8 * i);
        } else {
            k2 |= u64::from(b) << (8 * (i - 8));
        }
    }
    if tail.len() > 8 {
        h2 ^= k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
    }
    if !tail.is_empty() {
        h1 ^= k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
    }

    let len = data.len() as u64;
    h1 ^= len;
    h2 ^= len;
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);
    h1 = fmix64(h1);
    h2 = fmix64(h2);
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    (u128::from(h2) << 64) | u128::from(h1)
}

/// Fingerprint string: low lane then high lane, lowercase hex without
/// leading zeros (the format the frontend emits).
pub fn fingerprint_hex(payload: &str, seed: u64) -> String {
    let digest = hash128(payload.as_bytes(), seed);
    let low = digest as u64;
    let high = (digest >> 64) as u64;
    format!("{low:x}{high:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lanes(data: &[u8], seed: u64) -> (u64, u64) {
        let v = hash128(data, seed);
        (v as u64, (v >> 64) as u64)
    }

    // Fixed vectors covering empty input, sub-block, exact-block and
    // multi-block-with-tail lengths.
    #[test]
    fn known_vectors() {
        assert_eq!(hash128(b"", 0), 0);
        assert_eq!(lanes(b"", 31), (0x2470_0f9f_1986_800a, 0xb4fc_c880_530d_d0ed));
        assert_eq!(lanes(b"a", 31), (0x4ca5_e27c_ea02_e8c2, 0x5578_e293_6b00_61e4));
        assert_eq!(
            lanes(b"hello world", 0),
            (0x533f_6046_eb7f_610e, 0xab97_467d_60eb_63b1)
        );
        assert_eq!(
            lanes(b"The quick brown fox jumps over the lazy dog", 31),
            (0x0be0_b79c_4b07_42dc, 0x6f54_2fbb_a04a_21a1)
        );
        // Exactly one block, no tail.
        assert_eq!(
            lanes(b"0123456789abcdef", 7),
            (0x500c_a036_48b1_f185, 0xd5c2_a273_849b_13ab)
        );
        // One block plus a single tail byte.
        assert_eq!(
            lanes(b"0123456789abcdef0", 7),
            (0xf5f2_6de0_2f93_4af3, 0x1f66_ca61_7080_3b77)
        );
        // Two blocks plus a five-byte tail.
        let bytes: Vec<u8> = (0u8..37).collect();
        assert_eq!(
            lanes(&bytes, 31),
            (0xaaf5_01fa_e355_3438, 0x4189_fa2b_05ba_6b61)
        );
    }

    #[test]
    fn single_byte_change_alters_output() {
        let a = hash128(b"hello world", 0);
        let b = hash128(b"hello worle", 0);
        assert_ne!(a, b);
        assert_ne!(hash128(b"a", 31), hash128(b"a", 32));
    }

    #[test]
    fn fingerprint_format_matches_frontend() {
        assert_eq!(
            fingerprint_hex(r#"{"payload":"test"}"#, 31),
            "caa7dab8cebdbd39fd05c79431823958"
        );
    }
}
