//! Base62 encoding used for record id generation.

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode an unsigned 64-bit integer into a base62 string using the alphabet
/// 0-9, A-Z, a-z. Zero encodes to "0".
///
/// The alphabet is in ASCII order, so equal-width encodings sort the same way
/// as the numbers they encode.
pub fn encode_u64(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(11);
    while n > 0 {
        digits.push(char::from(ALPHABET[(n % 62) as usize]));
        n /= 62;
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_is_ascii_ordered() {
        assert!(ALPHABET.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn encodes_known_vectors() {
        assert_eq!(encode_u64(0), "0");
        assert_eq!(encode_u64(61), "z");
        assert_eq!(encode_u64(62), "10");
        assert_eq!(encode_u64(3843), "zz"); // 62*62-1
    }

    #[test]
    fn equal_width_encodings_sort_numerically() {
        let a = format!("{:0>4}", encode_u64(61));
        let b = format!("{:0>4}", encode_u64(62));
        assert!(a < b);
    }
}
