use std::hash::Hasher;

const SEED: u32 = 5381;

/// Rolling 32-bit byte hash (`h = h * 33 + byte`) used to fingerprint the stack's buffer and
/// control block.
///
/// Every byte changes the state through an odd multiplier, so flipping any single byte always
/// yields a different fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(u32);

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint(SEED)
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Fingerprint {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 = self.0.wrapping_mul(33).wrapping_add(u32::from(byte));
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.0)
    }
}

/// Fingerprint of a byte range.
pub fn fingerprint(bytes: &[u8]) -> u32 {
    let mut hasher = Fingerprint::new();
    hasher.write(bytes);
    hasher.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_the_seed() {
        assert_eq!(fingerprint(&[]), SEED);
    }

    #[test]
    fn known_value() {
        // 5381 * 33 + 'a'
        assert_eq!(fingerprint(b"a"), 5381 * 33 + 97);
    }

    #[test]
    fn single_byte_flip_is_detected() {
        let data: Vec<u8> = (0..=255).collect();
        let original = fingerprint(&data);
        for i in 0..data.len() {
            let mut corrupted = data.clone();
            corrupted[i] ^= 0x01;
            assert_ne!(fingerprint(&corrupted), original, "flip at byte {}", i);
        }
    }

    #[test]
    fn order_matters() {
        assert_ne!(fingerprint(b"ab"), fingerprint(b"ba"));
    }

    #[test]
    fn hasher_matches_helper_across_chunks() {
        let mut hasher = Fingerprint::new();
        hasher.write(b"canary");
        hasher.write(b"stack");
        assert_eq!(hasher.value(), fingerprint(b"canarystack"));
        assert_eq!(hasher.finish(), u64::from(fingerprint(b"canarystack")));
    }
}
