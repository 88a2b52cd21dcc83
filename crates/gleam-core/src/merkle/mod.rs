pub mod mmr;

pub use mmr::*;

use tiny_keccak::{Hasher, Keccak};

/// Compute keccak256 hash of data.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// keccak256 of two 32-byte nodes concatenated (left first).
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(left);
    hasher.update(right);
    hasher.finalize(&mut output);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            keccak256(&[]),
            hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn test_hash_pair_matches_concatenation() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let mut joined = [0u8; 64];
        joined[..32].copy_from_slice(&a);
        joined[32..].copy_from_slice(&b);
        assert_eq!(hash_pair(&a, &b), keccak256(&joined));

        // Order matters
        assert_ne!(hash_pair(&a, &b), hash_pair(&b, &a));
    }
}
