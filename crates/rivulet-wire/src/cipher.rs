//! Keyed XOR stream cipher for segment payloads.
//!
//! Length-preserving and symmetric: applying the cipher twice with the same
//! key yields the original bytes, so encryption and decryption are the same
//! operation. This is a pedagogical construction and makes no security
//! claims.

use bytes::Bytes;

/// Key both endpoints assume before a key exchange has happened.
pub const DEFAULT_KEY: &[u8] = b"Redes2026";

/// Number of bytes in a generated session key.
pub const KEY_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct XorCipher {
    key: Vec<u8>,
}

impl XorCipher {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Produces a fresh random session key for the handshake.
    pub fn generate_key() -> [u8; KEY_LEN] {
        rand::random::<[u8; KEY_LEN]>()
    }

    /// XORs every byte with the key, cycling the key as needed.
    ///
    /// An empty key degenerates to the identity transformation.
    pub fn apply(&self, data: &[u8]) -> Bytes {
        if self.key.is_empty() {
            return Bytes::copy_from_slice(data);
        }

        let mut out = Vec::with_capacity(data.len());
        for (i, byte) in data.iter().enumerate() {
            out.push(byte ^ self.key[i % self.key.len()]);
        }
        Bytes::from(out)
    }

    #[inline]
    pub fn encrypt(&self, data: &[u8]) -> Bytes {
        self.apply(data)
    }

    #[inline]
    pub fn decrypt(&self, data: &[u8]) -> Bytes {
        self.apply(data)
    }
}

impl Default for XorCipher {
    fn default() -> Self {
        Self::new(DEFAULT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_restores_plaintext() {
        let cipher = XorCipher::default();
        let plain = b"the quick brown fox jumps over the lazy dog";
        let scrambled = cipher.encrypt(plain);
        assert_ne!(scrambled.as_ref(), plain.as_slice());
        assert_eq!(cipher.decrypt(&scrambled).as_ref(), plain.as_slice());
    }

    #[test]
    fn key_cycles_over_long_payloads() {
        let cipher = XorCipher::new(vec![0xAA, 0x55]);
        let plain = [0x00u8, 0x00, 0x00, 0x00];
        let out = cipher.apply(&plain);
        assert_eq!(out.as_ref(), &[0xAA, 0x55, 0xAA, 0x55]);
    }

    #[test]
    fn output_length_matches_input() {
        let cipher = XorCipher::default();
        for len in [0usize, 1, 9, 10, 1000] {
            let data = vec![0x7Fu8; len];
            assert_eq!(cipher.apply(&data).len(), len);
        }
    }

    #[test]
    fn generated_key_roundtrips() {
        let key = XorCipher::generate_key();
        assert_eq!(key.len(), KEY_LEN);
        let cipher = XorCipher::new(key.to_vec());
        let plain = b"session data";
        assert_eq!(cipher.decrypt(&cipher.encrypt(plain)).as_ref(), plain.as_slice());
    }

    #[test]
    fn empty_key_is_identity() {
        let cipher = XorCipher::new(Vec::new());
        assert_eq!(cipher.apply(b"abc").as_ref(), b"abc");
    }
}
