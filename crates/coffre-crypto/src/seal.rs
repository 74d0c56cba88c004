//! One-shot resource sealing with XChaCha20-Poly1305.
//!
//! All functions are pure - random bytes must be provided by the caller.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};

use crate::{
    error::SealError,
    format::{self, NONCE_SIZE, SIMPLE_HEADER_SIZE, SIMPLE_VERSION},
    keys::{ResourceId, ResourceKey},
};

/// Seal a plaintext into the simple format.
///
/// Output length is exactly `plaintext.len() + SIMPLE_OVERHEAD`. The empty
/// plaintext is legal and produces a header-plus-tag ciphertext. The header
/// (version, resource ID, nonce) is authenticated as associated data, so a
/// ciphertext cannot be re-labelled with a different resource ID.
///
/// # Security
///
/// - Caller MUST provide a fresh random nonce per seal in production
pub fn seal(
    key: &ResourceKey,
    id: ResourceId,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(plaintext.len() + format::SIMPLE_OVERHEAD);
    out.push(SIMPLE_VERSION);
    out.extend_from_slice(id.as_bytes());
    out.extend_from_slice(nonce);

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let payload = Payload { msg: plaintext, aad: &out[..SIMPLE_HEADER_SIZE] };
    let Ok(body) = cipher.encrypt(XNonce::from_slice(nonce), payload) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    out.extend_from_slice(&body);
    out
}

/// Open a simple-format ciphertext and return the plaintext.
///
/// # Errors
///
/// - [`SealError::Truncated`]: input shorter than a header-only ciphertext
/// - [`SealError::UnsupportedVersion`]: not a simple-format resource
/// - [`SealError::DecryptionFailed`]: wrong key or tampered bytes
pub fn open(key: &ResourceKey, sealed: &[u8]) -> Result<Vec<u8>, SealError> {
    let (_, nonce, header, body) = format::parse_simple(sealed)?;

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let payload = Payload { msg: body, aad: header };
    cipher
        .decrypt(XNonce::from_slice(&nonce), payload)
        .map_err(|_| SealError::DecryptionFailed { reason: "authentication failed" })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::format::SIMPLE_OVERHEAD;

    fn test_key(seed: u8) -> ResourceKey {
        ResourceKey::from_bytes([seed; 32])
    }

    const ID: ResourceId = ResourceId::from_bytes([0x11; 16]);

    #[test]
    fn seal_open_roundtrip() {
        let key = test_key(1);
        let sealed = seal(&key, ID, &[0xAB; 24], b"attack at dawn");
        assert_eq!(open(&key, &sealed).unwrap(), b"attack at dawn");
    }

    #[test]
    fn empty_plaintext_produces_header_only_ciphertext() {
        let key = test_key(1);
        let sealed = seal(&key, ID, &[0x00; 24], b"");
        assert_eq!(sealed.len(), SIMPLE_OVERHEAD);
        assert_eq!(open(&key, &sealed).unwrap(), b"");
    }

    #[test]
    fn overhead_is_fixed_regardless_of_content() {
        let key = test_key(1);
        for size in [0usize, 1, 57, 4096] {
            let sealed = seal(&key, ID, &[0x01; 24], &vec![0x42u8; size]);
            assert_eq!(sealed.len(), size + SIMPLE_OVERHEAD);
        }
    }

    #[test]
    fn header_carries_resource_id() {
        let key = test_key(1);
        let sealed = seal(&key, ID, &[0x02; 24], b"data");
        assert_eq!(format::resource_id(&sealed).unwrap(), ID);
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let sealed = seal(&test_key(1), ID, &[0x03; 24], b"secret");
        assert!(matches!(
            open(&test_key(2), &sealed),
            Err(SealError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn tampered_body_fails_to_open() {
        let key = test_key(1);
        let mut sealed = seal(&key, ID, &[0x04; 24], b"original");
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(open(&key, &sealed).is_err());
    }

    #[test]
    fn relabelled_resource_id_fails_to_open() {
        let key = test_key(1);
        let mut sealed = seal(&key, ID, &[0x05; 24], b"payload");
        // Flip a resource ID byte; the header is authenticated as AAD
        sealed[1] ^= 0x01;
        assert!(open(&key, &sealed).is_err());
    }

    #[test]
    fn truncated_input_reports_truncation() {
        let key = test_key(1);
        let sealed = seal(&key, ID, &[0x06; 24], b"xyz");
        assert!(matches!(
            open(&key, &sealed[..SIMPLE_OVERHEAD - 1]),
            Err(SealError::Truncated { .. })
        ));
    }
}
