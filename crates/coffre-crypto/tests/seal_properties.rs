//! Property-based tests for the sealed-resource format.

use coffre_crypto::{
    ResourceId, ResourceKey, SIMPLE_OVERHEAD, SealError, open, resource_id, seal,
};
use proptest::prelude::*;

fn arb_key() -> impl Strategy<Value = ResourceKey> {
    any::<[u8; 32]>().prop_map(ResourceKey::from_bytes)
}

fn arb_id() -> impl Strategy<Value = ResourceId> {
    any::<[u8; 16]>().prop_map(ResourceId::from_bytes)
}

proptest! {
    #[test]
    fn roundtrip_for_any_plaintext(
        key in arb_key(),
        id in arb_id(),
        nonce in any::<[u8; 24]>(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let sealed = seal(&key, id, &nonce, &plaintext);
        prop_assert_eq!(open(&key, &sealed).unwrap(), plaintext);
    }

    #[test]
    fn overhead_is_constant(
        key in arb_key(),
        id in arb_id(),
        nonce in any::<[u8; 24]>(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let sealed = seal(&key, id, &nonce, &plaintext);
        prop_assert_eq!(sealed.len(), plaintext.len() + SIMPLE_OVERHEAD);
    }

    #[test]
    fn resource_id_is_recoverable_without_the_key(
        key in arb_key(),
        id in arb_id(),
        nonce in any::<[u8; 24]>(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let sealed = seal(&key, id, &nonce, &plaintext);
        prop_assert_eq!(resource_id(&sealed).unwrap(), id);
    }

    #[test]
    fn single_byte_corruption_never_opens(
        key in arb_key(),
        id in arb_id(),
        nonce in any::<[u8; 24]>(),
        plaintext in proptest::collection::vec(any::<u8>(), 1..256),
        position in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let mut sealed = seal(&key, id, &nonce, &plaintext);
        let at = position.index(sealed.len());
        sealed[at] ^= flip;

        // Any corruption either breaks the header parse or the tag
        prop_assert!(open(&key, &sealed).is_err());
    }

    #[test]
    fn garbage_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let key = ResourceKey::from_bytes([0u8; 32]);
        let _ = open(&key, &bytes);
        let _ = resource_id(&bytes);
    }

    #[test]
    fn short_inputs_are_invalid_not_crypto_failures(
        key in arb_key(),
        bytes in proptest::collection::vec(any::<u8>(), 0..57),
    ) {
        match open(&key, &bytes) {
            Err(SealError::Truncated { .. } | SealError::UnsupportedVersion(_)) => {},
            other => prop_assert!(false, "expected structural error, got {other:?}"),
        }
    }
}
