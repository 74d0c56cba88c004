//! Entropy for resource keys, identifiers, nonces, and salts.

use rand::RngCore;

/// Fill a fixed-size array from the thread-local CSPRNG.
pub(crate) fn random_array<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}
