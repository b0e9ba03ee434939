//! Identity ↔ public-key codec.
//!
//! An identity is a 60-character textual encoding of a 32-byte public key: a
//! 52-character base32 (RFC 4648, unpadded, uppercase) rendering of the key
//! bytes followed by an 8-character uppercase-hex checksum (the first 4 bytes
//! of SHA-256 over the key). This mirrors the base32-over-pubkey shape used
//! elsewhere in this codebase's contract-id handling, extended with a
//! checksum so a corrupted identity string is detectable rather than silently
//! decoding to the wrong key.

use base32::Alphabet;
use openssl::sha::Sha256;

use crate::CryptoError;

const BASE32_LEN: usize = 52;
const CHECKSUM_LEN: usize = 8;
const IDENTITY_LEN: usize = BASE32_LEN + CHECKSUM_LEN;

fn checksum_hex(public_key: &[u8; 32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public_key);
    let digest = hasher.finish();
    hex::encode_upper(&digest[..4])
}

/// `identityFromPublicKey`.
pub fn identity_from_public_key(public_key: &[u8; 32]) -> String {
    let body = base32::encode(Alphabet::Rfc4648 { padding: false }, public_key).to_uppercase();
    format!("{body}{}", checksum_hex(public_key))
}

/// `publicKeyFromIdentity`.
pub fn public_key_from_identity(identity: &str) -> Result<[u8; 32], CryptoError> {
    if identity.len() != IDENTITY_LEN {
        return Err(CryptoError::InvalidIdentity(format!(
            "expected {IDENTITY_LEN} characters, got {}",
            identity.len()
        )));
    }
    let (body, checksum) = identity.split_at(BASE32_LEN);
    let decoded = base32::decode(Alphabet::Rfc4648 { padding: false }, body)
        .ok_or_else(|| CryptoError::InvalidIdentity("invalid base32 body".into()))?;
    if decoded.len() != 32 {
        return Err(CryptoError::InvalidIdentity(format!(
            "base32 body decoded to {} bytes, expected 32",
            decoded.len()
        )));
    }
    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&decoded);

    let expected_checksum = checksum_hex(&public_key);
    if !checksum.eq_ignore_ascii_case(&expected_checksum) {
        return Err(CryptoError::InvalidIdentity(
            "checksum mismatch".to_string(),
        ));
    }
    Ok(public_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips_through_public_key() {
        let public_key = [7u8; 32];
        let identity = identity_from_public_key(&public_key);
        assert_eq!(identity.len(), IDENTITY_LEN);
        let decoded = public_key_from_identity(&identity).unwrap();
        assert_eq!(decoded, public_key);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(public_key_from_identity("too-short").is_err());
    }

    #[test]
    fn rejects_tampered_checksum() {
        let identity = identity_from_public_key(&[3u8; 32]);
        let mut chars: Vec<char> = identity.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert!(public_key_from_identity(&tampered).is_err());
    }

    proptest::proptest! {
        #[test]
        fn round_trip_holds_for_arbitrary_keys(bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 32..=32)) {
            let mut public_key = [0u8; 32];
            public_key.copy_from_slice(&bytes);
            let identity = identity_from_public_key(&public_key);
            let decoded = public_key_from_identity(&identity).unwrap();
            proptest::prop_assert_eq!(decoded, public_key);
        }
    }
}
