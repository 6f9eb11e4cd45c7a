use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Public client identifiers carry a prefix so they are recognizable in
/// logs and cannot be confused with secret material.
pub const CLIENT_ID_PREFIX: &str = "ch_";

/// Personal access tokens are prefixed so the authentication gate can
/// dispatch on the token class without a database round-trip.
pub const PAT_PREFIX: &str = "chunk_";

/// Length of the display prefix stored alongside a PAT, shown in UIs to
/// identify the token without exposing the secret.
pub const PAT_DISPLAY_PREFIX_LEN: usize = 12;

/// Hex-encode `n` cryptographically secure random bytes.
pub fn generate_random(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn new_client_id() -> String {
    format!("{CLIENT_ID_PREFIX}{}", generate_random(16))
}

pub fn new_client_secret() -> String {
    generate_random(32)
}

pub fn new_authorization_code() -> String {
    generate_random(32)
}

pub fn new_access_token() -> String {
    generate_random(32)
}

/// Refresh tokens are longer than access tokens: they live for 30 days and
/// a leak has a correspondingly larger blast radius.
pub fn new_refresh_token() -> String {
    generate_random(48)
}

pub struct PersonalToken {
    pub token: String,
    pub display_prefix: String,
}

pub fn new_personal_token() -> PersonalToken {
    let token = format!("{PAT_PREFIX}{}", generate_random(32));
    let display_prefix = token[..PAT_DISPLAY_PREFIX_LEN].to_string();
    PersonalToken {
        token,
        display_prefix,
    }
}

/// One-way digest of a secret, suitable for unique-indexed storage. Lookups
/// re-hash the presented value; the raw secret is never persisted.
pub fn hash_token(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a presented secret against a stored digest in constant time.
/// The comparison runs over the two digests, not the inputs, so a length
/// mismatch fails closed without an exact-length timing signal.
pub fn verify_token(secret: &str, stored_hash: &str) -> bool {
    let computed = hash_token(secret);
    let a = computed.as_bytes();
    let b = stored_hash.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_random_length() {
        assert_eq!(generate_random(16).len(), 32);
        assert_eq!(generate_random(48).len(), 96);
    }

    #[test]
    fn namespace_shapes() {
        assert!(new_client_id().starts_with("ch_"));
        assert_eq!(new_client_id().len(), 3 + 32);
        assert_eq!(new_client_secret().len(), 64);
        assert_eq!(new_authorization_code().len(), 64);
        assert_eq!(new_access_token().len(), 64);
        assert_eq!(new_refresh_token().len(), 96);
    }

    #[test]
    fn personal_token_prefix() {
        let pat = new_personal_token();
        assert!(pat.token.starts_with("chunk_"));
        assert_eq!(pat.display_prefix.len(), PAT_DISPLAY_PREFIX_LEN);
        assert!(pat.token.starts_with(&pat.display_prefix));
    }

    #[test]
    fn verify_round_trip() {
        for _ in 0..1000 {
            let secret = new_client_secret();
            let hash = hash_token(&secret);
            assert!(verify_token(&secret, &hash));

            let other = new_client_secret();
            assert_ne!(secret, other);
            assert!(!verify_token(&other, &hash));
        }
    }

    #[test]
    fn verify_rejects_length_mismatch() {
        let secret = new_client_secret();
        let hash = hash_token(&secret);
        assert!(!verify_token(&secret, &hash[..32]));
        assert!(!verify_token(&secret, ""));
    }

    #[test]
    fn hash_is_deterministic() {
        let secret = new_access_token();
        assert_eq!(hash_token(&secret), hash_token(&secret));
    }
}
