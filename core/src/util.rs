use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Deterministic keyed hash: HMAC-SHA256 over `data`, rendered URL-safe
/// base64 and truncated to `length`. The alphabet avoids the characters RDS
/// rejects in master passwords (`/`, `@`, `"`, space).
pub fn keyed_hash(key: &str, data: &str, length: usize) -> String {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    let mut out = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    out.truncate(length);
    out
}

/// Hex-encoded SHA-256 of `input`, truncated to `length` characters.
pub fn sha256_hex(input: &str, length: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out.truncate(length);
    out
}

pub fn random_alphanumeric(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length).map(|_| rng.sample(Alphanumeric) as char).collect()
}

/// Random identifier of `length` characters that starts with a letter, as
/// required for RDS master usernames.
pub fn random_identifier(length: usize) -> String {
    if length == 0 {
        return String::new();
    }
    let mut rng = rand::rng();
    let first = LETTERS[rng.random_range(0..LETTERS.len())] as char;
    let mut out = String::with_capacity(length);
    out.push(first);
    for _ in 1..length {
        out.push(rng.sample(Alphanumeric) as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_hash_is_deterministic() {
        let a = keyed_hash("seed", "instance-id", 32);
        let b = keyed_hash("seed", "instance-id", 32);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn keyed_hash_varies_with_key_and_data() {
        assert_ne!(keyed_hash("seed", "iid", 32), keyed_hash("other", "iid", 32));
        assert_ne!(keyed_hash("seed", "iid", 32), keyed_hash("seed", "other", 32));
    }

    #[test]
    fn keyed_hash_avoids_forbidden_password_characters() {
        let hash = keyed_hash("some-seed", "some-instance", 32);
        assert!(!hash.contains('/'));
        assert!(!hash.contains('@'));
        assert!(!hash.contains('"'));
        assert!(!hash.contains(' '));
    }

    #[test]
    fn sha256_hex_truncates() {
        let hash = sha256_hex("binding-id", 16);
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn random_identifier_starts_with_letter() {
        for _ in 0..100 {
            let id = random_identifier(16);
            assert_eq!(id.len(), 16);
            assert!(id.chars().next().unwrap().is_ascii_alphabetic());
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
