//! Callback signature verification.
//!
//! DingTalk signs each outgoing-robot callback with
//! `base64(HMAC-SHA256(key = secret, "{timestamp}\n{secret}"))` and sends the
//! result in the `sign` header next to the `timestamp` header (epoch millis).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Compute the signature DingTalk sends for `timestamp`.
///
/// HMAC accepts keys of any length, so this is empty only if the key is
/// rejected, which [`verify`] treats as a mismatch.
pub fn sign(timestamp: &str, secret: &str) -> String {
    digest(timestamp, secret)
        .map(|bytes| STANDARD.encode(bytes))
        .unwrap_or_default()
}

fn digest(timestamp: &str, secret: &str) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("{}\n{}", timestamp, secret).as_bytes());
    Some(mac.finalize().into_bytes().to_vec())
}

/// Check `signature` against the one computed for `timestamp`.
///
/// Freshness of `timestamp` is not checked here, see [`is_fresh`].
pub fn verify(timestamp: &str, signature: &str, secret: &str) -> bool {
    let expected = sign(timestamp, secret);
    // Constant-time comparison
    !expected.is_empty()
        && expected.len() == signature.len()
        && expected
            .as_bytes()
            .iter()
            .zip(signature.as_bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Whether a millisecond `timestamp` lies within `window` of `now`.
///
/// Non-numeric timestamps are never fresh.
pub fn is_fresh(timestamp: &str, now: DateTime<Utc>, window: Duration) -> bool {
    let Ok(millis) = timestamp.trim().parse::<i64>() else {
        return false;
    };
    let skew = now.timestamp_millis().abs_diff(millis);
    u128::from(skew) <= window.as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "SECxxxxxxxxxxxxxxxxxxxxxxxxxxxxx";

    #[test]
    fn test_sign_and_verify() {
        let ts = "1700000000000";
        let sig = sign(ts, SECRET);
        assert!(verify(ts, &sig, SECRET));
        assert!(!verify(ts, &sig, "other-secret"));
        assert!(!verify("1700000000001", &sig, SECRET));
    }

    #[test]
    fn test_known_vector() {
        // base64(HMAC-SHA256("key", "1\nkey"))
        let expected = STANDARD.encode({
            let mut mac = HmacSha256::new_from_slice(b"key").unwrap();
            mac.update(b"1\nkey");
            mac.finalize().into_bytes()
        });
        assert_eq!(sign("1", "key"), expected);
        assert_eq!(expected.len(), 44);
    }

    #[test]
    fn test_single_character_mutation_fails() {
        let ts = "1700000000000";
        let sig = sign(ts, SECRET);
        for i in 0..sig.len() {
            let mut bytes = sig.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let mutated = String::from_utf8(bytes).unwrap();
            assert!(!verify(ts, &mutated, SECRET), "mutation at {} accepted", i);
        }
        assert!(!verify(ts, &sig[1..], SECRET));
        assert!(!verify(ts, "", SECRET));
    }

    #[test]
    fn test_any_key_length_signs() {
        for secret in ["", "k", &"s".repeat(200)] {
            let sig = sign("1700000000000", secret);
            assert_eq!(sig.len(), 44);
            assert!(verify("1700000000000", &sig, secret));
        }
    }

    #[test]
    fn test_is_fresh() {
        let now = Utc::now();
        let window = Duration::from_secs(3600);
        let ms = now.timestamp_millis();

        assert!(is_fresh(&ms.to_string(), now, window));
        assert!(is_fresh(&(ms - 3_599_000).to_string(), now, window));
        assert!(is_fresh(&(ms + 3_599_000).to_string(), now, window));
        assert!(!is_fresh(&(ms - 3_601_000).to_string(), now, window));
        assert!(!is_fresh(&(ms + 3_601_000).to_string(), now, window));
        assert!(!is_fresh("yesterday", now, window));
    }
}
