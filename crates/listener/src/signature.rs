//! Slack request signing (`v0` scheme).
//!
//! The signature is `v0=` followed by the hex HMAC-SHA256 of
//! `v0:<timestamp>:<raw body>`, keyed by the app's signing secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Requests whose timestamp is further than this from local time are refused.
pub const MAX_CLOCK_SKEW_SECS: i64 = 5 * 60;

const VERSION_PREFIX: &str = "v0=";

/// Reasons a request signature is refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("request timestamp is not a unix time")]
    BadTimestamp,

    #[error("request timestamp is {skew}s away from local time")]
    Stale { skew: i64 },

    #[error("signature is not a v0 hex digest")]
    Malformed,

    #[error("signature does not match")]
    Mismatch,

    #[error("signing secret is not a usable HMAC key")]
    InvalidKey,
}

/// The app's signing secret, held as a keyed HMAC state.
#[derive(Clone)]
pub struct SigningSecret(HmacSha256);

impl SigningSecret {
    pub fn new(secret: &str) -> Result<Self, SignatureError> {
        HmacSha256::new_from_slice(secret.as_bytes())
            .map(Self)
            .map_err(|_| SignatureError::InvalidKey)
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> HmacSha256 {
        let mut mac = self.0.clone();
        mac.update(b"v0:");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        mac
    }

    /// Returns the `X-Slack-Signature` value for a request.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        let digest = self.mac(timestamp, body).finalize().into_bytes();
        format!("{VERSION_PREFIX}{}", hex::encode(digest))
    }

    /// Verifies a request against `now` (unix seconds).
    pub fn verify(
        &self,
        timestamp: &str,
        signature: &str,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let sent: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::BadTimestamp)?;
        let skew = (now - sent).abs();
        if skew > MAX_CLOCK_SKEW_SECS {
            return Err(SignatureError::Stale { skew });
        }

        let digest = signature
            .strip_prefix(VERSION_PREFIX)
            .and_then(|hex_digest| hex::decode(hex_digest).ok())
            .ok_or(SignatureError::Malformed)?;

        self.mac(timestamp, body)
            .verify_slice(&digest)
            .map_err(|_| SignatureError::Mismatch)
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Example from Slack's request verification guide.
    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const TIMESTAMP: &str = "1531420618";
    const BODY: &[u8] = b"token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
    const EXPECTED: &str = "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503";

    fn secret() -> SigningSecret {
        SigningSecret::new(SECRET).unwrap()
    }

    #[test]
    fn matches_the_published_example() {
        assert_eq!(secret().sign(TIMESTAMP, BODY), EXPECTED);
        assert_eq!(secret().verify(TIMESTAMP, EXPECTED, BODY, 1_531_420_618), Ok(()));
    }

    #[test]
    fn refuses_tampered_bodies() {
        let result = secret().verify(TIMESTAMP, EXPECTED, b"token=other", 1_531_420_618);
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn refuses_stale_timestamps() {
        let now = 1_531_420_618 + MAX_CLOCK_SKEW_SECS + 1;
        assert_eq!(
            secret().verify(TIMESTAMP, EXPECTED, BODY, now),
            Err(SignatureError::Stale {
                skew: MAX_CLOCK_SKEW_SECS + 1
            })
        );
        assert!(secret()
            .verify(TIMESTAMP, EXPECTED, BODY, now - 1)
            .is_ok());
    }

    #[test]
    fn refuses_malformed_input() {
        let now = 1_531_420_618;
        assert_eq!(
            secret().verify("yesterday", EXPECTED, BODY, now),
            Err(SignatureError::BadTimestamp)
        );
        assert_eq!(
            secret().verify(TIMESTAMP, "v1=abcd", BODY, now),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            secret().verify(TIMESTAMP, "v0=not-hex", BODY, now),
            Err(SignatureError::Malformed)
        );
    }
}
