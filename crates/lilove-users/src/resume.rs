use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Result, UserError};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";

/// Issues and verifies stateless resume tokens.
///
/// A resume token lets a reconnecting client skip the session collaborator
/// round-trip: `v1.{user_id}.{hex(hmac_sha256(user_id))}`. The token carries
/// no expiry — rotating the gateway secret invalidates every outstanding
/// token at once, and the client falls back to its bearer token.
pub struct ResumeKeyring {
    key: Vec<u8>,
}

impl ResumeKeyring {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    pub fn issue(&self, user_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("hmac accepts any key length");
        mac.update(user_id.as_bytes());
        let tag = hex::encode(mac.finalize().into_bytes());
        format!("{TOKEN_VERSION}.{user_id}.{tag}")
    }

    /// Verify a token and return the embedded user id.
    pub fn verify(&self, token: &str) -> Result<String> {
        let mut parts = token.splitn(3, '.');
        let (version, user_id, tag) = match (parts.next(), parts.next(), parts.next()) {
            (Some(v), Some(u), Some(t)) => (v, u, t),
            _ => return Err(UserError::InvalidResumeToken("malformed".to_string())),
        };
        if version != TOKEN_VERSION {
            return Err(UserError::InvalidResumeToken(format!(
                "unsupported version: {version}"
            )));
        }
        let tag_bytes = hex::decode(tag)
            .map_err(|_| UserError::InvalidResumeToken("bad tag encoding".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(&self.key).expect("hmac accepts any key length");
        mac.update(user_id.as_bytes());
        mac.verify_slice(&tag_bytes)
            .map_err(|_| UserError::InvalidResumeToken("signature mismatch".to_string()))?;

        Ok(user_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_verify_round_trip() {
        let keyring = ResumeKeyring::new("s3cret");
        let token = keyring.issue("user-123");
        assert_eq!(keyring.verify(&token).unwrap(), "user-123");
    }

    #[test]
    fn tampered_user_id_fails() {
        let keyring = ResumeKeyring::new("s3cret");
        let token = keyring.issue("user-123");
        let forged = token.replace("user-123", "user-999");
        assert!(keyring.verify(&forged).is_err());
    }

    #[test]
    fn rotated_secret_invalidates_tokens() {
        let token = ResumeKeyring::new("old").issue("user-123");
        assert!(ResumeKeyring::new("new").verify(&token).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let keyring = ResumeKeyring::new("s3cret");
        for bad in ["", "v1.only-two", "v2.user.00", "v1.user.not-hex"] {
            assert!(keyring.verify(bad).is_err(), "{bad:?} should fail");
        }
    }
}
