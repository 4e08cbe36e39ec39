use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{Result, UploadError};

type HmacSha1 = Hmac<Sha1>;

/// Credentials holds the auth key and the secret used to sign upload policies.
#[derive(Clone)]
pub struct Credentials {
    /// Auth key, sent in clear inside the policy
    pub auth_key: String,
    /// Auth secret, only used as the HMAC key
    auth_secret: String,
}

impl Credentials {
    /// Create new credentials from an auth key and secret
    ///
    /// # Arguments
    /// * `auth_key` - The account auth key
    /// * `auth_secret` - The account auth secret
    pub fn new(auth_key: impl Into<String>, auth_secret: impl Into<String>) -> Result<Self> {
        let auth_key = auth_key.into();
        let auth_secret = auth_secret.into();

        if auth_key.is_empty() || auth_secret.is_empty() {
            return Err(UploadError::InvalidCredentials);
        }

        Ok(Credentials {
            auth_key,
            auth_secret,
        })
    }

    /// Sign a message, returning the lowercase hex HMAC-SHA1 digest
    pub fn sign(&self, message: &[u8]) -> Result<String> {
        let mut mac = HmacSha1::new_from_slice(self.auth_secret.as_bytes())
            .map_err(|e| UploadError::RequestBuild(format!("invalid HMAC key: {}", e)))?;
        mac.update(message);

        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

// Implement Debug manually to avoid exposing the secret
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_key", &self.auth_key)
            .field("auth_secret", &"<redacted>")
            .finish()
    }
}
