use crate::credentials::Credentials;
use crate::error::Result;
use crate::time::Expires;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level policy keys owned by the request itself
pub const RESERVED_KEYS: [&str; 2] = ["auth", "template_id"];

/// Authentication block of a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyAuth {
    /// Account auth key
    pub key: String,
    /// Time after which the signature is rejected
    pub expires: Expires,
}

/// The JSON document sent as the `params` form field and signed with the
/// auth secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPolicy {
    pub auth: PolicyAuth,

    /// Processing template to run on the upload
    pub template_id: String,

    /// Additional instructions (steps, fields, notify_url, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A serialized policy together with its signature. `params` holds the
/// exact bytes that were signed.
#[derive(Debug, Clone)]
pub struct SignedPolicy {
    pub params: String,
    pub signature: String,
}

impl UploadPolicy {
    /// Build a policy expiring `ttl` from now. Fails with `RequestBuild`
    /// if `ttl` is shorter than one second.
    pub fn new(auth_key: &str, template_id: &str, ttl: Duration) -> Result<Self> {
        Ok(UploadPolicy {
            auth: PolicyAuth {
                key: auth_key.to_string(),
                expires: Expires::from_now(ttl)?,
            },
            template_id: template_id.to_string(),
            extra: Map::new(),
        })
    }

    /// Merge additional top-level keys. Reserved keys are ignored.
    pub fn with_extra(mut self, extra: &Map<String, Value>) -> Self {
        for (key, value) in extra {
            if !RESERVED_KEYS.contains(&key.as_str()) {
                self.extra.insert(key.clone(), value.clone());
            }
        }
        self
    }

    /// Serialize once and sign the resulting bytes
    pub fn sign(&self, credentials: &Credentials) -> Result<SignedPolicy> {
        let params = serde_json::to_string(self)?;
        let signature = credentials.sign(params.as_bytes())?;

        Ok(SignedPolicy { params, signature })
    }
}
