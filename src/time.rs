use crate::error::{Result, UploadError};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::ops::Deref;

/// Wire format of policy expiry timestamps
pub const EXPIRES_FORMAT: &str = "%Y/%m/%d %H:%M:%S+00:00";

/// Policy expiry time. Wraps chrono::DateTime and serializes to the
/// `YYYY/MM/DD HH:mm:ss+00:00` string the API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Expires(pub DateTime<Utc>);

impl Expires {
    /// Create a new Expires from a DateTime
    pub fn new(dt: DateTime<Utc>) -> Self {
        Expires(dt)
    }

    /// Expiry `ttl` from now, truncated to whole seconds.
    ///
    /// `ttl` must be at least one second so the truncated expiry stays in
    /// the future.
    pub fn from_now(ttl: Duration) -> Result<Self> {
        if ttl < Duration::seconds(1) {
            return Err(UploadError::RequestBuild(format!(
                "policy lifetime must be at least 1s, got {}",
                ttl
            )));
        }

        let dt = Utc::now().checked_add_signed(ttl).ok_or_else(|| {
            UploadError::RequestBuild(format!("policy lifetime out of range: {}", ttl))
        })?;
        Ok(Expires(dt.with_nanosecond(0).unwrap_or(dt)))
    }

    /// Parse a wire-formatted timestamp
    pub fn parse(s: &str) -> Option<Self> {
        let naive = NaiveDateTime::parse_from_str(s, EXPIRES_FORMAT).ok()?;
        Some(Expires(Utc.from_utc_datetime(&naive)))
    }

    /// Get the wire-formatted string
    pub fn format(&self) -> String {
        self.0.format(EXPIRES_FORMAT).to_string()
    }
}

impl Deref for Expires {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DateTime<Utc>> for Expires {
    fn from(dt: DateTime<Utc>) -> Self {
        Expires(dt)
    }
}

impl Serialize for Expires {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format())
    }
}

impl<'de> Deserialize<'de> for Expires {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Expires::parse(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid expires timestamp: {}", s)))
    }
}
