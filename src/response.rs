use serde::de::DeserializeOwned;
use serde_json::Value;

/// AssemblyResponse is the parsed JSON body of a successful upload.
/// The body is passed through untouched; accessors cover the fields the
/// service commonly returns.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyResponse {
    /// HTTP status of the reply
    pub status: u16,
    /// Parsed body
    pub body: Value,
}

impl AssemblyResponse {
    pub fn new(status: u16, body: Value) -> Self {
        AssemblyResponse { status, body }
    }

    /// Get the raw body
    pub fn raw(&self) -> &Value {
        &self.body
    }

    /// Consume the response and return the body
    pub fn into_value(self) -> Value {
        self.body
    }

    /// Unmarshal the body into the provided type
    pub fn apply<T>(&self) -> Result<T, crate::error::UploadError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(self.body.clone()).map_err(|e| e.into())
    }

    /// Get a value from the body by a slash-separated path.
    /// For example, "results/thumb/0/ssl_url" walks objects and arrays.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.body;

        for part in path.split('/').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(arr) => {
                    let index: usize = part.parse().ok()?;
                    arr.get(index)?
                }
                _ => return None,
            };
        }

        Some(current)
    }

    /// Get a string value from the body by a slash-separated path
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    /// Assembly state, e.g. "ASSEMBLY_UPLOADING" or "ASSEMBLY_COMPLETED"
    pub fn ok(&self) -> Option<String> {
        self.get_string("ok")
    }

    /// Error code reported inside a 2xx body
    pub fn error(&self) -> Option<String> {
        self.get_string("error")
    }

    pub fn message(&self) -> Option<String> {
        self.get_string("message")
    }

    pub fn assembly_id(&self) -> Option<String> {
        self.get_string("assembly_id")
    }

    /// HTTPS status URL of the assembly
    pub fn assembly_ssl_url(&self) -> Option<String> {
        self.get_string("assembly_ssl_url")
    }
}
