use crate::client::Config;
use crate::credentials::Credentials;
use crate::error::{Result, UploadError};
use crate::payload::UploadPayload;
use crate::policy::UploadPolicy;
use crate::response::AssemblyResponse;
use crate::transport::{HttpReply, HttpTransport, MultipartPart, MultipartRequest, Transport};
use crate::upload::{ProgressTracker, ResultHandlers, UploadHandle, UploadProgressFn};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

/// Form field names set by the request itself
const RESERVED_FIELDS: [&str; 3] = ["params", "signature", "file"];

/// Builds, signs and sends multipart uploads to the assembly endpoint.
///
/// An instance can be reused: every upload builds and signs a fresh policy.
#[derive(Clone)]
pub struct SignedUploadRequest {
    credentials: Credentials,
    /// Configuration
    pub config: Config,
    transport: Option<Arc<dyn Transport>>,
    default_transport: Arc<OnceLock<Arc<dyn Transport>>>,
    progress: Option<UploadProgressFn>,
    params: Map<String, Value>,
    fields: Vec<(String, String)>,
}

impl SignedUploadRequest {
    /// Create a new request with default configuration
    ///
    /// # Arguments
    /// * `key` - Account auth key
    /// * `secret` - Account auth secret
    ///
    /// Fails with `InvalidCredentials` if either is empty.
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        Ok(SignedUploadRequest {
            credentials: Credentials::new(key, secret)?,
            config: Config::default(),
            transport: None,
            default_transport: Arc::new(OnceLock::new()),
            progress: None,
            params: Map::new(),
            fields: Vec::new(),
        })
    }

    /// Set the configuration
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self.default_transport = Arc::new(OnceLock::new());
        self
    }

    /// Use a custom transport instead of the reqwest client
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Register a progress observer for every upload made with this request
    pub fn with_progress<F>(mut self, observer: F) -> Self
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(observer));
        self
    }

    /// Add a top-level policy key such as `steps` or `notify_url`.
    /// `auth` and `template_id` cannot be overridden.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Add an extra form field sent next to the signed params
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if !RESERVED_FIELDS.contains(&name.as_str()) {
            self.fields.push((name, value.into()));
        }
        self
    }

    /// Get the credentials
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Upload the file at `path` on a background thread. An unreadable file
    /// is reported to the failure handler as `FileNotFound` without any
    /// network I/O.
    pub fn upload_file(
        &self,
        path: impl Into<PathBuf>,
        filename: &str,
        mime_type: &str,
        template_id: &str,
        handlers: ResultHandlers,
    ) -> UploadHandle {
        self.spawn(UploadPayload::file(path, filename, mime_type), template_id, handlers)
    }

    /// Upload an in-memory buffer on a background thread
    pub fn upload_data(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
        template_id: &str,
        handlers: ResultHandlers,
    ) -> UploadHandle {
        self.spawn(UploadPayload::data(bytes, filename, mime_type), template_id, handlers)
    }

    fn spawn(
        &self,
        payload: UploadPayload,
        template_id: &str,
        handlers: ResultHandlers,
    ) -> UploadHandle {
        let request = self.clone();
        let template_id = template_id.to_string();

        UploadHandle::new(std::thread::spawn(move || {
            handlers.dispatch(request.send(payload, &template_id));
        }))
    }

    /// Build the signed multipart request for a payload
    ///
    /// # Arguments
    /// * `data` - Payload bytes
    /// * `filename` - Filename declared in the file part
    /// * `mime_type` - Content type of the file part
    /// * `template_id` - Template to run, passed through as is
    pub fn prepare(
        &self,
        data: Vec<u8>,
        filename: &str,
        mime_type: &str,
        template_id: &str,
    ) -> Result<MultipartRequest> {
        let url = self.config.endpoint()?;

        let policy = UploadPolicy::new(
            &self.credentials.auth_key,
            template_id,
            self.config.expires_in,
        )?
        .with_extra(&self.params);
        let signed = policy.sign(&self.credentials)?;

        debug!(
            template_id,
            expires = %policy.auth.expires.format(),
            filename,
            size = data.len(),
            "prepared upload policy"
        );

        let mut parts = Vec::with_capacity(self.fields.len() + 3);
        parts.push(MultipartPart::Text {
            name: "params".to_string(),
            value: signed.params,
        });
        parts.push(MultipartPart::Text {
            name: "signature".to_string(),
            value: signed.signature,
        });
        for (name, value) in &self.fields {
            parts.push(MultipartPart::Text {
                name: name.clone(),
                value: value.clone(),
            });
        }
        parts.push(MultipartPart::File {
            name: "file".to_string(),
            filename: filename.to_string(),
            content_type: mime_type.to_string(),
            data,
        });

        Ok(MultipartRequest { url, parts })
    }

    /// Send one upload and wait for the reply. This is the blocking core of
    /// `upload_file` and `upload_data`.
    pub fn send(&self, payload: UploadPayload, template_id: &str) -> Result<AssemblyResponse> {
        let filename = payload.filename.clone();
        let mime_type = payload.mime_type.clone();
        let data = payload.into_bytes()?;

        let request = self.prepare(data, &filename, &mime_type, template_id)?;
        let url = request.url.clone();
        let transport = self.transport()?;
        let tracker = Arc::new(ProgressTracker::new(self.progress.clone()));

        let start = std::time::Instant::now();
        let reply = transport
            .send_multipart(request, tracker.transfer_fn())
            .map_err(|e| {
                error!(%url, error = %e, "upload request failed");
                e
            })?;

        if self.config.debug {
            info!(
                "[upload] POST {} => {:?} (status: {})",
                url,
                start.elapsed(),
                reply.status
            );
        }

        let response = self.interpret(reply)?;
        tracker.finish();

        let assembly_id = response.assembly_id().unwrap_or_default();
        info!(status = response.status, %assembly_id, "upload completed");
        Ok(response)
    }

    /// Map an HTTP reply to a response or an error
    fn interpret(&self, reply: HttpReply) -> Result<AssemblyResponse> {
        let HttpReply { status, body } = reply;

        if !(200..300).contains(&status) {
            let parsed = serde_json::from_slice::<Value>(&body).ok();
            warn!(status, body = %String::from_utf8_lossy(&body), "upload rejected");
            return Err(UploadError::http(status, parsed));
        }

        let value: Value =
            serde_json::from_slice(&body).map_err(|source| UploadError::MalformedResponse {
                status,
                body: String::from_utf8_lossy(&body).to_string(),
                source,
            })?;

        Ok(AssemblyResponse::new(status, value))
    }

    /// Injected transport, or the reqwest transport built once per
    /// configuration and shared by clones of this request
    fn transport(&self) -> Result<Arc<dyn Transport>> {
        if let Some(ref transport) = self.transport {
            return Ok(Arc::clone(transport));
        }
        if let Some(transport) = self.default_transport.get() {
            return Ok(Arc::clone(transport));
        }

        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&self.config)?);
        Ok(Arc::clone(self.default_transport.get_or_init(|| transport)))
    }
}

impl std::fmt::Debug for SignedUploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedUploadRequest")
            .field("credentials", &self.credentials)
            .field("config", &self.config)
            .field("params", &self.params)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyAuth;
    use crate::time::Expires;
    use crate::transport::MockTransport;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::sync::Mutex;

    fn reply(status: u16, body: &str) -> HttpReply {
        HttpReply {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_new_rejects_empty_credentials() {
        assert!(matches!(
            SignedUploadRequest::new("", "secret"),
            Err(UploadError::InvalidCredentials)
        ));
        assert!(matches!(
            SignedUploadRequest::new("key", ""),
            Err(UploadError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_prepare_signs_params() {
        let request = SignedUploadRequest::new("key", "secret").unwrap();
        let prepared = request
            .prepare(b"data".to_vec(), "a.txt", "text/plain", "tpl")
            .unwrap();

        let params = prepared.text("params").unwrap();
        let signature = prepared.text("signature").unwrap();
        assert_eq!(signature, request.credentials().sign(params.as_bytes()).unwrap());
        assert_eq!(prepared.url.as_str(), "https://api2.transloadit.com/assemblies");
    }

    #[test]
    fn test_prepare_part_order_and_fields() {
        let request = SignedUploadRequest::new("key", "secret")
            .unwrap()
            .with_field("caption", "hello")
            .with_field("signature", "forged")
            .with_param("notify_url", json!("https://example.com/hook"));
        let prepared = request
            .prepare(vec![1, 2], "x.bin", "application/octet-stream", "")
            .unwrap();

        let names: Vec<&str> = prepared
            .parts
            .iter()
            .map(|part| match part {
                MultipartPart::Text { name, .. } => name.as_str(),
                MultipartPart::File { name, .. } => name.as_str(),
            })
            .collect();
        assert_eq!(names, vec!["params", "signature", "caption", "file"]);

        let policy: Value = serde_json::from_str(prepared.text("params").unwrap()).unwrap();
        assert_eq!(policy["template_id"], "");
        assert_eq!(policy["notify_url"], "https://example.com/hook");
        assert_eq!(
            prepared.file(),
            Some(&MultipartPart::File {
                name: "file".to_string(),
                filename: "x.bin".to_string(),
                content_type: "application/octet-stream".to_string(),
                data: vec![1, 2],
            })
        );
    }

    #[test]
    fn test_expires_within_ttl() {
        let request = SignedUploadRequest::new("key", "secret").unwrap();
        let before = Utc::now();
        let prepared = request.prepare(Vec::new(), "a", "text/plain", "t").unwrap();

        let policy: Value = serde_json::from_str(prepared.text("params").unwrap()).unwrap();
        let auth: PolicyAuth = serde_json::from_value(policy["auth"].clone()).unwrap();
        assert_eq!(auth.key, "key");
        assert!(*auth.expires > Utc::now());
        assert!(*auth.expires <= before + Duration::seconds(300) + Duration::seconds(2));
        assert!(auth.expires > Expires::new(before + Duration::seconds(298)));
    }

    #[test]
    fn test_short_ttl_fails_before_transport() {
        let mut transport = MockTransport::new();
        transport.expect_send_multipart().times(0);

        for ttl in [
            Duration::milliseconds(500),
            Duration::zero(),
            Duration::seconds(-60),
        ] {
            let request = SignedUploadRequest::new("key", "secret")
                .unwrap()
                .with_config(Config::default().with_expires_in(ttl));
            assert!(matches!(
                request.prepare(Vec::new(), "a", "text/plain", "t"),
                Err(UploadError::RequestBuild(_))
            ));
        }

        let request = SignedUploadRequest::new("key", "secret")
            .unwrap()
            .with_config(Config::default().with_expires_in(Duration::MAX))
            .with_transport(Arc::new(transport));
        let error = request
            .send(UploadPayload::data(Vec::new(), "a", "text/plain"), "t")
            .unwrap_err();
        assert!(matches!(error, UploadError::RequestBuild(_)));
    }

    #[test]
    fn test_one_second_ttl_expires_in_future() {
        let request = SignedUploadRequest::new("key", "secret")
            .unwrap()
            .with_config(Config::default().with_expires_in(Duration::seconds(1)));
        let prepared = request.prepare(Vec::new(), "a", "text/plain", "t").unwrap();

        let policy: Value = serde_json::from_str(prepared.text("params").unwrap()).unwrap();
        let auth: PolicyAuth = serde_json::from_value(policy["auth"].clone()).unwrap();
        assert!(*auth.expires > Utc::now());
    }

    #[test]
    fn test_default_transport_built_once() {
        let request = SignedUploadRequest::new("key", "secret").unwrap();
        let first = request.transport().unwrap();
        let second = request.clone().transport().unwrap();
        assert!(std::ptr::addr_eq(Arc::as_ptr(&first), Arc::as_ptr(&second)));

        let reconfigured = request.with_config(Config::default().with_debug(true));
        let third = reconfigured.transport().unwrap();
        assert!(!std::ptr::addr_eq(Arc::as_ptr(&first), Arc::as_ptr(&third)));
    }

    #[test]
    fn test_send_success() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_multipart()
            .times(1)
            .returning(|_, _| Ok(reply(200, r#"{"ok":true}"#)));

        let request = SignedUploadRequest::new("key", "secret")
            .unwrap()
            .with_transport(Arc::new(transport));
        let response = request
            .send(UploadPayload::data(b"x".to_vec(), "x", "text/plain"), "tpl")
            .unwrap();

        assert_eq!(response.body, json!({"ok": true}));
    }

    #[test]
    fn test_send_http_error_keeps_body() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_multipart()
            .times(1)
            .returning(|_, _| Ok(reply(400, r#"{"error":"INVALID_TEMPLATE"}"#)));

        let request = SignedUploadRequest::new("key", "secret")
            .unwrap()
            .with_transport(Arc::new(transport));
        let error = request
            .send(UploadPayload::data(Vec::new(), "x", "text/plain"), "bad")
            .unwrap_err();

        match error {
            UploadError::HttpStatus { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, Some(json!({"error": "INVALID_TEMPLATE"})));
            }
            other => panic!("expected HttpStatus, got {:?}", other),
        }
    }

    #[test]
    fn test_send_http_error_without_json() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_multipart()
            .returning(|_, _| Ok(reply(502, "<html>Bad Gateway</html>")));

        let request = SignedUploadRequest::new("key", "secret")
            .unwrap()
            .with_transport(Arc::new(transport));
        let error = request
            .send(UploadPayload::data(Vec::new(), "x", "text/plain"), "tpl")
            .unwrap_err();

        assert_eq!(error.status_code(), Some(502));
        assert!(error.body().is_none());
    }

    #[test]
    fn test_send_malformed_success_body() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_multipart()
            .returning(|_, _| Ok(reply(200, "not json")));

        let request = SignedUploadRequest::new("key", "secret")
            .unwrap()
            .with_transport(Arc::new(transport));
        let error = request
            .send(UploadPayload::data(Vec::new(), "x", "text/plain"), "tpl")
            .unwrap_err();

        assert!(matches!(
            error,
            UploadError::MalformedResponse { status: 200, ref body, .. } if body == "not json"
        ));
    }

    #[test]
    fn test_send_transport_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_multipart()
            .returning(|_, _| Err(UploadError::Transport("connection refused".to_string())));

        let request = SignedUploadRequest::new("key", "secret")
            .unwrap()
            .with_transport(Arc::new(transport));
        let error = request
            .send(UploadPayload::data(Vec::new(), "x", "text/plain"), "tpl")
            .unwrap_err();

        assert!(matches!(error, UploadError::Transport(_)));
    }

    #[test]
    fn test_missing_file_never_reaches_transport() {
        let mut transport = MockTransport::new();
        transport.expect_send_multipart().times(0);

        let request = SignedUploadRequest::new("key", "secret")
            .unwrap()
            .with_transport(Arc::new(transport));
        let error = request
            .send(UploadPayload::file("/no/such/file.png", "file.png", "image/png"), "tpl")
            .unwrap_err();

        assert!(matches!(error, UploadError::FileNotFound { .. }));
    }

    #[test]
    fn test_progress_forwarded_and_completed() {
        let mut transport = MockTransport::new();
        transport.expect_send_multipart().returning(|request, progress| {
            let total = match request.file() {
                Some(MultipartPart::File { data, .. }) => data.len() as u64,
                _ => 0,
            };
            progress(total / 2, total);
            Ok(reply(200, "{}"))
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let request = SignedUploadRequest::new("key", "secret")
            .unwrap()
            .with_transport(Arc::new(transport))
            .with_progress(move |p| seen_clone.lock().unwrap().push(p));

        request
            .send(UploadPayload::data(vec![0; 8], "x", "text/plain"), "tpl")
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0.5, 1.0]);
    }

    #[test]
    fn test_reuse_signs_each_upload() {
        let params = Arc::new(Mutex::new(Vec::new()));
        let params_clone = Arc::clone(&params);
        let mut transport = MockTransport::new();
        transport
            .expect_send_multipart()
            .times(2)
            .returning(move |request, _| {
                params_clone
                    .lock()
                    .unwrap()
                    .push(request.text("params").unwrap().to_string());
                Ok(reply(200, "{}"))
            });

        let request = SignedUploadRequest::new("key", "secret")
            .unwrap()
            .with_transport(Arc::new(transport));
        request
            .send(UploadPayload::data(Vec::new(), "a", "text/plain"), "first")
            .unwrap();
        request
            .send(UploadPayload::data(Vec::new(), "b", "text/plain"), "second")
            .unwrap();

        let params = params.lock().unwrap();
        assert!(params[0].contains(r#""template_id":"first""#));
        assert!(params[1].contains(r#""template_id":"second""#));
    }
}
