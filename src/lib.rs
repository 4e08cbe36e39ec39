//! # transloadit - signed multipart uploads for Rust
//!
//! A small client for sending files to the Transloadit media processing
//! API. Each upload carries a JSON policy (`params`) signed with
//! HMAC-SHA1 using the account secret, next to the file itself.
//!
//! ## Features
//!
//! - Policy building with a configurable expiry
//! - HMAC-SHA1 request signing
//! - File and in-memory uploads as `multipart/form-data`
//! - Success/failure handlers and an optional progress observer
//! - Pluggable transport for tests or custom HTTP stacks
//!
//! ## Basic Usage
//!
//! ```no_run
//! use transloadit::{ResultHandlers, SignedUploadRequest};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = SignedUploadRequest::new("auth-key", "auth-secret")?
//!         .with_progress(|p| println!("{:.0}%", p * 100.0));
//!
//!     let handle = request.upload_file(
//!         "photo.jpg",
//!         "photo.jpg",
//!         "image/jpeg",
//!         "my-template-id",
//!         ResultHandlers::new(
//!             |response| println!("assembly: {:?}", response.assembly_id()),
//!             |error, body| eprintln!("upload failed: {} {:?}", error, body),
//!         ),
//!     );
//!
//!     handle.join()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Blocking Usage
//!
//! ```no_run
//! use transloadit::{SignedUploadRequest, UploadPayload};
//!
//! let request = SignedUploadRequest::new("auth-key", "auth-secret")?;
//! let response = request.send(
//!     UploadPayload::data(b"hello".to_vec(), "hello.txt", "text/plain"),
//!     "my-template-id",
//! )?;
//! println!("{}", response.raw());
//! # Ok::<(), transloadit::UploadError>(())
//! ```

pub mod client;
pub mod credentials;
pub mod error;
pub mod payload;
pub mod policy;
pub mod request;
pub mod response;
pub mod time;
pub mod transport;
pub mod upload;

// Re-export main types for convenience
pub use client::Config;
pub use credentials::Credentials;
pub use error::{Result, UploadError};
pub use payload::{PayloadSource, UploadPayload};
pub use policy::{PolicyAuth, SignedPolicy, UploadPolicy};
pub use request::SignedUploadRequest;
pub use response::AssemblyResponse;
pub use time::Expires;
pub use transport::{HttpReply, HttpTransport, MultipartPart, MultipartRequest, Transport};
pub use upload::{ProgressTracker, ResultHandlers, UploadHandle, UploadProgressFn};

// Re-export serde_json for convenience
pub use serde_json::json;
