//! # Toolbridge Transport
//!
//! Request/response plumbing between the SDK and the platform.
//!
//! [`Transport`] is the raw seam: it POSTs a wire-form JSON body to an
//! endpoint path and returns the wire-form JSON response. [`send`] layers the
//! typed boundary on top of any transport:
//!
//! 1. serialize the request (camelCase keys)
//! 2. rewrite keys to snake_case ([`casing::to_wire`])
//! 3. POST through the transport
//! 4. rewrite response keys to camelCase, dropping nulls ([`casing::from_wire`])
//! 5. decode into the expected response type, or fail with
//!    [`TransportError::Decode`]
//!
//! Key casing never leaks past this crate.
//!
//! ## Example
//!
//! ```no_run
//! use toolbridge_transport::{HttpTransport, send};
//! use serde_json::{Value, json};
//!
//! # async fn example() -> Result<(), toolbridge_transport::TransportError> {
//! let transport = HttpTransport::new("http://localhost:8082", "api-key", None)?;
//! let status: Value = send(
//!     &transport,
//!     "/authmod/v1/request/status",
//!     &json!({"connectionUid": "c", "requestUid": "r", "requestSecret": "s"}),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod casing;
pub mod error;
pub mod http;

pub use error::TransportError;
pub use http::HttpTransport;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Raw request/response seam to the platform
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a wire-form body to `path` and return the wire-form response
    ///
    /// # Errors
    ///
    /// Returns `TransportError` for network failures, non-success statuses or
    /// non-JSON responses
    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError>;
}

/// Send a typed request and decode the typed response
///
/// # Errors
///
/// Returns `TransportError::Encode` if the request cannot be serialized,
/// `TransportError::Decode` if the response does not match `Resp`, and any
/// error the transport itself reports
pub async fn send<Req, Resp>(
    transport: &(impl Transport + ?Sized),
    path: &str,
    request: &Req,
) -> Result<Resp, TransportError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let body = serde_json::to_value(request).map_err(|e| TransportError::Encode(e.to_string()))?;
    let response = transport.post(path, casing::to_wire(body)).await?;
    serde_json::from_value(casing::from_wire(response))
        .map_err(|e| TransportError::Decode(e.to_string()))
}
