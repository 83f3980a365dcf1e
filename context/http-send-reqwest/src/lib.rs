//! Reqwest-based HTTP sending implementation for abfs.
//!
//! `ReqwestHttpSend` implements the `HttpSend` trait from `abfs_core` on top
//! of a `reqwest::Client`. Request timeouts and proxies are configured on the
//! client; an elapsed timeout is reported as `ErrorKind::Timeout`.
//!
//! ## Example
//!
//! ```no_run
//! use abfs_core::Context;
//! use abfs_http_send_reqwest::ReqwestHttpSend;
//! use std::time::Duration;
//!
//! let client = reqwest::Client::builder()
//!     .timeout(Duration::from_secs(120))
//!     .build()
//!     .unwrap();
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::new(client));
//! ```

use abfs_core::{Error, HttpSend, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::{Client, Request};

#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        let target = format!("{} {}", req.method(), req.url());

        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| classify(e, &target))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| classify(e, &target))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

fn classify(err: reqwest::Error, target: &str) -> Error {
    if err.is_timeout() {
        Error::timeout(format!("{target} request timed out")).with_source(err)
    } else {
        Error::unexpected(format!("{target} request failed")).with_source(err)
    }
}
