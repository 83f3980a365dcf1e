// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Stateless Data Lake Storage Gen2 REST calls.
//!
//! Every operation is exactly one HTTP exchange. Responses the upload state
//! machine reacts to (409, 404) come back as outcome variants; everything else
//! that is not a success is an [`Error`], with timeouts reported as
//! [`abfs_core::ErrorKind::Timeout`].

use abfs_core::{Error, Result, Signer};
use bytes::Bytes;
use http::{header, Method, StatusCode};
use log::{debug, info};
use percent_encoding::utf8_percent_encode;

use crate::constants::*;
use crate::Credential;

/// Result of [`StorageGateway::container_exists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    /// The container is there.
    Exists,
    /// The service answered 404.
    NotFound,
}

/// Result of [`StorageGateway::create_blob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateBlobOutcome {
    /// A fresh, empty blob was created.
    Created,
    /// The service answered 409; the blob is left as it was.
    AlreadyExists,
}

/// Result of [`StorageGateway::append_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The block landed at the requested position.
    Appended,
    /// The service answered 409: the position is stale or the blob cannot grow.
    Conflict,
    /// The service answered 404: the blob is gone.
    NotFound,
}

/// StorageGateway issues signed requests against one container.
#[derive(Debug, Clone)]
pub struct StorageGateway {
    signer: Signer<Credential>,
    account_host: String,
    container: String,
}

impl StorageGateway {
    /// Create a gateway for `https://<account_host>/<container>`.
    pub fn new(
        signer: Signer<Credential>,
        account_host: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            account_host: account_host.into(),
            container: container.into(),
        }
    }

    /// The container every call targets.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Check whether the container exists.
    pub async fn container_exists(&self) -> Result<ContainerStatus> {
        let resp = self
            .send(Method::HEAD, "", &[("resource", "filesystem")], Bytes::new(), None)
            .await?;

        match resp.status() {
            s if s.is_success() => {
                info!("container '{}' exists", self.container);
                Ok(ContainerStatus::Exists)
            }
            StatusCode::NOT_FOUND => Ok(ContainerStatus::NotFound),
            _ => Err(unexpected_response(
                &format!("get container '{}'", self.container),
                &resp,
            )),
        }
    }

    /// Create the container.
    pub async fn create_container(&self) -> Result<()> {
        let resp = self
            .send(Method::PUT, "", &[("resource", "filesystem")], Bytes::new(), None)
            .await?;

        if resp.status().is_success() {
            info!("container '{}' created", self.container);
            Ok(())
        } else {
            Err(unexpected_response(
                &format!("create container '{}'", self.container),
                &resp,
            ))
        }
    }

    /// Create an empty blob at `path`.
    pub async fn create_blob(&self, path: &str) -> Result<CreateBlobOutcome> {
        let resp = self
            .send(
                Method::PUT,
                path,
                &[("resource", "file"), ("recursive", "false")],
                Bytes::new(),
                Some(CREATE_BLOB_CONTENT_TYPE),
            )
            .await?;

        match resp.status() {
            s if s.is_success() => {
                debug!("blob '{path}' created");
                Ok(CreateBlobOutcome::Created)
            }
            StatusCode::CONFLICT => {
                debug!("blob '{path}' already exists");
                Ok(CreateBlobOutcome::AlreadyExists)
            }
            _ => Err(unexpected_response(&format!("create blob '{path}'"), &resp)),
        }
    }

    /// Append `content` to the blob at `path`, starting at `position`.
    ///
    /// Appended data stays invisible to readers until [`StorageGateway::flush`].
    pub async fn append_block(
        &self,
        path: &str,
        content: Bytes,
        position: u64,
    ) -> Result<AppendOutcome> {
        let len = content.len();
        let position = position.to_string();
        let resp = self
            .send(
                Method::PATCH,
                path,
                &[("action", "append"), ("position", &position)],
                content,
                None,
            )
            .await?;

        match resp.status() {
            s if s.is_success() => {
                debug!("appended {len} bytes to '{path}' at position {position}");
                Ok(AppendOutcome::Appended)
            }
            StatusCode::CONFLICT => Ok(AppendOutcome::Conflict),
            StatusCode::NOT_FOUND => Ok(AppendOutcome::NotFound),
            _ => Err(unexpected_response(
                &format!("append to blob '{path}' at position {position}"),
                &resp,
            )),
        }
    }

    /// Commit everything appended to `path` up to `position`.
    pub async fn flush(&self, path: &str, position: u64) -> Result<()> {
        let position = position.to_string();
        let resp = self
            .send(
                Method::PATCH,
                path,
                &[("action", "flush"), ("position", &position)],
                Bytes::new(),
                None,
            )
            .await?;

        if resp.status().is_success() {
            debug!("flushed '{path}' at position {position}");
            Ok(())
        } else {
            Err(unexpected_response(
                &format!("flush blob '{path}' at position {position}"),
                &resp,
            ))
        }
    }

    /// Committed length of the blob at `path`, `0` when it does not exist.
    pub async fn get_blob_size(&self, path: &str) -> Result<u64> {
        let resp = self
            .send(Method::HEAD, path, &[], Bytes::new(), None)
            .await?;

        match resp.status() {
            s if s.is_success() => {
                let value = resp
                    .headers()
                    .get(header::CONTENT_LENGTH)
                    .ok_or_else(|| {
                        Error::unexpected(format!(
                            "get blob '{path}' response has no content-length"
                        ))
                    })?
                    .to_str()?;
                value.trim().parse::<u64>().map_err(|e| {
                    Error::unexpected(format!(
                        "get blob '{path}' response has invalid content-length '{value}'"
                    ))
                    .with_source(e)
                })
            }
            StatusCode::NOT_FOUND => Ok(0),
            _ => Err(unexpected_response(&format!("get blob '{path}'"), &resp)),
        }
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> String {
        let mut url = format!(
            "https://{}/{}{}",
            self.account_host,
            utf8_percent_encode(&self.container, &AZURE_PATH_ENCODE_SET),
            utf8_percent_encode(path, &AZURE_PATH_ENCODE_SET),
        );
        if !query.is_empty() {
            url.push('?');
            url.push_str(
                &form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(query)
                    .finish(),
            );
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<http::Response<Bytes>> {
        let mut builder = http::Request::builder()
            .method(method)
            .uri(self.url(path, query))
            .header(header::CONTENT_LENGTH, body.len());
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        let (mut parts, body) = builder.body(body)?.into_parts();
        self.signer.sign(&mut parts).await?;
        self.signer
            .context()
            .http_send(http::Request::from_parts(parts, body))
            .await
    }
}

fn unexpected_response(action: &str, resp: &http::Response<Bytes>) -> Error {
    Error::unexpected(format!(
        "{action} failed. {}: {}",
        resp.status().as_u16(),
        String::from_utf8_lossy(resp.body())
    ))
}
