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

use std::sync::Arc;

use abfs_core::{Error, Result};
use bytes::Bytes;
use log::{debug, info, warn};

use crate::constants::BLOCK_SIZE_LIMIT;
use crate::gateway::{AppendOutcome, CreateBlobOutcome, StorageGateway};
use crate::path::{ChunkMetadata, ResolvePath};

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Path of the blob the last block landed in.
    pub path: String,
    /// Rotation index `path` was resolved with.
    pub index: u32,
    /// Committed length of `path` after the final flush.
    pub position: u64,
}

/// AppendUploader appends one content buffer to a blob in bounded blocks.
///
/// A 409 on append means the blob can't take more blocks: the uploader seals
/// it, moves to the next rotation index and resends the block to a fresh blob.
/// This repeats for as long as the next index keeps answering 409. A 404 means
/// the blob is gone: it is created again and the block is resent once.
#[derive(Debug, Clone)]
pub struct AppendUploader {
    gateway: StorageGateway,
    resolver: Arc<dyn ResolvePath>,
    block_size: usize,
    write_only: bool,
}

impl AppendUploader {
    /// Create an uploader with the service block limit.
    pub fn new(gateway: StorageGateway, resolver: Arc<dyn ResolvePath>) -> Self {
        Self {
            gateway,
            resolver,
            block_size: BLOCK_SIZE_LIMIT,
            write_only: false,
        }
    }

    /// Set the largest block sent in one append call.
    ///
    /// Values above the service limit are clamped to it.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.clamp(1, BLOCK_SIZE_LIMIT);
        self
    }

    /// Replace the path resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn ResolvePath>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Assume every target is blank: create it and append from 0 without sizing.
    pub fn with_write_only(mut self, write_only: bool) -> Self {
        self.write_only = write_only;
        self
    }

    /// The gateway this uploader drives.
    pub fn gateway(&self) -> &StorageGateway {
        &self.gateway
    }

    /// Append `content` to the blob resolved from `metadata` at rotation `index`.
    pub async fn upload(
        &self,
        content: &Bytes,
        metadata: &ChunkMetadata,
        index: u32,
    ) -> Result<UploadReport> {
        let mut index = index;
        let mut path = self.resolver.resolve(metadata, index);
        debug!("uploading {} bytes to '{path}'", content.len());

        let mut position = if self.write_only {
            self.gateway.create_blob(&path).await?;
            0
        } else {
            let size = self.gateway.get_blob_size(&path).await?;
            if size == 0 {
                self.gateway.create_blob(&path).await?;
            }
            size
        };

        let mut offset = 0;
        let mut recreated = false;

        while offset < content.len() {
            let end = (offset + self.block_size).min(content.len());
            let block = content.slice(offset..end);

            match self.gateway.append_block(&path, block, position).await? {
                AppendOutcome::Appended => {
                    position += (end - offset) as u64;
                    offset = end;
                    recreated = false;
                }
                AppendOutcome::Conflict => {
                    let next_index = index.checked_add(1).ok_or_else(|| {
                        Error::config_invalid(format!("rotation index for '{path}' is exhausted"))
                    })?;
                    let next = self.resolver.resolve(metadata, next_index);
                    if next == path {
                        warn!("blocks limit reached for '{path}', you need to use %{{index}} in the format");
                        return Err(Error::config_invalid(format!(
                            "blob '{path}' is full and the path template can't rotate without %{{index}}"
                        )));
                    }

                    self.gateway.flush(&path, position).await?;
                    info!("blocks limit reached for '{path}', creating new blob '{next}'");
                    self.gateway.create_blob(&next).await?;

                    index = next_index;
                    path = next;
                    position = 0;
                    recreated = false;
                }
                AppendOutcome::NotFound => {
                    if recreated {
                        return Err(Error::unexpected(format!(
                            "blob '{path}' is still missing after creating it"
                        )));
                    }

                    debug!("blob '{path}' doesn't exist, creating new blob");
                    if self.gateway.create_blob(&path).await? == CreateBlobOutcome::Created {
                        position = 0;
                    }
                    recreated = true;
                }
            }
        }

        self.gateway.flush(&path, position).await?;
        debug!("upload to '{path}' complete at position {position}");
        Ok(UploadReport {
            path,
            index,
            position,
        })
    }
}
