use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use abfs_command_execute_tokio::TokioCommandExecute;
use abfs_core::{Context, ErrorKind, OsEnv, Result, Signer};
use abfs_http_send_reqwest::ReqwestHttpSend;
use bytes::Bytes;
use log::{debug, info, warn};

use crate::gateway::{ContainerStatus, StorageGateway};
use crate::path::{ChunkMetadata, ObjectKeyFormat, ResolvePath};
use crate::provide_credential::DefaultCredentialProvider;
use crate::refresh::{RefreshHandle, TokenRefresher};
use crate::upload::AppendUploader;
use crate::{Config, Credential, RequestSigner};

/// One unit of delivery from the host pipeline.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    /// Bytes to append.
    pub content: Bytes,
    /// Metadata the blob path is resolved from.
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Default)]
struct SinkState {
    last_path: Option<String>,
    current_index: u32,
}

/// AppendSink is the host facing entry point: `start`, then `upload` per chunk, then `shutdown`.
///
/// The sink remembers the path the previous chunk went to and the rotation
/// index in effect for it. A chunk resolving to the same path continues at that
/// index; a chunk resolving elsewhere starts over at index 0.
///
/// Uploads to one path must not run concurrently; the host is expected to
/// deliver chunks for a path one at a time.
#[derive(Debug)]
pub struct AppendSink {
    config: Config,
    signer: Signer<Credential>,
    shared_key: bool,
    uploader: AppendUploader,
    resolver: Arc<dyn ResolvePath>,
    state: Mutex<SinkState>,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl AppendSink {
    /// Build a sink talking to Azure through reqwest, with environment overrides applied.
    pub fn from_config(config: Config) -> Result<Self> {
        let ctx = Context::new()
            .with_http_send(ReqwestHttpSend::new(config.build_http_client()?))
            .with_command_execute(TokioCommandExecute)
            .with_env(OsEnv);
        let config = config.from_env(&ctx);
        Self::new(config, ctx)
    }

    /// Build a sink on an explicit context.
    pub fn new(config: Config, ctx: Context) -> Result<Self> {
        config.validate()?;

        let provider = DefaultCredentialProvider::from_config(&config)?;
        info!("using {} credentials", provider.name());
        let shared_key = provider.is_shared_key();

        let signer = Signer::new(ctx, provider, RequestSigner::new());
        let gateway = StorageGateway::new(signer.clone(), config.account_host()?, config.container()?);
        let format = ObjectKeyFormat::from_config(&config)?;
        if !format.uses_index() {
            warn!(
                "object_key_format '{}' has no %{{index}}, a full blob will fail the upload",
                config.object_key_format
            );
        }
        let resolver: Arc<dyn ResolvePath> = Arc::new(format);
        let uploader = AppendUploader::new(gateway, resolver.clone()).with_write_only(config.write_only);

        Ok(Self {
            config,
            signer,
            shared_key,
            uploader,
            resolver,
            state: Mutex::new(SinkState::default()),
            refresh: Mutex::new(None),
        })
    }

    /// Resolve blob paths with `resolver` instead of the configured template.
    pub fn with_resolver(mut self, resolver: Arc<dyn ResolvePath>) -> Self {
        self.uploader = self.uploader.with_resolver(resolver.clone());
        self.resolver = resolver;
        self
    }

    /// Send at most `block_size` bytes per append call.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.uploader = self.uploader.with_block_size(block_size);
        self
    }

    /// The signer holding the active credential.
    pub fn signer(&self) -> &Signer<Credential> {
        &self.signer
    }

    /// The gateway chunks are appended through.
    pub fn gateway(&self) -> &StorageGateway {
        self.uploader.gateway()
    }

    /// Path the previous chunk was appended to.
    pub fn last_path(&self) -> Option<String> {
        self.state().last_path.clone()
    }

    /// Rotation index the next chunk for `last_path` starts at.
    pub fn current_index(&self) -> u32 {
        self.state().current_index
    }

    fn state(&self) -> MutexGuard<'_, SinkState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Acquire credentials and prepare the container.
    pub async fn start(&self) -> Result<()> {
        let handle = if self.shared_key {
            info!("access storage key is configured, token refresh is disabled");
            self.signer.refresh().await?;
            RefreshHandle::noop()
        } else {
            TokenRefresher::new(
                self.signer.clone(),
                Duration::from_secs(self.config.oauth_refresh_interval),
            )
            .with_startup_fail_on_error(self.config.startup_fail_on_error)
            .start()
            .await?
        };
        *self
            .refresh
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);

        if self.config.skip_container_check {
            debug!("container check is skipped");
            return Ok(());
        }

        match self.prepare_container().await {
            Err(e) if self.config.failsafe_container_check => {
                warn!("{e}, container check failsafe is enabled, continue without it");
                Ok(())
            }
            r => r,
        }
    }

    async fn prepare_container(&self) -> Result<()> {
        let gateway = self.uploader.gateway();
        if self.config.write_only && self.config.auto_create_container {
            return gateway.create_container().await;
        }

        match gateway.container_exists().await? {
            ContainerStatus::Exists => Ok(()),
            ContainerStatus::NotFound if self.config.auto_create_container => {
                info!(
                    "container '{}' does not exist, creating it",
                    gateway.container()
                );
                gateway.create_container().await
            }
            ContainerStatus::NotFound => Err(abfs_core::Error::config_invalid(format!(
                "the specified container does not exist: container = {}",
                gateway.container()
            ))),
        }
    }

    /// Append one chunk to its blob.
    ///
    /// With `enable_retry`, transport and service failures come back retryable
    /// so the host can deliver the chunk again.
    pub async fn upload(&self, chunk: &Chunk) -> Result<()> {
        if chunk.content.is_empty() {
            debug!("skip empty chunk");
            return Ok(());
        }

        let (path, index) = {
            let mut state = self.state();
            let mut path = self.resolver.resolve(&chunk.metadata, state.current_index);
            if state.last_path.as_deref() != Some(path.as_str()) {
                state.current_index = 0;
                path = self.resolver.resolve(&chunk.metadata, 0);
            }
            (path, state.current_index)
        };

        debug!("chunk goes to '{path}' at index {index}");

        let report = self
            .uploader
            .upload(&chunk.content, &chunk.metadata, index)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::Unexpected | ErrorKind::Timeout => {
                    e.set_retryable(self.config.enable_retry)
                }
                _ => e,
            })?;

        let mut state = self.state();
        state.current_index = report.index;
        state.last_path = Some(report.path);
        Ok(())
    }

    /// Stop the background token refresh.
    pub async fn shutdown(&self) {
        let handle = self
            .refresh
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }
}
