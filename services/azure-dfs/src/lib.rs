//! Durable append uploads to Azure Data Lake Storage Gen2
//!
//! This crate appends byte chunks to blobs in an ADLS Gen2 filesystem:
//! - Shared Key authentication
//! - Bearer token authentication (managed identity, client secret or Azure CLI),
//!   refreshed in the background
//! - Bounded append blocks with rotation to a new indexed blob when one fills up
//!
//! # Example
//!
//! ```rust,no_run
//! use abfs_azure_dfs::{AppendSink, Chunk, ChunkMetadata, Config};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_toml(
//!         r#"
//!         account_name = "mystorageaccount"
//!         container = "logs"
//!         path = "app/"
//!         oauth_use_azure_cli = true
//!         auto_create_container = true
//!         "#,
//!     )?;
//!
//!     let sink = AppendSink::from_config(config)?;
//!     sink.start().await?;
//!
//!     sink.upload(&Chunk {
//!         content: "hello, world\n".into(),
//!         metadata: ChunkMetadata {
//!             timekey: Some(1646092800),
//!             unique_id: vec![0x5f, 0x3a],
//!         },
//!     })
//!     .await?;
//!
//!     sink.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod constants;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

pub mod provide_credential;
pub use provide_credential::DefaultCredentialProvider;

mod sign_request;
pub use sign_request::{canonicalize_resource, string_to_sign, RequestSigner};

mod refresh;
pub use refresh::{RefreshHandle, TokenRefresher};

mod gateway;
pub use gateway::{AppendOutcome, ContainerStatus, CreateBlobOutcome, StorageGateway};

mod path;
pub use path::{ChunkMetadata, ObjectKeyFormat, ResolvePath};

mod upload;
pub use upload::{AppendUploader, UploadReport};

mod sink;
pub use sink::{AppendSink, Chunk};
