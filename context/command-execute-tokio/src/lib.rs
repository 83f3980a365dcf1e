//! Tokio-based command execution implementation for abfs.
//!
//! This crate provides `TokioCommandExecute`, an async command executor that implements
//! the `CommandExecute` trait from `abfs_core` using Tokio's process operations.
//!
//! It backs the Azure CLI credential strategy, which shells out to
//! `az account get-access-token` and reads the token from stdout.
//!
//! ## Example
//!
//! ```no_run
//! use abfs_core::Context;
//! use abfs_command_execute_tokio::TokioCommandExecute;
//!
//! # async fn example() -> abfs_core::Result<()> {
//! let ctx = Context::new().with_command_execute(TokioCommandExecute);
//!
//! let output = ctx.command_execute("az", &["--version"]).await?;
//! if output.success() {
//!     println!("{}", String::from_utf8_lossy(&output.stdout));
//! }
//! # Ok(())
//! # }
//! ```

use abfs_core::{CommandExecute, CommandOutput, Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Tokio-based implementation of the `CommandExecute` trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandExecute;

#[async_trait]
impl CommandExecute for TokioCommandExecute {
    async fn command_execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::unexpected(format!("failed to execute command '{program}'")).with_source(e)
            })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
