use std::time::Duration;

use abfs_core::{Result, Signer};
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::constants::STARTUP_RETRY_DELAY;
use crate::Credential;

/// TokenRefresher loads the first credential and keeps it fresh in the background.
///
/// A failed background refresh is logged and the previous credential stays
/// active; signers never observe a missing credential once startup succeeded.
#[derive(Debug)]
pub struct TokenRefresher {
    signer: Signer<Credential>,
    interval: Duration,
    startup_fail_on_error: bool,
    retry_delay: Duration,
}

impl TokenRefresher {
    /// Create a refresher re-acquiring every `interval`. A zero interval disables the background task.
    pub fn new(signer: Signer<Credential>, interval: Duration) -> Self {
        Self {
            signer,
            interval,
            startup_fail_on_error: true,
            retry_delay: STARTUP_RETRY_DELAY,
        }
    }

    /// Fail `start` on the first acquisition error instead of retrying forever.
    pub fn with_startup_fail_on_error(mut self, fail: bool) -> Self {
        self.startup_fail_on_error = fail;
        self
    }

    /// Set the delay between startup attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Acquire the first credential, then spawn the background refresh.
    pub async fn start(self) -> Result<RefreshHandle> {
        if self.startup_fail_on_error {
            self.signer.refresh().await?;
        } else {
            while let Err(e) = self.signer.refresh().await {
                warn!(
                    "{e}, acquiring token failed, wait {}s until next retry",
                    self.retry_delay.as_secs()
                );
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        let token = CancellationToken::new();
        if self.interval.is_zero() {
            return Ok(RefreshHandle { token, task: None });
        }

        info!(
            "start getting access token every {} seconds",
            self.interval.as_secs()
        );
        let task = tokio::spawn(run(self.signer, self.interval, token.clone()));
        Ok(RefreshHandle {
            token,
            task: Some(task),
        })
    }
}

async fn run(signer: Signer<Credential>, period: Duration, token: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => match signer.refresh().await {
                Ok(()) => debug!("access token refreshed"),
                Err(e) => warn!("{e}, continue with previous credentials"),
            },
        }
    }
    debug!("token refresher stopped");
}

/// Handle to the background refresh task; the task stops when this is dropped.
#[derive(Debug)]
pub struct RefreshHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// A handle with no background task, for credentials that never expire.
    pub fn noop() -> Self {
        Self {
            token: CancellationToken::new(),
            task: None,
        }
    }

    /// Whether a background task is still refreshing.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the background task and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
