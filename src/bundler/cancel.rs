//! Cooperative cancellation for the bundling pipeline.
//!
//! A single token is shared by every pipeline step and checked after each
//! discrete I/O operation. Cancellation is advisory: an in-flight download or
//! subprocess is not interrupted, the pipeline simply stops at the next
//! checkpoint.

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Process-wide cancellation token.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the token. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Checkpoint: returns [`Error::Cancelled`] once the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.inner.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Spawns the task watching for OS termination signals.
///
/// On the first monitored signal it trips the token exactly once and exits.
/// Pipeline logic never touches signals directly.
pub fn spawn_signal_handler(token: CancelToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        log::info!("Received termination signal, stopping");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("Installing SIGINT handler failed: {e}");
            return;
        }
    };
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("Installing SIGTERM handler failed: {e}");
            return;
        }
    };
    let mut quit = match signal(SignalKind::quit()) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("Installing SIGQUIT handler failed: {e}");
            return;
        }
    };

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = quit.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Installing ctrl-c handler failed: {e}");
    }
}
