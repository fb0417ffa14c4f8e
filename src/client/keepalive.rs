//! Periodic `/api/ping` while a chat is open.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::ChatClient;

/// Handle to a running keepalive task. Dropping it stops the pings.
#[derive(Debug)]
pub struct KeepAlive {
    handle: JoinHandle<()>,
}

impl KeepAlive {
    /// Stop pinging.
    pub fn stop(self) {}

    /// Returns true while the task is still scheduled.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Ping the backend every `interval` until the returned handle is dropped.
///
/// The first ping goes out one interval after the call. A zero interval
/// disables pinging. Failures are logged and otherwise ignored.
pub fn spawn_keepalive(client: ChatClient, interval: Duration) -> KeepAlive {
    if interval.is_zero() {
        debug!("Keepalive disabled");
        return KeepAlive {
            handle: tokio::spawn(async {}),
        };
    }

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately once
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match client.ping().await {
                Ok(()) => trace!("Keepalive ping ok"),
                Err(e) => debug!(error = %e, "Keepalive ping failed"),
            }
        }
    });

    KeepAlive { handle }
}
