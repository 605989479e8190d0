use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info};

use crate::database::store::OtpStore;

/// Periodically deletes expired OTP challenges.
///
/// Validation already checks expiry passively, so the sweep is purely
/// hygiene; a missed cycle never makes a stale code usable.
pub struct OtpSweepWorker {
    store: Arc<dyn OtpStore>,
    interval_secs: u64,
}

impl OtpSweepWorker {
    pub fn new(store: Arc<dyn OtpStore>, interval_secs: u64) -> Self {
        Self {
            store,
            interval_secs,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs));
        info!(
            interval_secs = self.interval_secs,
            "OTP sweep worker started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.store.purge_expired().await {
                        Ok(count) if count > 0 => {
                            info!(purged = count, "Purged expired OTP challenges");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "Failed to purge expired OTP challenges");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("OTP sweep worker stopping");
                        break;
                    }
                }
            }
        }
    }
}
