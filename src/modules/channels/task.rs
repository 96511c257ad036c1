use super::confirm::PendingDeletions;
use crate::tasks::Task;
use async_trait::async_trait;
use poise::serenity_prelude::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Periodically forgets deletion confirmations nobody followed up on.
#[derive(Debug, Clone)]
pub struct ConfirmationSweepTask {
    pending: Arc<PendingDeletions>,
}

impl ConfirmationSweepTask {
    pub fn new(pending: Arc<PendingDeletions>) -> Self {
        Self { pending }
    }

    pub fn sweep(&self) -> usize {
        let purged = self.pending.purge_expired();
        if purged > 0 {
            debug!(
                "Purged {} expired deletion confirmations, {} still pending",
                purged,
                self.pending.len()
            );
        }
        purged
    }
}

#[async_trait]
impl Task for ConfirmationSweepTask {
    fn name(&self) -> &str {
        "ConfirmationSweep"
    }

    fn schedule(&self) -> Option<Duration> {
        Some(Duration::from_secs(60))
    }

    async fn execute(
        &mut self,
        _ctx: &Context,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sweep();
        Ok(())
    }
}
