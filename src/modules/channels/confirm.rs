//! Short-lived confirmations guarding `deletechannels`.

use dashmap::DashMap;
use poise::serenity_prelude::{GuildId, UserId};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeletionKey {
    pub user_id: UserId,
    pub guild_id: GuildId,
    pub pattern: String,
}

impl DeletionKey {
    pub fn new(user_id: UserId, guild_id: GuildId, pattern: &str) -> Self {
        Self {
            user_id,
            guild_id,
            pattern: pattern.to_lowercase(),
        }
    }
}

/// Deletions that have been previewed and await a confirming command.
#[derive(Debug)]
pub struct PendingDeletions {
    window: Duration,
    pending: DashMap<DeletionKey, Instant>,
}

impl PendingDeletions {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Opens (or reopens) the confirmation window for `key`.
    pub fn arm(&self, key: DeletionKey) {
        self.pending.insert(key, Instant::now() + self.window);
    }

    /// Consumes a live confirmation. Returns false if none exists or it expired.
    pub fn take(&self, key: &DeletionKey) -> bool {
        match self.pending.remove(key) {
            Some((_, expires_at)) => Instant::now() <= expires_at,
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self, key: &DeletionKey) -> bool {
        self.pending
            .get(key)
            .map(|expires_at| Instant::now() <= *expires_at)
            .unwrap_or(false)
    }

    /// Drops expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.pending.len();
        self.pending.retain(|_, expires_at| now <= *expires_at);
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
