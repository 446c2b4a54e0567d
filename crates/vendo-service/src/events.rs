//! # Event Announcers
//!
//! Sinks for the [`SaleEvent`]s the sale workflow returns.
//!
//! ## Delivery Options
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SaleService ──announce(event)──► EventAnnouncer                       │
//! │                                        │                                │
//! │          ┌─────────────────────────────┼────────────────────────┐       │
//! │          ▼                             ▼                        ▼       │
//! │  ChannelAnnouncer              OutboxAnnouncer          FanoutAnnouncer │
//! │  bounded mpsc, in-process      event_outbox table       forwards to all │
//! │  drops + warns when full       survives restarts        of its targets  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`OutboxRelay`] drains the outbox table into any other announcer and
//! marks each entry delivered or failed.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use vendo_core::SaleEvent;
use vendo_db::{OutboxEntry, OutboxRepository};

use crate::ports::{EventAnnouncer, StoreError, StoreResult};

/// Announces `events` in order. Failures are logged and swallowed.
pub async fn announce_all(announcer: &dyn EventAnnouncer, events: &[SaleEvent]) {
    for event in events {
        if let Err(e) = announcer.announce(event).await {
            warn!(
                event_type = event.event_type(),
                sale_id = event.sale_id(),
                error = %e,
                "Failed to announce event"
            );
        }
    }
}

// =============================================================================
// Channel
// =============================================================================

/// Pushes events into a bounded channel.
///
/// Never waits: when the receiver lags behind by `capacity` events the new
/// event is dropped.
#[derive(Debug, Clone)]
pub struct ChannelAnnouncer {
    tx: mpsc::Sender<SaleEvent>,
}

impl ChannelAnnouncer {
    /// Creates the announcer and the receiving end.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SaleEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ChannelAnnouncer { tx }, rx)
    }
}

#[async_trait]
impl EventAnnouncer for ChannelAnnouncer {
    async fn announce(&self, event: &SaleEvent) -> StoreResult<()> {
        match self.tx.try_send(event.clone()) {
            Ok(()) => {
                debug!(event_type = event.event_type(), "Event queued on channel");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                Err(StoreError::Failure("event channel is full".into()))
            }
            Err(TrySendError::Closed(_)) => {
                Err(StoreError::Failure("event channel is closed".into()))
            }
        }
    }
}

// =============================================================================
// Outbox
// =============================================================================

/// Writes events to the `event_outbox` table for a relay to deliver.
#[derive(Debug, Clone)]
pub struct OutboxAnnouncer {
    outbox: OutboxRepository,
}

impl OutboxAnnouncer {
    pub fn new(outbox: OutboxRepository) -> Self {
        OutboxAnnouncer { outbox }
    }
}

#[async_trait]
impl EventAnnouncer for OutboxAnnouncer {
    async fn announce(&self, event: &SaleEvent) -> StoreResult<()> {
        let entry = self.outbox.enqueue(event).await?;
        debug!(outbox_id = entry.id, event_type = %entry.event_type, "Event stored in outbox");
        Ok(())
    }
}

// =============================================================================
// Fanout
// =============================================================================

/// Forwards every event to each target in order.
///
/// All targets are tried even if one fails; the first failure is returned.
#[derive(Clone, Default)]
pub struct FanoutAnnouncer {
    targets: Vec<Arc<dyn EventAnnouncer>>,
}

impl FanoutAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: Arc<dyn EventAnnouncer>) -> Self {
        self.targets.push(target);
        self
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[async_trait]
impl EventAnnouncer for FanoutAnnouncer {
    async fn announce(&self, event: &SaleEvent) -> StoreResult<()> {
        let mut first_error = None;
        for target in &self.targets {
            if let Err(e) = target.announce(event).await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Outbox Relay
// =============================================================================

/// Entries that failed this many times are left in the table untouched.
pub const MAX_RELAY_ATTEMPTS: i64 = 5;

const DEFAULT_RELAY_BATCH: u32 = 100;

/// What one [`OutboxRelay::relay_once`] pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub delivered: usize,
    pub failed: usize,
    /// Entries past [`MAX_RELAY_ATTEMPTS`].
    pub skipped: usize,
}

/// Delivers pending outbox entries to a downstream announcer.
///
/// Delivery is at-least-once: an entry whose `mark_delivered` write fails
/// is sent again on the next pass.
pub struct OutboxRelay {
    outbox: OutboxRepository,
    target: Arc<dyn EventAnnouncer>,
    batch_size: u32,
}

impl OutboxRelay {
    pub fn new(outbox: OutboxRepository, target: Arc<dyn EventAnnouncer>) -> Self {
        OutboxRelay {
            outbox,
            target,
            batch_size: DEFAULT_RELAY_BATCH,
        }
    }

    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Relays one batch of pending entries, oldest first.
    pub async fn relay_once(&self) -> StoreResult<RelayReport> {
        let entries = self.outbox.get_pending(self.batch_size).await?;
        let mut report = RelayReport::default();

        if entries.is_empty() {
            debug!("No pending outbox entries");
            return Ok(report);
        }

        let (processable, skipped): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| e.attempts < MAX_RELAY_ATTEMPTS);

        for entry in &skipped {
            warn!(
                outbox_id = entry.id,
                event_type = %entry.event_type,
                attempts = entry.attempts,
                "Skipping entry that exceeded max relay attempts"
            );
        }
        report.skipped = skipped.len();

        for entry in &processable {
            match self.deliver(entry).await {
                Ok(()) => {
                    if let Err(e) = self.outbox.mark_delivered(entry.id).await {
                        error!(outbox_id = entry.id, error = %e, "Failed to mark entry as delivered");
                    }
                    report.delivered += 1;
                }
                Err(reason) => {
                    if let Err(e) = self.outbox.mark_failed(entry.id, &reason).await {
                        error!(outbox_id = entry.id, error = %e, "Failed to mark entry as failed");
                    }
                    report.failed += 1;
                }
            }
        }

        info!(
            delivered = report.delivered,
            failed = report.failed,
            skipped = report.skipped,
            "Relayed outbox batch"
        );
        Ok(report)
    }

    /// Deletes delivered entries older than `days_old` days.
    pub async fn cleanup(&self, days_old: u32) -> StoreResult<u64> {
        let removed = self.outbox.cleanup_delivered(days_old).await?;
        debug!(removed, days_old, "Cleaned up delivered outbox entries");
        Ok(removed)
    }

    async fn deliver(&self, entry: &OutboxEntry) -> Result<(), String> {
        let event = entry.event().map_err(|e| e.to_string())?;
        self.target.announce(&event).await.map_err(|e| e.to_string())
    }
}
