//! Bounded queue between mutation callbacks and the registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

use crate::dom::mutation::{MutationCallback, MutationSummary};
use crate::registry::registry_model::RecordId;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct MutationNotice {
    pub record: RecordId,
    pub summary: MutationSummary,
}

pub struct MutationQueue {
    tx: mpsc::Sender<MutationNotice>,
    rx: Mutex<Option<mpsc::Receiver<MutationNotice>>>,
    dropped: Arc<AtomicU64>,
}

impl MutationQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Callback for a watch on `record`. Never blocks; a full queue drops
    /// the notice and counts it.
    pub fn callback(&self, record: RecordId) -> MutationCallback {
        let tx = self.tx.clone();
        let dropped = Arc::clone(&self.dropped);
        Arc::new(move |mut summary: MutationSummary| {
            if summary.observed_at == 0 {
                summary.observed_at = now_millis();
            }
            if tx.try_send(MutationNotice { record, summary }).is_err() {
                let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(record = record.0, dropped = total, "mutation queue full, notice dropped");
            }
        })
    }

    /// Everything queued right now. Empty once the receiver has been handed
    /// to a pump.
    pub fn drain(&self) -> Vec<MutationNotice> {
        let mut guard = self.rx.lock();
        let Some(rx) = guard.as_mut() else {
            return Vec::new();
        };
        let mut notices = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        notices
    }

    pub fn take_receiver(&self) -> Option<mpsc::Receiver<MutationNotice>> {
        self.rx.lock().take()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Collapses repeats: a notice is dropped when it describes the same change
/// as the previous kept notice for the same record.
pub fn coalesce(notices: Vec<MutationNotice>) -> Vec<MutationNotice> {
    let mut last: HashMap<RecordId, MutationSummary> = HashMap::new();
    let mut kept = Vec::with_capacity(notices.len());

    for notice in notices {
        if last
            .get(&notice.record)
            .is_some_and(|prev| prev.same_change(&notice.summary))
        {
            continue;
        }
        last.insert(notice.record, notice.summary.clone());
        kept.push(notice);
    }
    kept
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
