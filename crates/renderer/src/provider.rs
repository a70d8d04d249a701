//! The seam every uniform source implements.
//!
//! Types:
//!
//! - `PropertyProvider` exposes the provider's current descriptors and lets
//!   the aggregator attach a sink that receives each new snapshot.
//! - `SnapshotSink` tags every snapshot with the provider's position in the
//!   aggregator so events from many providers can share one channel.
//! - `SnapshotHub` is the bookkeeping each concrete provider embeds: the
//!   latest snapshot plus the attached sinks.
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crossbeam_channel::Sender;

use crate::types::UniformDescriptor;

/// Immutable set of descriptors published together.
pub type Snapshot = Arc<[UniformDescriptor]>;

#[derive(Debug, Clone)]
pub struct ProviderEvent {
    pub provider: usize,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone)]
pub struct SnapshotSink {
    provider: usize,
    sender: Sender<ProviderEvent>,
    owner: Option<Weak<()>>,
}

impl SnapshotSink {
    pub fn new(provider: usize, sender: Sender<ProviderEvent>) -> Self {
        Self {
            provider,
            sender,
            owner: None,
        }
    }

    /// Ties the sink to `owner`: once every clone of it is dropped the sink
    /// counts as closed and hubs prune it without waiting for a publish.
    pub fn owned_by(mut self, owner: &Arc<()>) -> Self {
        self.owner = Some(Arc::downgrade(owner));
        self
    }

    pub fn provider(&self) -> usize {
        self.provider
    }

    pub fn is_closed(&self) -> bool {
        self.owner
            .as_ref()
            .is_some_and(|owner| owner.strong_count() == 0)
    }

    /// Returns false once the receiving side is gone.
    pub fn send(&self, snapshot: Snapshot) -> bool {
        self.sender
            .send(ProviderEvent {
                provider: self.provider,
                snapshot,
            })
            .is_ok()
    }
}

pub trait PropertyProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Descriptors as of now.
    fn snapshot(&self) -> Snapshot;

    /// Receives every snapshot published after this call.
    fn attach(&self, sink: SnapshotSink);
}

#[derive(Debug)]
pub struct SnapshotHub {
    latest: Mutex<Snapshot>,
    sinks: Mutex<Vec<SnapshotSink>>,
}

impl SnapshotHub {
    pub fn new(initial: Vec<UniformDescriptor>) -> Self {
        Self {
            latest: Mutex::new(initial.into()),
            sinks: Mutex::new(Vec::new()),
        }
    }

    pub fn latest(&self) -> Snapshot {
        Arc::clone(&self.latest.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn attach(&self, sink: SnapshotSink) {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        sinks.retain(|existing| !existing.is_closed());
        sinks.push(sink);
    }

    pub fn publish(&self, descriptors: Vec<UniformDescriptor>) {
        let snapshot: Snapshot = descriptors.into();
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|sink| !sink.is_closed() && sink.send(Arc::clone(&snapshot)));
    }

    pub fn sink_count(&self) -> usize {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
