//! Merges provider snapshots into one uniform table.
//!
//! Every call to [`UniformAggregator::current_uniforms`] opens an independent
//! stream: the providers are attached to a fresh channel tagged with their
//! position and their current snapshots are folded, in provider order, into
//! one complete first map. From then on each published snapshot is folded into
//! the running table. Each fold yields an immutable [`UniformMap`]; later folds
//! never mutate maps already handed out.
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};

use crate::provider::{PropertyProvider, ProviderEvent, SnapshotSink};
use crate::types::UniformDescriptor;

/// Immutable name → descriptor table, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformMap(Arc<BTreeMap<String, UniformDescriptor>>);

impl UniformMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new map where every descriptor in `snapshot` overwrites the
    /// entry with the same name.
    pub fn with_snapshot(&self, snapshot: &[UniformDescriptor]) -> Self {
        let mut next = Arc::clone(&self.0);
        let table = Arc::make_mut(&mut next);
        for descriptor in snapshot {
            table.insert(descriptor.name.clone(), descriptor.clone());
        }
        Self(next)
    }

    pub fn get(&self, name: &str) -> Option<&UniformDescriptor> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, UniformDescriptor> {
        self.0.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl FromIterator<UniformDescriptor> for UniformMap {
    fn from_iter<I: IntoIterator<Item = UniformDescriptor>>(iter: I) -> Self {
        let descriptors: Vec<_> = iter.into_iter().collect();
        UniformMap::new().with_snapshot(&descriptors)
    }
}

pub struct UniformAggregator {
    providers: Vec<Arc<dyn PropertyProvider>>,
}

impl UniformAggregator {
    pub fn new(providers: Vec<Arc<dyn PropertyProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn PropertyProvider>] {
        &self.providers
    }

    pub fn current_uniforms(&self) -> UniformStream {
        let (sender, receiver) = unbounded();
        let alive = Arc::new(());
        // Attach before reading snapshots so nothing published in between is
        // lost; a duplicate fold of the same value is harmless.
        for (index, provider) in self.providers.iter().enumerate() {
            provider.attach(SnapshotSink::new(index, sender.clone()).owned_by(&alive));
        }
        let acc = self
            .providers
            .iter()
            .fold(UniformMap::new(), |acc, provider| {
                acc.with_snapshot(&provider.snapshot())
            });
        let initial = (!self.providers.is_empty()).then(|| acc.clone());

        tracing::debug!(
            providers = self.providers.len(),
            uniforms = acc.len(),
            "opened uniform stream"
        );
        UniformStream {
            receiver,
            initial,
            acc,
            _alive: alive,
        }
    }
}

/// One subscription to the aggregated uniforms.
pub struct UniformStream {
    receiver: Receiver<ProviderEvent>,
    /// Every provider's snapshot as of opening, not yet handed out.
    initial: Option<UniformMap>,
    acc: UniformMap,
    /// Sinks attached for this stream close when it drops.
    _alive: Arc<()>,
}

impl UniformStream {
    /// Folds the next queued snapshot, if any.
    pub fn try_next(&mut self) -> Option<UniformMap> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        let event = self.receiver.try_recv().ok()?;
        Some(self.fold(event))
    }

    pub fn next_timeout(&mut self, timeout: Duration) -> Option<UniformMap> {
        if let Some(map) = self.try_next() {
            return Some(map);
        }
        let event = self.receiver.recv_timeout(timeout).ok()?;
        Some(self.fold(event))
    }

    /// Every map that can be produced right now, oldest first.
    pub fn pending(&mut self) -> impl Iterator<Item = UniformMap> + '_ {
        std::iter::from_fn(move || self.try_next())
    }

    /// Folds everything queued and returns the newest map.
    pub fn latest(&mut self) -> Option<UniformMap> {
        self.pending().last()
    }

    pub fn current(&self) -> &UniformMap {
        &self.acc
    }

    fn fold(&mut self, event: ProviderEvent) -> UniformMap {
        tracing::trace!(
            provider = event.provider,
            descriptors = event.snapshot.len(),
            "folding provider snapshot"
        );
        self.acc = self.acc.with_snapshot(&event.snapshot);
        self.acc.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SnapshotHub;
    use crate::providers::{ConstantProvider, ResolutionProvider, TimeProvider};
    use crate::types::UniformValue;

    #[test]
    fn merges_time_and_resolution() {
        let resolution = Arc::new(ResolutionProvider::new(800, 600));
        let time = Arc::new(TimeProvider::new());
        let providers: Vec<Arc<dyn PropertyProvider>> = vec![
            resolution as Arc<dyn PropertyProvider>,
            time as Arc<dyn PropertyProvider>,
        ];
        let aggregator = UniformAggregator::new(providers);

        let mut stream = aggregator.current_uniforms();
        let emitted: Vec<_> = stream.pending().collect();
        assert_eq!(emitted.len(), 1);

        let merged = &emitted[0];
        assert_eq!(merged.names().collect::<Vec<_>>(), vec!["resolution", "time"]);
        assert_eq!(merged.get("time").unwrap().value, UniformValue::Scalar(0.0));
        assert_eq!(
            merged.get("resolution").unwrap().value,
            UniformValue::Vector2([800.0, 600.0])
        );
    }

    #[test]
    fn last_writer_wins_per_name() {
        let first = Arc::new(ConstantProvider::new(
            "first",
            vec![UniformDescriptor::scalar("shared", 1.0)],
        ));
        let second = Arc::new(ConstantProvider::new(
            "second",
            vec![UniformDescriptor::scalar("other", 0.0)],
        ));
        let providers: Vec<Arc<dyn PropertyProvider>> = vec![
            first.clone() as Arc<dyn PropertyProvider>,
            second.clone() as Arc<dyn PropertyProvider>,
        ];
        let aggregator = UniformAggregator::new(providers);
        let mut stream = aggregator.current_uniforms();
        stream.latest();

        second.set(vec![UniformDescriptor::scalar("shared", 2.0)]);
        assert_eq!(stream.latest().unwrap().get("shared").unwrap().as_scalar(), Some(2.0));

        first.set(vec![UniformDescriptor::scalar("shared", 3.0)]);
        let map = stream.latest().unwrap();
        assert_eq!(map.get("shared").unwrap().as_scalar(), Some(3.0));
        // Descriptors are never removed.
        assert!(map.get("other").is_some());
    }

    #[test]
    fn emitted_maps_are_not_mutated_by_later_folds() {
        let time = Arc::new(TimeProvider::new());
        let aggregator = UniformAggregator::new(vec![time.clone() as Arc<dyn PropertyProvider>]);
        let mut stream = aggregator.current_uniforms();

        let before = stream.latest().unwrap();
        time.set_seconds(4.0);
        let after = stream.latest().unwrap();

        assert_eq!(before.get("time").unwrap().as_scalar(), Some(0.0));
        assert_eq!(after.get("time").unwrap().as_scalar(), Some(4.0));
    }

    #[test]
    fn first_map_holds_every_provider() {
        let time = Arc::new(TimeProvider::new());
        let aggregator = UniformAggregator::new(vec![
            time.clone() as Arc<dyn PropertyProvider>,
            Arc::new(ResolutionProvider::new(800, 600)) as Arc<dyn PropertyProvider>,
        ]);
        let mut stream = aggregator.current_uniforms();

        let first = stream.try_next().unwrap();
        assert_eq!(first.len(), 2);
        assert!(stream.try_next().is_none());

        time.set_seconds(0.5);
        let next = stream.try_next().unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(next.get("time").unwrap().as_scalar(), Some(0.5));
    }

    #[test]
    fn dropped_streams_leave_no_sinks_behind() {
        struct Quiet(SnapshotHub);

        impl PropertyProvider for Quiet {
            fn name(&self) -> &str {
                "quiet"
            }

            fn snapshot(&self) -> crate::provider::Snapshot {
                self.0.latest()
            }

            fn attach(&self, sink: SnapshotSink) {
                self.0.attach(sink);
            }
        }

        let quiet = Arc::new(Quiet(SnapshotHub::new(vec![UniformDescriptor::scalar(
            "level", 1.0,
        )])));
        let aggregator = UniformAggregator::new(vec![quiet.clone() as Arc<dyn PropertyProvider>]);
        for _ in 0..4 {
            drop(aggregator.current_uniforms());
        }
        let mut stream = aggregator.current_uniforms();
        assert_eq!(quiet.0.sink_count(), 1);
        assert_eq!(stream.latest().unwrap().get("level").unwrap().as_scalar(), Some(1.0));
    }

    #[test]
    fn no_providers_emit_nothing() {
        let mut stream = UniformAggregator::new(Vec::new()).current_uniforms();
        assert!(stream.try_next().is_none());
    }

    #[test]
    fn streams_are_independent() {
        let time = Arc::new(TimeProvider::new());
        let aggregator = UniformAggregator::new(vec![time.clone() as Arc<dyn PropertyProvider>]);
        let mut first = aggregator.current_uniforms();
        first.latest();

        time.set_seconds(1.0);
        let mut second = aggregator.current_uniforms();

        assert_eq!(first.pending().count(), 1);
        let replayed: Vec<_> = second.pending().collect();
        assert_eq!(replayed.len(), 1);
        assert_eq!(
            replayed.last().unwrap().get("time").unwrap().as_scalar(),
            Some(1.0)
        );
    }
}
