//! Metrics sink boundary.
//!
//! Session and registry code never touch `obs::metrics` directly; every
//! counter update flows through `MetricsEvent` and `MetricsSink`.
use crate::{model::BackendKind, obs::metrics};
use std::cell::Cell;

thread_local! {
    static SINK_OVERRIDE: Cell<Option<&'static dyn MetricsSink>> = const { Cell::new(None) };
}

///
/// WriteKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteKind {
    Persist,
    Merge,
    Remove,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricsEvent {
    CacheLookup {
        entity_path: &'static str,
        hit: bool,
    },
    CacheEvict {
        entity_path: &'static str,
    },
    BackendRead {
        entity_path: &'static str,
        rows: u64,
    },
    CascadeResolved {
        entity_path: &'static str,
        emitted: u64,
    },
    EntityWrite {
        kind: WriteKind,
        entity_path: &'static str,
    },
    ListenersFired {
        entity_path: &'static str,
        count: u64,
    },
    ConnectionOpened {
        backend: BackendKind,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Sync {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink writing into the thread-local counter state.
/// Used whenever no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::CacheLookup { entity_path, hit } => {
                metrics::with_state_mut(|m| {
                    if hit {
                        m.ops.cache_hits = m.ops.cache_hits.saturating_add(1);
                    } else {
                        m.ops.cache_misses = m.ops.cache_misses.saturating_add(1);
                    }
                    metrics::with_entity_mut(m, entity_path, |e| {
                        if hit {
                            e.cache_hits = e.cache_hits.saturating_add(1);
                        } else {
                            e.cache_misses = e.cache_misses.saturating_add(1);
                        }
                    });
                });
            }

            MetricsEvent::CacheEvict { entity_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.cache_evictions = m.ops.cache_evictions.saturating_add(1);
                    metrics::with_entity_mut(m, entity_path, |e| {
                        e.cache_evictions = e.cache_evictions.saturating_add(1);
                    });
                });
            }

            MetricsEvent::BackendRead { entity_path, rows } => {
                metrics::with_state_mut(|m| {
                    m.ops.backend_reads = m.ops.backend_reads.saturating_add(1);
                    m.ops.rows_loaded = m.ops.rows_loaded.saturating_add(rows);
                    metrics::with_entity_mut(m, entity_path, |e| {
                        e.backend_reads = e.backend_reads.saturating_add(1);
                        e.rows_loaded = e.rows_loaded.saturating_add(rows);
                    });
                });
            }

            MetricsEvent::CascadeResolved {
                entity_path,
                emitted,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.cascades_resolved = m.ops.cascades_resolved.saturating_add(1);
                    m.ops.cascade_objects = m.ops.cascade_objects.saturating_add(emitted);
                    metrics::with_entity_mut(m, entity_path, |e| {
                        e.cascades_resolved = e.cascades_resolved.saturating_add(1);
                        e.cascade_objects = e.cascade_objects.saturating_add(emitted);
                    });
                });
            }

            MetricsEvent::EntityWrite { kind, entity_path } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        WriteKind::Persist => m.ops.persists = m.ops.persists.saturating_add(1),
                        WriteKind::Merge => m.ops.merges = m.ops.merges.saturating_add(1),
                        WriteKind::Remove => m.ops.removes = m.ops.removes.saturating_add(1),
                    }
                    metrics::with_entity_mut(m, entity_path, |e| match kind {
                        WriteKind::Persist => e.persists = e.persists.saturating_add(1),
                        WriteKind::Merge => e.merges = e.merges.saturating_add(1),
                        WriteKind::Remove => e.removes = e.removes.saturating_add(1),
                    });
                });
            }

            MetricsEvent::ListenersFired { entity_path, count } => {
                metrics::with_state_mut(|m| {
                    m.ops.listeners_fired = m.ops.listeners_fired.saturating_add(count);
                    metrics::with_entity_mut(m, entity_path, |e| {
                        e.listeners_fired = e.listeners_fired.saturating_add(count);
                    });
                });
            }

            MetricsEvent::ConnectionOpened { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.connections_opened = m.ops.connections_opened.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

/// Route one event to the scoped override, or to the global sink.
pub(crate) fn record(event: MetricsEvent) {
    match SINK_OVERRIDE.with(Cell::get) {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
///
/// The previous sink is restored on every exit, including unwinding.
pub fn with_metrics_sink<T>(sink: &'static dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<&'static dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| cell.set(self.0));
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.replace(Some(sink)));
    let _guard = Guard(prev);

    f()
}
