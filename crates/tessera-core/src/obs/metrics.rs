use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, cmp::Ordering, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for session operations.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Identity cache
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_evictions: u64,

    // Backend reads
    pub backend_reads: u64,
    pub rows_loaded: u64,

    // Cascade resolution
    pub cascades_resolved: u64,
    pub cascade_objects: u64,

    // Per-object writes
    pub persists: u64,
    pub merges: u64,
    pub removes: u64,

    pub listeners_fired: u64,
    pub connections_opened: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_evictions: u64,
    pub backend_reads: u64,
    pub rows_loaded: u64,
    pub cascades_resolved: u64,
    pub cascade_objects: u64,
    pub persists: u64,
    pub merges: u64,
    pub removes: u64,
    pub listeners_fired: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Borrow the per-entity counters for one type path, creating them on first use.
pub(crate) fn with_entity_mut<R>(
    m: &mut EventState,
    path: &str,
    f: impl FnOnce(&mut EntityCounters) -> R,
) -> R {
    f(m.entities.entry(path.to_string()).or_default())
}

/// Reset all counters and start a new window.
pub fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Raw counters since `window_start_ms`.
    pub counters: Option<EventState>,
    /// Per-entity counters with derived ratios.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub path: String,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_ratio: f64,
    pub backend_reads: u64,
    pub rows_loaded: u64,
    pub writes: u64,
    pub removes: u64,
    pub avg_cascade_objects: f64,
}

/// Build a report from the in-memory counters.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut entity_counters: Vec<EntitySummary> = snap
        .entities
        .iter()
        .map(|(path, c)| {
            let lookups = c.cache_hits.saturating_add(c.cache_misses);
            let hit_ratio = if lookups > 0 {
                c.cache_hits as f64 / lookups as f64
            } else {
                0.0
            };
            let avg_cascade = if c.cascades_resolved > 0 {
                c.cascade_objects as f64 / c.cascades_resolved as f64
            } else {
                0.0
            };

            EntitySummary {
                path: path.clone(),
                cache_hits: c.cache_hits,
                cache_misses: c.cache_misses,
                cache_hit_ratio: hit_ratio,
                backend_reads: c.backend_reads,
                rows_loaded: c.rows_loaded,
                writes: c.persists.saturating_add(c.merges),
                removes: c.removes,
                avg_cascade_objects: avg_cascade,
            }
        })
        .collect();

    // Busiest writers first, then lowest hit ratio, then path.
    entity_counters.sort_by(|a, b| match b.writes.cmp(&a.writes) {
        Ordering::Equal => match a
            .cache_hit_ratio
            .partial_cmp(&b.cache_hit_ratio)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => a.path.cmp(&b.path),
            other => other,
        },
        other => other,
    });

    EventReport {
        counters: Some(snap),
        entity_counters,
    }
}

/// Build a report only if the current window opened at or after `window_start_ms`.
///
/// Counters from a window that started earlier cannot be attributed to the
/// requested window, so an empty report is returned instead.
#[must_use]
pub fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    match window_start_ms {
        Some(requested) if with_state(|m| m.window_start_ms) < requested => {
            EventReport::default()
        }
        _ => report(),
    }
}

///
/// TESTS
///
