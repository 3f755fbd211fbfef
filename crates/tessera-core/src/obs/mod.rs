//! Observability: in-memory operation counters and the sink they flow through.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EntitySummary, EventOps, EventReport, EventState};
pub use sink::{
    MetricsEvent, MetricsSink, WriteKind, metrics_report, metrics_reset_all, with_metrics_sink,
};
