//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Nothing here touches descriptors or change sets directly; the cascade and
//! the synthesizer report through `sink::record`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{AssociationCounters, EventOps, EventReport, EventState};
pub use sink::{
    MetricsEvent, MetricsSink, QueryKind, metrics_report, metrics_reset_all, with_metrics_sink,
};
