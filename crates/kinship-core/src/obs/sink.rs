//! Metrics sink boundary.
//!
//! Cascade and synthesizer logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::{
    db::{association::OnReplace, changeset::Action},
    obs::metrics,
};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// QueryKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryKind {
    Joins,
    Assoc,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent<'a> {
    CascadeStart {
        entity_path: &'static str,
        action: Action,
    },
    CascadeFinish {
        entity_path: &'static str,
        valid: bool,
    },
    NestedPersist {
        entity_path: &'static str,
        field: &'a str,
        action: Action,
        ok: bool,
    },
    ReplaceDisposition {
        entity_path: &'static str,
        field: &'a str,
        policy: OnReplace,
    },
    QuerySynthesized {
        kind: QueryKind,
        through: bool,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default process-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::CascadeStart { .. } => {
                metrics::with_state_mut(|m| m.ops.cascades = m.ops.cascades.saturating_add(1));
            }

            MetricsEvent::CascadeFinish { valid, .. } => {
                if !valid {
                    metrics::with_state_mut(|m| {
                        m.ops.cascades_invalid = m.ops.cascades_invalid.saturating_add(1);
                    });
                }
            }

            MetricsEvent::NestedPersist {
                entity_path,
                field,
                action,
                ok,
            } => {
                metrics::with_state_mut(|m| {
                    match action {
                        Action::Insert => {
                            m.ops.nested_inserts = m.ops.nested_inserts.saturating_add(1);
                        }
                        Action::Update => {
                            m.ops.nested_updates = m.ops.nested_updates.saturating_add(1);
                        }
                        Action::Delete => {
                            m.ops.nested_deletes = m.ops.nested_deletes.saturating_add(1);
                        }
                    }
                    if !ok {
                        m.ops.nested_rejections = m.ops.nested_rejections.saturating_add(1);
                    }

                    let entry = metrics::association_entry(m, entity_path, field);
                    if ok {
                        entry.persisted = entry.persisted.saturating_add(1);
                    } else {
                        entry.rejected = entry.rejected.saturating_add(1);
                    }
                });
            }

            MetricsEvent::ReplaceDisposition {
                entity_path,
                field,
                policy,
            } => {
                metrics::with_state_mut(|m| {
                    let ops = &mut m.ops;
                    let counter = match policy {
                        OnReplace::Raise => &mut ops.replace_raise,
                        OnReplace::MarkInvalid => &mut ops.replace_mark_invalid,
                        OnReplace::Delete => &mut ops.replace_delete,
                        OnReplace::Nilify => &mut ops.replace_nilify,
                    };
                    *counter = counter.saturating_add(1);

                    let entry = metrics::association_entry(m, entity_path, field);
                    entry.replaced = entry.replaced.saturating_add(1);
                });
            }

            MetricsEvent::QuerySynthesized { kind, through } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        QueryKind::Joins => {
                            m.ops.joins_queries = m.ops.joins_queries.saturating_add(1);
                        }
                        QueryKind::Assoc => {
                            m.ops.assoc_queries = m.ops.assoc_queries.saturating_add(1);
                        }
                    }
                    if through {
                        m.ops.through_queries = m.ops.through_queries.saturating_add(1);
                    }
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}
