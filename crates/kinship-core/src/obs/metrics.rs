use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for cascades and query synthesis.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    /// Keyed by `owner_path.field`.
    pub associations: BTreeMap<String, AssociationCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Orchestrator entrypoints
    pub cascades: u64,
    pub cascades_invalid: u64,

    // Nested dispatch
    pub nested_inserts: u64,
    pub nested_updates: u64,
    pub nested_deletes: u64,
    pub nested_rejections: u64,

    // Replace dispositions
    pub replace_mark_invalid: u64,
    pub replace_delete: u64,
    pub replace_nilify: u64,
    pub replace_raise: u64,

    // Synthesized queries
    pub joins_queries: u64,
    pub assoc_queries: u64,
    pub through_queries: u64,
}

///
/// AssociationCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AssociationCounters {
    pub persisted: u64,
    pub rejected: u64,
    pub replaced: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Counter entry for one association.
pub(crate) fn association_entry<'a>(
    m: &'a mut EventState,
    owner_path: &str,
    field: &str,
) -> &'a mut AssociationCounters {
    m.associations
        .entry(format!("{owner_path}.{field}"))
        .or_default()
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: EventState,
    /// Associations that saw at least one rejected nested change.
    pub rejecting_associations: Vec<String>,
}

/// Build a metrics report by inspecting in-memory counters only.
#[must_use]
pub(crate) fn report() -> EventReport {
    let counters = with_state(Clone::clone);
    let rejecting_associations = counters
        .associations
        .iter()
        .filter(|(_, c)| c.rejected > 0)
        .map(|(key, _)| key.clone())
        .collect();

    EventReport {
        counters,
        rejecting_associations,
    }
}
