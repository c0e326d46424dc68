/******************************************************************************
 *                                                                            *
 * The reducer boundary: typed positional arguments, the invoker port the    *
 * dispatch layer calls through, and the bus on which asynchronous commit    *
 * outcomes are delivered back to whoever is waiting for them.               *
 *                                                                            *
 ******************************************************************************/

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

use crate::reducer_names::ReducerName;

/// One positional reducer argument, already coerced to its wire type.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ReducerArg {
    U8(u8),
    U32(u32),
    U64(u64),
    Str(String),
    /// Player identity, hex encoded.
    Identity(String),
}

impl ReducerArg {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ReducerArg::U8(v) => Some(*v as u64),
            ReducerArg::U32(v) => Some(*v as u64),
            ReducerArg::U64(v) => Some(*v),
            ReducerArg::Str(_) | ReducerArg::Identity(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReducerCall {
    pub reducer: ReducerName,
    pub args: Vec<ReducerArg>,
}

impl ReducerCall {
    pub fn new(reducer: ReducerName, args: Vec<ReducerArg>) -> Self {
        ReducerCall { reducer, args }
    }

    /// The JSON array body the reducer HTTP endpoint expects.
    pub fn args_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.args
                .iter()
                .map(|arg| serde_json::to_value(arg).unwrap_or(serde_json::Value::Null))
                .collect(),
        )
    }
}

/// Fire-and-forget reducer invocation. `invoke` returns once the call is
/// handed off; its effect arrives later through the table cache and the
/// commit outcome through a `ReducerEventBus`.
pub trait ReducerInvoker: Send + Sync {
    /// Whether the connected module exposes `reducer`. Invokers without a
    /// catalog assume every name exists.
    fn knows_reducer(&self, _reducer: &ReducerName) -> bool {
        true
    }

    /// Hands the call off. An Err here means the call could not even be sent.
    fn invoke(&self, call: ReducerCall) -> Result<(), String>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum CommitStatus {
    Committed,
    Failed(String),
    OutOfEnergy,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReducerEvent {
    pub reducer: ReducerName,
    pub args: Vec<ReducerArg>,
    pub status: CommitStatus,
}

/// What a listener wants after seeing an event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ListenerControl {
    Keep,
    Remove,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    pub(crate) fn next() -> Self {
        ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Listeners keyed by id that can be taken out for delivery and put back.
/// Removing an id while it is out for delivery cancels it, so it is not
/// restored afterwards.
pub(crate) struct ListenerSet<L> {
    entries: Vec<(ListenerId, L)>,
    in_delivery: HashSet<ListenerId>,
    cancelled: HashSet<ListenerId>,
}

impl<L> Default for ListenerSet<L> {
    fn default() -> Self {
        ListenerSet { entries: Vec::new(), in_delivery: HashSet::new(), cancelled: HashSet::new() }
    }
}

impl<L> ListenerSet<L> {
    pub(crate) fn insert(&mut self, id: ListenerId, listener: L) {
        self.entries.push((id, listener));
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        if let Some(pos) = self.entries.iter().position(|(existing, _)| *existing == id) {
            self.entries.remove(pos);
            return true;
        }
        self.in_delivery.contains(&id) && self.cancelled.insert(id)
    }

    /// Registered listeners, not counting any out for delivery.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn take_matching(&mut self, mut matches: impl FnMut(&L) -> bool) -> Vec<(ListenerId, L)> {
        let (taken, kept): (Vec<_>, Vec<_>) = self.entries.drain(..).partition(|(_, l)| matches(l));
        self.entries = kept;
        self.in_delivery.extend(taken.iter().map(|(id, _)| *id));
        taken
    }

    /// Ends delivery for every taken id. `None` means the listener asked to go.
    pub(crate) fn restore(&mut self, delivered: Vec<(ListenerId, Option<L>)>) {
        for (id, listener) in delivered {
            self.in_delivery.remove(&id);
            let cancelled = self.cancelled.remove(&id);
            if let (Some(listener), false) = (listener, cancelled) {
                self.entries.push((id, listener));
            }
        }
    }
}

pub type ReducerListener = Box<dyn FnMut(&ReducerEvent) -> ListenerControl + Send>;

struct Registered {
    reducer: ReducerName,
    listener: ReducerListener,
}

/// Per-reducer commit listeners. Listeners run outside the lock, so a
/// listener may register or remove others while handling an event.
#[derive(Default)]
pub struct ReducerEventBus {
    listeners: Mutex<ListenerSet<Registered>>,
}

impl ReducerEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_reducer(&self, reducer: ReducerName, listener: ReducerListener) -> ListenerId {
        let id = ListenerId::next();
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.insert(id, Registered { reducer, listener });
        }
        id
    }

    /// Returns whether the listener was still registered. A listener removed
    /// while its event is being delivered will not fire again.
    pub fn remove(&self, id: ListenerId) -> bool {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.remove(id),
            Err(_) => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn publish(&self, event: &ReducerEvent) {
        let matching = match self.listeners.lock() {
            Ok(mut listeners) => listeners.take_matching(|r| r.reducer == event.reducer),
            Err(_) => return,
        };

        log::debug!("[ReducerEvents] {} -> {:?} ({} listeners)", event.reducer, event.status, matching.len());

        let delivered: Vec<_> = matching
            .into_iter()
            .map(|(id, mut registered)| match (registered.listener)(event) {
                ListenerControl::Keep => (id, Some(registered)),
                ListenerControl::Remove => (id, None),
            })
            .collect();

        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.restore(delivered);
        }
    }
}
