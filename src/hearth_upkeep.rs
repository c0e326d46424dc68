/******************************************************************************
 *                                                                            *
 * Hearth upkeep panel. The server answers `queryHearthUpkeepCosts` by       *
 * writing a row into `hearth_upkeep_query_result`; the panel keeps its view *
 * of that row current three ways: a filtered subscription feeding the       *
 * table cache, a periodic re-query while open, and a short delayed re-read  *
 * of the cache after each committed query, since the commit event and the  *
 * row update can arrive in either order.                                    *
 *                                                                            *
 ******************************************************************************/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::DispatchConfig;
use crate::reducer_names::{ReducerName, QUERY_HEARTH_UPKEEP_COSTS};
use crate::remote::{
    CommitStatus, ListenerControl, ListenerId, ReducerArg, ReducerCall, ReducerEventBus, ReducerInvoker,
};
use crate::table_cache::{RowChange, SubscriptionHandle, TableCache, TableRow, TableSubscriber};

pub const UPKEEP_TABLE: &str = "hearth_upkeep_query_result";

/// Server-written upkeep snapshot for one hearth.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HearthUpkeepQueryResult {
    pub hearth_id: u32,
    pub required_wood: u32,
    pub required_stone: u32,
    pub required_metal: u32,
    pub available_wood: u32,
    pub available_stone: u32,
    pub available_metal: u32,
    /// Hours until the first building decays; absent while protected.
    pub estimated_decay_hours: Option<f32>,
    pub last_updated: DateTime<Utc>,
}

impl TableRow for HearthUpkeepQueryResult {
    type Key = u32;

    fn primary_key(&self) -> u32 {
        self.hearth_id
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UpkeepStatus {
    NoUpkeepRequired,
    /// Stored resources cover this many upkeep periods.
    Protected { hours_covered: f32 },
    Insufficient { decay_in_hours: f32 },
}

impl UpkeepStatus {
    /// Finite only when buildings are actually decaying.
    pub fn decay_in_hours(&self) -> Option<f32> {
        match self {
            UpkeepStatus::Insufficient { decay_in_hours } => Some(*decay_in_hours),
            UpkeepStatus::NoUpkeepRequired | UpkeepStatus::Protected { .. } => None,
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, UpkeepStatus::Insufficient { .. })
    }
}

impl HearthUpkeepQueryResult {
    fn resources(&self) -> [(u32, u32); 3] {
        [
            (self.required_wood, self.available_wood),
            (self.required_stone, self.available_stone),
            (self.required_metal, self.available_metal),
        ]
    }

    pub fn status(&self) -> UpkeepStatus {
        let resources = self.resources();
        if resources.iter().all(|(required, _)| *required == 0) {
            return UpkeepStatus::NoUpkeepRequired;
        }

        let covered = resources.iter().all(|(required, available)| available >= required);
        if covered {
            let hours_covered = resources
                .iter()
                .filter(|(required, _)| *required > 0)
                .map(|(required, available)| *available as f32 / *required as f32)
                .fold(f32::INFINITY, f32::min);
            UpkeepStatus::Protected { hours_covered }
        } else {
            let decay_in_hours = self
                .estimated_decay_hours
                .filter(|hours| hours.is_finite() && *hours >= 0.0)
                .unwrap_or(0.0);
            UpkeepStatus::Insufficient { decay_in_hours }
        }
    }
}

pub fn upkeep_subscription_query(hearth_id: u32) -> String {
    format!("SELECT * FROM {} WHERE hearth_id = {}", UPKEEP_TABLE, hearth_id)
}

type UpkeepView = Arc<Mutex<Option<HearthUpkeepQueryResult>>>;

/// Upkeep state for one open hearth panel. Owns its subscription, listeners
/// and timers; `close` (or dropping the panel) releases all of them.
pub struct HearthUpkeepPanel {
    hearth_id: u32,
    view: UpkeepView,
    invoker: Arc<dyn ReducerInvoker>,
    cache: Arc<TableCache<HearthUpkeepQueryResult>>,
    events: Arc<ReducerEventBus>,
    subscription: Mutex<Option<Box<dyn SubscriptionHandle>>>,
    cache_listener: ListenerId,
    event_listener: ListenerId,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    rereads: Arc<Mutex<Vec<JoinHandle<()>>>>,
    closed: Arc<AtomicBool>,
}

impl HearthUpkeepPanel {
    /// Opens the panel: subscribes to the hearth's row, seeds the view from
    /// the cache, and starts polling (first query goes out immediately).
    /// Timers need a tokio runtime; without one only the subscription path runs.
    pub fn open(
        hearth_id: u32,
        invoker: Arc<dyn ReducerInvoker>,
        events: Arc<ReducerEventBus>,
        cache: Arc<TableCache<HearthUpkeepQueryResult>>,
        subscriber: &dyn TableSubscriber,
        config: &DispatchConfig,
    ) -> Self {
        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            log::warn!("[HearthUpkeep] No runtime; hearth {} will not poll", hearth_id);
        }

        let subscription = subscriber.subscribe(&upkeep_subscription_query(hearth_id));
        let view: UpkeepView = Arc::new(Mutex::new(cache.find(&hearth_id)));

        let cache_listener = {
            let view = view.clone();
            cache.on_change(Box::new(move |change: &RowChange<HearthUpkeepQueryResult>| {
                if change.row().hearth_id != hearth_id {
                    return;
                }
                if let Ok(mut view) = view.lock() {
                    *view = match change {
                        RowChange::Deleted(_) => None,
                        RowChange::Inserted(row) | RowChange::Updated { new: row, .. } => Some(row.clone()),
                    };
                }
            }))
        };

        let closed = Arc::new(AtomicBool::new(false));
        let rereads: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::new(Mutex::new(Vec::new()));
        let event_listener = {
            let closed = closed.clone();
            let view = view.clone();
            let cache = cache.clone();
            let rereads = rereads.clone();
            let runtime = runtime.clone();
            let delay = config.upkeep_reread_delay;
            events.on_reducer(
                ReducerName::new(QUERY_HEARTH_UPKEEP_COSTS),
                Box::new(move |event| {
                    // A close racing this delivery must not leave a re-read behind.
                    if closed.load(Ordering::SeqCst) {
                        return ListenerControl::Remove;
                    }
                    if event.args.first().and_then(ReducerArg::as_u64) != Some(hearth_id as u64) {
                        return ListenerControl::Keep;
                    }
                    match &event.status {
                        CommitStatus::Committed => {
                            if let Some(runtime) = &runtime {
                                let task = spawn_reread(runtime, hearth_id, delay, cache.clone(), view.clone());
                                if let Ok(mut rereads) = rereads.lock() {
                                    rereads.retain(|t| !t.is_finished());
                                    rereads.push(task);
                                }
                            }
                        }
                        CommitStatus::Failed(reason) => {
                            log::error!("[HearthUpkeep] Upkeep query for hearth {} failed: {}", hearth_id, reason);
                        }
                        CommitStatus::OutOfEnergy => {
                            log::error!("[HearthUpkeep] Upkeep query for hearth {} ran out of energy", hearth_id);
                        }
                    }
                    ListenerControl::Keep
                }),
            )
        };

        let poll_task = runtime.as_ref().and_then(|runtime| {
            let reducer = ReducerName::new(QUERY_HEARTH_UPKEEP_COSTS);
            if !invoker.knows_reducer(&reducer) {
                log::error!("[HearthUpkeep] Reducer {} is not available; not polling", reducer);
                return None;
            }
            Some(spawn_poll(runtime, hearth_id, config.upkeep_poll_interval, invoker.clone()))
        });

        log::debug!("[HearthUpkeep] Opened panel for hearth {}", hearth_id);
        HearthUpkeepPanel {
            hearth_id,
            view,
            invoker,
            cache,
            events,
            subscription: Mutex::new(Some(subscription)),
            cache_listener,
            event_listener,
            poll_task: Mutex::new(poll_task),
            rereads,
            closed,
        }
    }

    pub fn hearth_id(&self) -> u32 {
        self.hearth_id
    }

    /// The latest upkeep row seen for this hearth.
    pub fn result(&self) -> Option<HearthUpkeepQueryResult> {
        self.view.lock().ok().and_then(|view| view.clone())
    }

    pub fn status(&self) -> Option<UpkeepStatus> {
        self.result().map(|result| result.status())
    }

    /// Re-issues the upkeep query now, outside the polling schedule.
    pub fn refresh(&self) -> Result<(), String> {
        if self.is_closed() {
            return Ok(());
        }
        query_upkeep(self.invoker.as_ref(), self.hearth_id)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops polling, aborts pending re-reads, releases the subscription and
    /// removes both listeners. Safe to call more than once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.poll_task.lock().ok().and_then(|mut t| t.take()) {
            task.abort();
        }
        if let Ok(mut rereads) = self.rereads.lock() {
            for task in rereads.drain(..) {
                task.abort();
            }
        }
        if let Some(subscription) = self.subscription.lock().ok().and_then(|mut s| s.take()) {
            subscription.unsubscribe();
        }
        self.cache.remove_listener(self.cache_listener);
        self.events.remove(self.event_listener);
        log::debug!("[HearthUpkeep] Closed panel for hearth {}", self.hearth_id);
    }
}

impl Drop for HearthUpkeepPanel {
    fn drop(&mut self) {
        self.close();
    }
}

fn query_upkeep(invoker: &dyn ReducerInvoker, hearth_id: u32) -> Result<(), String> {
    let call = ReducerCall::new(ReducerName::new(QUERY_HEARTH_UPKEEP_COSTS), vec![ReducerArg::U32(hearth_id)]);
    log::debug!("[HearthUpkeep] Querying upkeep for hearth {}", hearth_id);
    invoker.invoke(call).map_err(|reason| {
        log::error!("[HearthUpkeep] Failed to query upkeep for hearth {}: {}", hearth_id, reason);
        reason
    })
}

fn spawn_poll(runtime: &Handle, hearth_id: u32, every: Duration, invoker: Arc<dyn ReducerInvoker>) -> JoinHandle<()> {
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            // Failures are logged; the next tick is the retry.
            let _ = query_upkeep(invoker.as_ref(), hearth_id);
        }
    })
}

fn spawn_reread(
    runtime: &Handle,
    hearth_id: u32,
    delay: Duration,
    cache: Arc<TableCache<HearthUpkeepQueryResult>>,
    view: UpkeepView,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(row) = cache.find(&hearth_id) else {
            return;
        };
        if let Ok(mut view) = view.lock() {
            if view.as_ref() != Some(&row) {
                log::debug!("[HearthUpkeep] Re-read picked up a missed update for hearth {}", hearth_id);
                *view = Some(row);
            }
        }
    })
}
