/******************************************************************************
 *                                                                            *
 * Debounced building-privilege grant/revoke for the hearth panel. One       *
 * request may be in flight per toggle. A one-shot commit handler keyed by   *
 * the target is registered before the call goes out, and a timeout clears  *
 * the in-flight state if no commit event ever arrives.                      *
 *                                                                            *
 ******************************************************************************/

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::{DispatchError, ErrorCallback};
use crate::reducer_names::{ReducerName, GRANT_BUILDING_PRIVILEGE_FROM_HEARTH, REVOKE_PLAYER_BUILDING_PRIVILEGE};
use crate::remote::{CommitStatus, ListenerControl, ListenerId, ReducerArg, ReducerCall, ReducerEventBus, ReducerInvoker};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrivilegeRequest {
    Sent,
    /// A previous request is still waiting for its commit event.
    Suppressed,
}

struct Pending {
    listener: ListenerId,
    timeout: Option<JoinHandle<()>>,
}

type SharedErrorCallback = Arc<dyn Fn(&DispatchError) + Send + Sync>;

/// Owned by one privilege control; dropping it tears down any pending
/// handler and timeout.
pub struct PrivilegeToggle {
    invoker: Arc<dyn ReducerInvoker>,
    events: Arc<ReducerEventBus>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<Pending>>,
    on_error: Option<SharedErrorCallback>,
}

impl PrivilegeToggle {
    pub fn new(invoker: Arc<dyn ReducerInvoker>, events: Arc<ReducerEventBus>, timeout: Duration) -> Self {
        PrivilegeToggle {
            invoker,
            events,
            timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
            on_error: None,
        }
    }

    pub fn with_error_callback(mut self, on_error: ErrorCallback) -> Self {
        self.on_error = Some(Arc::from(on_error));
        self
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Grants the caller building privilege at `hearth_id`.
    pub fn grant(&self, hearth_id: u32) -> Result<PrivilegeRequest, DispatchError> {
        self.request(
            GRANT_BUILDING_PRIVILEGE_FROM_HEARTH,
            vec![ReducerArg::U32(hearth_id)],
            0,
        )
    }

    /// Revokes `target_player`'s (hex identity) privilege at `hearth_id`.
    pub fn revoke(&self, hearth_id: u32, target_player: &str) -> Result<PrivilegeRequest, DispatchError> {
        self.request(
            REVOKE_PLAYER_BUILDING_PRIVILEGE,
            vec![ReducerArg::U32(hearth_id), ReducerArg::Identity(target_player.to_string())],
            1,
        )
    }

    /// `key_position` picks the argument the commit handler matches on.
    fn request(
        &self,
        reducer: &str,
        args: Vec<ReducerArg>,
        key_position: usize,
    ) -> Result<PrivilegeRequest, DispatchError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            log::debug!("[BuildingPrivilege] {} already in flight, ignoring", reducer);
            return Ok(PrivilegeRequest::Suppressed);
        }
        self.teardown_pending();

        let reducer = ReducerName::new(reducer);
        if !self.invoker.knows_reducer(&reducer) {
            self.in_flight.store(false, Ordering::SeqCst);
            return Err(self.report(DispatchError::MissingReducer(reducer)));
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let key = args.get(key_position).cloned();
        let listener = self.register_handler(reducer.clone(), key, key_position, generation);

        let call = ReducerCall::new(reducer.clone(), args);
        log::info!("[BuildingPrivilege] Invoking {}({:?})", call.reducer, call.args);
        if let Err(reason) = self.invoker.invoke(call) {
            self.events.remove(listener);
            self.in_flight.store(false, Ordering::SeqCst);
            return Err(self.report(DispatchError::Remote { reducer, reason }));
        }

        let timeout = self.spawn_timeout(listener, generation);
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(Pending { listener, timeout });
        }
        Ok(PrivilegeRequest::Sent)
    }

    fn register_handler(
        &self,
        reducer: ReducerName,
        key: Option<ReducerArg>,
        key_position: usize,
        generation: u64,
    ) -> ListenerId {
        let in_flight = self.in_flight.clone();
        let current = self.generation.clone();
        let on_error = self.on_error.clone();

        self.events.on_reducer(
            reducer.clone(),
            Box::new(move |event| {
                if event.args.get(key_position) != key.as_ref() {
                    return ListenerControl::Keep;
                }
                if current.load(Ordering::SeqCst) == generation {
                    in_flight.store(false, Ordering::SeqCst);
                }
                let reason = match &event.status {
                    CommitStatus::Committed => {
                        log::info!("[BuildingPrivilege] {} committed", reducer);
                        return ListenerControl::Remove;
                    }
                    CommitStatus::Failed(reason) => reason.clone(),
                    CommitStatus::OutOfEnergy => "out of energy".to_string(),
                };
                let error = DispatchError::Remote { reducer: reducer.clone(), reason };
                log::error!("[BuildingPrivilege] {}", error);
                if let Some(on_error) = &on_error {
                    on_error(&error);
                }
                ListenerControl::Remove
            }),
        )
    }

    fn spawn_timeout(&self, listener: ListenerId, generation: u64) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                log::warn!("[BuildingPrivilege] No runtime; request will not time out");
                return None;
            }
        };
        let in_flight = self.in_flight.clone();
        let current = self.generation.clone();
        let events = self.events.clone();
        let timeout = self.timeout;

        Some(runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            events.remove(listener);
            if current.load(Ordering::SeqCst) == generation && in_flight.swap(false, Ordering::SeqCst) {
                log::warn!("[BuildingPrivilege] No response after {:?}; clearing processing state", timeout);
            }
        }))
    }

    fn teardown_pending(&self) {
        let pending = self.pending.lock().ok().and_then(|mut p| p.take());
        if let Some(pending) = pending {
            self.events.remove(pending.listener);
            if let Some(timeout) = pending.timeout {
                timeout.abort();
            }
        }
    }

    fn report(&self, error: DispatchError) -> DispatchError {
        log::error!("[BuildingPrivilege] {}", error);
        if let Some(on_error) = &self.on_error {
            on_error(&error);
        }
        error
    }

    /// Drops any pending handler and timeout and clears the processing state.
    pub fn close(&self) {
        self.teardown_pending();
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

impl Drop for PrivilegeToggle {
    fn drop(&mut self) {
        self.close();
    }
}
