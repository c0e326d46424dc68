//! Drag gesture lifecycle.
//!
//! A `DragSession` holds at most one `DraggedItemInfo`. Picking up creates
//! it, and dropping or cancelling consumes it, so a carried item can only
//! be dispatched once. A short grace window after each drop suppresses the
//! context-menu quick-move some input devices fire right after a release.

use std::time::{Duration, Instant};

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::models::{DraggedItemInfo, SlotReference};
use crate::remote::ReducerCall;
use crate::transfer_dispatch::TransferDispatcher;

#[derive(Clone, Debug, PartialEq)]
pub enum DropTarget {
    Slot(SlotReference),
    /// Released over open ground.
    World,
}

pub struct DragSession {
    dragged: Option<DraggedItemInfo>,
    last_drop_at: Option<Instant>,
    grace_window: Duration,
}

impl DragSession {
    pub fn new(grace_window: Duration) -> Self {
        DragSession { dragged: None, last_drop_at: None, grace_window }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.drop_grace_window)
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged.is_some()
    }

    pub fn dragged(&self) -> Option<&DraggedItemInfo> {
        self.dragged.as_ref()
    }

    /// Starts carrying `item`. A previous, never-dropped item is discarded.
    pub fn pick_up(&mut self, item: DraggedItemInfo) {
        if let Some(previous) = self.dragged.replace(item) {
            log::debug!(
                "[DragDrop] Replacing unfinished drag of item {}",
                previous.item.instance.instance_id
            );
        }
    }

    /// Released without a valid target: nothing is committed.
    pub fn cancel(&mut self) -> Option<DraggedItemInfo> {
        let cancelled = self.dragged.take();
        if let Some(item) = &cancelled {
            log::debug!("[DragDrop] Drag of item {} cancelled", item.item.instance.instance_id);
        }
        cancelled
    }

    /// Consumes the carried item and dispatches it. Returns Ok(None) when
    /// nothing was being dragged.
    pub fn drop_on(
        &mut self,
        target: &DropTarget,
        dispatcher: &TransferDispatcher,
        now: Instant,
    ) -> Result<Option<ReducerCall>, DispatchError> {
        let Some(dragged) = self.dragged.take() else {
            return Ok(None);
        };
        self.last_drop_at = Some(now);
        dispatcher.dispatch_drop(&dragged, target).map(Some)
    }

    /// Whether a context-menu quick-move at `now` is a genuine gesture and
    /// not the tail of the drop that just happened.
    pub fn quick_move_allowed(&self, now: Instant) -> bool {
        match self.last_drop_at {
            Some(dropped) => now.saturating_duration_since(dropped) >= self.grace_window,
            None => true,
        }
    }

    /// Runs `quick_move` unless it falls inside the post-drop grace window.
    pub fn guard_quick_move<T>(
        &self,
        now: Instant,
        quick_move: impl FnOnce() -> Result<T, DispatchError>,
    ) -> Result<Option<T>, DispatchError> {
        if !self.quick_move_allowed(now) {
            log::debug!("[DragDrop] Ignoring quick-move inside the post-drop grace window");
            return Ok(None);
        }
        quick_move().map(Some)
    }
}
