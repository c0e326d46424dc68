//! Shared doubles for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::models::{
    DraggedItemInfo, InventoryItem, ItemCategory, ItemDefinition, ItemLocation, PopulatedItem, SlotReference,
};
use crate::reducer_names::ReducerName;
use crate::remote::{ReducerCall, ReducerInvoker};
use crate::table_cache::{SubscriptionHandle, TableSubscriber};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records every call instead of sending it.
#[derive(Default)]
pub struct RecordingInvoker {
    pub calls: Mutex<Vec<ReducerCall>>,
    pub unknown: Mutex<HashSet<String>>,
    pub fail_with: Mutex<Option<String>>,
}

impl RecordingInvoker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn without(names: &[&str]) -> Arc<Self> {
        let invoker = Self::default();
        if let Ok(mut unknown) = invoker.unknown.lock() {
            unknown.extend(names.iter().map(|n| n.to_string()));
        }
        Arc::new(invoker)
    }

    pub fn calls(&self) -> Vec<ReducerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.reducer.to_string()).collect()
    }

    pub fn last(&self) -> Option<ReducerCall> {
        self.calls().last().cloned()
    }

    pub fn count_of(&self, name: &str) -> usize {
        self.names().iter().filter(|n| n.as_str() == name).count()
    }

    pub fn fail_next_with(&self, reason: &str) {
        *self.fail_with.lock().unwrap() = Some(reason.to_string());
    }
}

impl ReducerInvoker for RecordingInvoker {
    fn knows_reducer(&self, reducer: &ReducerName) -> bool {
        !self.unknown.lock().unwrap().contains(reducer.as_str())
    }

    fn invoke(&self, call: ReducerCall) -> Result<(), String> {
        if let Some(reason) = self.fail_with.lock().unwrap().take() {
            return Err(reason);
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

/// Tracks open subscriptions by query.
#[derive(Default)]
pub struct RecordingSubscriber {
    pub queries: Mutex<Vec<String>>,
    pub active: Arc<AtomicUsize>,
}

struct RecordingHandle {
    active: Arc<AtomicUsize>,
    released: AtomicBool,
}

impl SubscriptionHandle for RecordingHandle {
    fn unsubscribe(self: Box<Self>) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl RecordingSubscriber {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl TableSubscriber for RecordingSubscriber {
    fn subscribe(&self, query: &str) -> Box<dyn SubscriptionHandle> {
        self.queries.lock().unwrap().push(query.to_string());
        self.active.fetch_add(1, Ordering::SeqCst);
        Box::new(RecordingHandle { active: self.active.clone(), released: AtomicBool::new(false) })
    }
}

// --- Item fixtures ---

pub fn definition(id: u64, name: &str) -> ItemDefinition {
    ItemDefinition {
        id,
        name: name.to_string(),
        category: ItemCategory::Material,
        is_stackable: true,
        stack_size: 100,
        fuel_burn_duration_secs: None,
        cook_time_secs: None,
    }
}

pub fn instance(instance_id: u64, item_def_id: u64, quantity: u32) -> InventoryItem {
    InventoryItem {
        instance_id,
        item_def_id,
        quantity,
        location: ItemLocation::Inventory { owner_id: "c0ffee".to_string(), slot_index: 0 },
    }
}

pub fn populated(instance_id: u64, name: &str, quantity: u32) -> PopulatedItem {
    PopulatedItem { instance: instance(instance_id, instance_id + 500, quantity), definition: definition(instance_id + 500, name) }
}

pub fn dragged(instance_id: u64, quantity: u32, source: SlotReference) -> DraggedItemInfo {
    DraggedItemInfo::whole_stack(populated(instance_id, "Wood", quantity), source)
}
