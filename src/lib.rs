//! Client-side container dispatch for the Broth & Bullets world.
//!
//! Turns inventory gestures (drag, drop, split, quick-move, toggle) on
//! in-world containers into the right reducer calls, and keeps the hearth
//! upkeep view in sync with the server.

// Data model and addressing
pub mod models;
pub mod coercion;
pub mod container_registry;
pub mod container_entities;

// Reducer naming and the remote boundary
pub mod reducer_names;
pub mod remote;
pub mod remote_http;
pub mod table_cache;

// Dispatch
pub mod transfer_dispatch;
pub mod quick_move;
pub mod drag_drop;

// Per-container rules
pub mod fuel_enhancement;
pub mod ignition;
pub mod stash;
pub mod building_privilege;
pub mod hearth_upkeep;

pub mod config;
pub mod error;

#[cfg(test)]
mod test_support;

pub use config::DispatchConfig;
pub use container_entities::{ContainerEntity, ItemContainer};
pub use drag_drop::{DragSession, DropTarget};
pub use error::{DispatchError, ErrorCallback, ErrorKind};
pub use models::{ContainerType, DraggedItemInfo, SlotReference, SlotType};
pub use reducer_names::{OperationKind, ReducerName, ReducerTarget};
pub use remote::{ReducerCall, ReducerEventBus, ReducerInvoker};
pub use remote_http::HttpReducerInvoker;
pub use transfer_dispatch::{InteractionTarget, TransferDispatcher};
