use thiserror::Error;

use crate::coercion::CoercionError;
use crate::reducer_names::{OperationKind, ReducerName, ReducerTarget};

/// The four ways a gesture can fail. Callers usually only branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An id, index or quantity was not a usable integer.
    Coercion,
    /// The resolved reducer does not exist on the connected module.
    MissingProcedure,
    /// Rejected locally before anything was sent.
    SemanticRejection,
    /// The reducer call threw, or its commit reported failure.
    RemoteRejection,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("reducer `{0}` is not available on the connected module")]
    MissingReducer(ReducerName),

    #[error("no reducer for {op:?} on {target}")]
    Unsupported { target: ReducerTarget, op: OperationKind },

    #[error("cannot move items between different containers ({source_id} -> {target_id})")]
    CrossContainer { source_id: String, target_id: String },

    #[error("no container id on the slot and no active interaction target")]
    NoContainerId,

    #[error("slot index {index} is out of range (container has {slot_count} slots)")]
    SlotOutOfRange { index: u32, slot_count: u32 },

    #[error("split quantity {requested} must be less than the stack quantity {available}")]
    SplitExceedsStack { requested: u32, available: u32 },

    #[error("stash {0} is hidden; surface it before depositing")]
    HiddenStash(u64),

    #[error("broth pot {0} is full")]
    PotFull(u64),

    #[error("the fumarole would destroy the item while its broth pot is full")]
    IncineratorBlocked,

    #[error("drop is not a container transfer")]
    NotContainerTransfer,

    #[error("{0}")]
    NotPermitted(String),

    #[error("reducer `{reducer}` failed: {reason}")]
    Remote { reducer: ReducerName, reason: String },
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Coercion(_) => ErrorKind::Coercion,
            DispatchError::MissingReducer(_) => ErrorKind::MissingProcedure,
            DispatchError::Remote { .. } => ErrorKind::RemoteRejection,
            DispatchError::Unsupported { .. }
            | DispatchError::CrossContainer { .. }
            | DispatchError::NoContainerId
            | DispatchError::SlotOutOfRange { .. }
            | DispatchError::SplitExceedsStack { .. }
            | DispatchError::HiddenStash(_)
            | DispatchError::PotFull(_)
            | DispatchError::IncineratorBlocked
            | DispatchError::NotContainerTransfer
            | DispatchError::NotPermitted(_) => ErrorKind::SemanticRejection,
        }
    }
}

/// Caller-supplied sink for user-facing errors.
pub type ErrorCallback = Box<dyn Fn(&DispatchError) + Send + Sync>;
