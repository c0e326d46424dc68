/******************************************************************************
 *                                                                            *
 * Turns drag-and-drop gestures into container reducer calls. Handles the    *
 * four directions (player -> container, container -> player, within one     *
 * container, container -> world) for whole stacks and for splits. Every id,  *
 * index and quantity is coerced and range-checked before anything is sent;   *
 * any failure is logged, forwarded to the error callback and returned.       *
 *                                                                            *
 ******************************************************************************/

use std::sync::Arc;

use crate::coercion::{coerce_quantity, coerce_u32, coerce_u64, coerce_u8, RawNumber};
use crate::container_entities::{BoxKind, ContainerEntity};
use crate::drag_drop::DropTarget;
use crate::error::{DispatchError, ErrorCallback};
use crate::models::{ContainerType, DraggedItemInfo, SlotReference, SlotType};
use crate::reducer_names::{resolve, ArgSlot, OperationKind, ReducerTarget, ResolvedReducer};
use crate::remote::{ReducerArg, ReducerCall, ReducerInvoker};

/// The container whose panel the player currently has open. Supplies the
/// container id when a slot reference lacks one, plus the per-entity
/// details (box subtype, stash visibility) that steer dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionTarget {
    pub container_type: ContainerType,
    pub container_id: u64,
    pub box_kind: BoxKind,
    pub is_hidden_stash: bool,
}

impl InteractionTarget {
    pub fn new(container_type: ContainerType, container_id: u64) -> Self {
        InteractionTarget { container_type, container_id, box_kind: BoxKind::Plain, is_hidden_stash: false }
    }

    pub fn from_entity(entity: &ContainerEntity) -> Self {
        InteractionTarget {
            container_type: entity.container_type(),
            container_id: entity.id(),
            box_kind: entity.box_kind().unwrap_or(BoxKind::Plain),
            is_hidden_stash: matches!(entity, ContainerEntity::Stash(stash) if stash.is_hidden),
        }
    }
}

/// Values available to fill a reducer's argument layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArgValues {
    pub container_id: Option<u64>,
    pub slot_index: Option<u8>,
    pub item_instance_id: Option<u64>,
    pub quantity: Option<u32>,
    pub target_slot_type: Option<&'static str>,
    pub target_slot_index: Option<u32>,
    pub source_index: Option<u8>,
    pub target_index: Option<u8>,
}

pub struct TransferDispatcher {
    invoker: Arc<dyn ReducerInvoker>,
    interaction_target: Option<InteractionTarget>,
    on_error: Option<ErrorCallback>,
}

impl TransferDispatcher {
    pub fn new(invoker: Arc<dyn ReducerInvoker>) -> Self {
        TransferDispatcher { invoker, interaction_target: None, on_error: None }
    }

    pub fn with_error_callback(mut self, on_error: ErrorCallback) -> Self {
        self.on_error = Some(on_error);
        self
    }

    pub fn set_interaction_target(&mut self, target: Option<InteractionTarget>) {
        self.interaction_target = target;
    }

    pub fn interaction_target(&self) -> Option<&InteractionTarget> {
        self.interaction_target.as_ref()
    }

    pub fn invoker(&self) -> &Arc<dyn ReducerInvoker> {
        &self.invoker
    }

    // --- Gestures ---

    /// Player inventory/hotbar -> container slot, whole stack or split.
    pub fn move_to_container(
        &self,
        dragged: &DraggedItemInfo,
        target: &SlotReference,
    ) -> Result<ReducerCall, DispatchError> {
        self.report(self.try_move_to_container(dragged, target))
    }

    /// Container slot -> player inventory/hotbar, whole stack or split.
    pub fn move_to_player(&self, dragged: &DraggedItemInfo, target: &SlotReference) -> Result<ReducerCall, DispatchError> {
        self.report(self.try_move_to_player(dragged, target))
    }

    /// Slot -> slot inside one container. Different containers, even of the
    /// same type, are always rejected.
    pub fn move_within_container(
        &self,
        dragged: &DraggedItemInfo,
        target: &SlotReference,
    ) -> Result<ReducerCall, DispatchError> {
        self.report(self.try_move_within(dragged, target))
    }

    /// Container slot -> world.
    pub fn drop_to_world(&self, dragged: &DraggedItemInfo) -> Result<ReducerCall, DispatchError> {
        self.report(self.try_drop_to_world(dragged))
    }

    /// Routes a finished drag to the matching direction.
    pub fn dispatch_drop(&self, dragged: &DraggedItemInfo, target: &DropTarget) -> Result<ReducerCall, DispatchError> {
        let source_is_player = dragged.source_slot.slot_type.is_player_slot();
        match target {
            DropTarget::World if source_is_player => self.report(Err(DispatchError::NotContainerTransfer)),
            DropTarget::World => self.drop_to_world(dragged),
            DropTarget::Slot(slot) => match (source_is_player, slot.slot_type.is_player_slot()) {
                (true, true) => self.report(Err(DispatchError::NotContainerTransfer)),
                (true, false) => self.move_to_container(dragged, slot),
                (false, true) => self.move_to_player(dragged, slot),
                (false, false) => self.move_within_container(dragged, slot),
            },
        }
    }

    /// Resolves `(target, op)`, fills its layout from `values` and sends it.
    /// Errors go through the same logging and callback path as gestures.
    pub fn dispatch_operation(
        &self,
        target: ReducerTarget,
        op: OperationKind,
        values: &ArgValues,
    ) -> Result<ReducerCall, DispatchError> {
        self.report(self.send(target, op, values))
    }

    // --- Direction implementations ---

    fn try_move_to_container(&self, dragged: &DraggedItemInfo, target: &SlotReference) -> Result<ReducerCall, DispatchError> {
        let container_type = target.slot_type.container_type().ok_or(DispatchError::NotContainerTransfer)?;
        let split = validate_split(dragged)?;
        let container_id = self.container_id_for(container_type, target.parent_id.as_ref())?;
        let slot_index = checked_slot_index(&target.slot_type, &target.index)?;

        if container_type == ContainerType::Stash && self.is_hidden_stash(container_id) {
            return Err(DispatchError::HiddenStash(container_id));
        }

        let reducer_target = self.deposit_target(&target.slot_type, container_id);
        let values = ArgValues {
            container_id: Some(container_id),
            slot_index: Some(slot_index),
            item_instance_id: Some(dragged.item.instance.instance_id),
            quantity: split,
            ..ArgValues::default()
        };
        let op = if split.is_some() { OperationKind::SplitFromPlayer } else { OperationKind::MoveFromPlayer };
        self.send(reducer_target, op, &values)
    }

    fn try_move_to_player(&self, dragged: &DraggedItemInfo, target: &SlotReference) -> Result<ReducerCall, DispatchError> {
        let source = &dragged.source_slot;
        let container_type = source.slot_type.container_type().ok_or(DispatchError::NotContainerTransfer)?;
        if !target.slot_type.is_player_slot() {
            return Err(DispatchError::NotContainerTransfer);
        }
        let split = validate_split(dragged)?;
        let container_id = self.container_id_for(container_type, source.parent_id.as_ref())?;
        let slot_index = checked_slot_index(&source.slot_type, &source.index)?;
        let target_slot_index = checked_player_index(&target.slot_type, &target.index)?;

        let values = ArgValues {
            container_id: Some(container_id),
            slot_index: Some(slot_index),
            quantity: split,
            target_slot_type: Some(target.slot_type.tag()),
            target_slot_index: Some(target_slot_index),
            ..ArgValues::default()
        };
        let op = if split.is_some() { OperationKind::SplitToPlayer } else { OperationKind::MoveToPlayer };
        self.send(base_target(&source.slot_type), op, &values)
    }

    fn try_move_within(&self, dragged: &DraggedItemInfo, target: &SlotReference) -> Result<ReducerCall, DispatchError> {
        let source = &dragged.source_slot;
        let container_type = source.slot_type.container_type().ok_or(DispatchError::NotContainerTransfer)?;
        let split = validate_split(dragged)?;
        let op = if split.is_some() { OperationKind::SplitWithin } else { OperationKind::MoveWithin };
        let source_id = self.container_id_for(container_type, source.parent_id.as_ref())?;

        if target.slot_type.container_type() != Some(container_type) {
            return Err(DispatchError::CrossContainer {
                source_id: format!("{}:{}", source.slot_type.tag(), source_id),
                target_id: format!("{}:{}", target.slot_type.tag(), display_raw(target.parent_id.as_ref())),
            });
        }
        let target_id = self.container_id_for(container_type, target.parent_id.as_ref())?;
        if source_id != target_id {
            return Err(DispatchError::CrossContainer {
                source_id: source_id.to_string(),
                target_id: target_id.to_string(),
            });
        }
        // Same pot, different sub-slot: no reducer moves between them.
        if source.slot_type != target.slot_type {
            return Err(DispatchError::Unsupported { target: base_target(&target.slot_type), op });
        }

        let source_index = checked_slot_index(&source.slot_type, &source.index)?;
        let target_index = checked_slot_index(&target.slot_type, &target.index)?;
        let values = ArgValues {
            container_id: Some(source_id),
            quantity: split,
            source_index: Some(source_index),
            target_index: Some(target_index),
            ..ArgValues::default()
        };
        self.send(base_target(&source.slot_type), op, &values)
    }

    fn try_drop_to_world(&self, dragged: &DraggedItemInfo) -> Result<ReducerCall, DispatchError> {
        let source = &dragged.source_slot;
        let container_type = source.slot_type.container_type().ok_or(DispatchError::NotContainerTransfer)?;
        let split = validate_split(dragged)?;
        // A whole-stack drop still needs a positive quantity to be meaningful.
        coerce_quantity("quantity", &RawNumber::from(dragged.item.instance.quantity))?;
        let container_id = self.container_id_for(container_type, source.parent_id.as_ref())?;
        let slot_index = checked_slot_index(&source.slot_type, &source.index)?;

        let values = ArgValues {
            container_id: Some(container_id),
            slot_index: Some(slot_index),
            quantity: split,
            ..ArgValues::default()
        };
        let op = if split.is_some() { OperationKind::SplitDropToWorld } else { OperationKind::DropToWorld };
        self.send(base_target(&source.slot_type), op, &values)
    }

    // --- Shared plumbing ---

    /// Coerces a slot's parent id, falling back to the open container when
    /// the slot carries none. Fumarole ids are 64-bit; the rest must fit u32.
    pub(crate) fn container_id_for(
        &self,
        container_type: ContainerType,
        parent_id: Option<&RawNumber>,
    ) -> Result<u64, DispatchError> {
        match parent_id {
            Some(raw) => Ok(coerce_container_id(container_type, raw)?),
            None => match &self.interaction_target {
                Some(open) if open.container_type == container_type => Ok(open.container_id),
                _ => Err(DispatchError::NoContainerId),
            },
        }
    }

    fn is_hidden_stash(&self, stash_id: u64) -> bool {
        matches!(&self.interaction_target, Some(open)
            if open.container_type == ContainerType::Stash && open.container_id == stash_id && open.is_hidden_stash)
    }

    /// Deposits into box subtypes go through the subtype's own reducers.
    pub(crate) fn deposit_target(&self, slot_type: &SlotType, container_id: u64) -> ReducerTarget {
        if *slot_type == SlotType::Container(ContainerType::WoodenStorageBox) {
            if let Some(open) = &self.interaction_target {
                if open.container_type == ContainerType::WoodenStorageBox
                    && open.container_id == container_id
                    && open.box_kind != BoxKind::Plain
                {
                    return ReducerTarget::BoxVariant(open.box_kind);
                }
            }
        }
        base_target(slot_type)
    }

    pub(crate) fn send(
        &self,
        target: ReducerTarget,
        op: OperationKind,
        values: &ArgValues,
    ) -> Result<ReducerCall, DispatchError> {
        let resolved = resolve(target, op).ok_or(DispatchError::Unsupported { target, op })?;
        if !self.invoker.knows_reducer(&resolved.name) {
            return Err(DispatchError::MissingReducer(resolved.name));
        }
        let args = fill_args(&resolved, target, op, values)?;
        let call = ReducerCall::new(resolved.name, args);

        log::info!("[TransferDispatch] {:?} on {} -> {}({:?})", op, target, call.reducer, call.args);
        self.invoker.invoke(call.clone()).map_err(|reason| DispatchError::Remote {
            reducer: call.reducer.clone(),
            reason,
        })?;
        Ok(call)
    }

    /// Logs and forwards an error to the callback, then hands the result back.
    pub(crate) fn report<T>(&self, result: Result<T, DispatchError>) -> Result<T, DispatchError> {
        if let Err(e) = &result {
            log::error!("[TransferDispatch] {} ({:?})", e, e.kind());
            if let Some(on_error) = &self.on_error {
                on_error(e);
            }
        }
        result
    }
}

pub(crate) fn coerce_container_id(container_type: ContainerType, raw: &RawNumber) -> Result<u64, DispatchError> {
    let id = match container_type {
        ContainerType::Fumarole => coerce_u64("container_id", raw)?,
        _ => coerce_u32("container_id", raw)? as u64,
    };
    Ok(id)
}

/// The reducer target for non-deposit operations on a slot.
pub(crate) fn base_target(slot_type: &SlotType) -> ReducerTarget {
    match slot_type {
        SlotType::BrothPotWaterContainer => ReducerTarget::BrothPotWaterContainer,
        SlotType::BrothPotOutput => ReducerTarget::BrothPotOutput,
        SlotType::Container(t) => ReducerTarget::Container(*t),
        // Player slots never reach here; callers check container_type() first.
        SlotType::Inventory | SlotType::Hotbar => ReducerTarget::Container(ContainerType::WoodenStorageBox),
    }
}

/// A split must be at least one and strictly less than the dragged stack.
fn validate_split(dragged: &DraggedItemInfo) -> Result<Option<u32>, DispatchError> {
    let Some(raw) = &dragged.split_quantity else {
        return Ok(None);
    };
    let requested = coerce_quantity("split_quantity", raw)?;
    let available = dragged.item.instance.quantity;
    if requested >= available {
        return Err(DispatchError::SplitExceedsStack { requested, available });
    }
    Ok(Some(requested))
}

pub(crate) fn checked_slot_index(slot_type: &SlotType, raw: &RawNumber) -> Result<u8, DispatchError> {
    let index = coerce_u8("slot_index", raw)?;
    let slot_count = slot_type.slot_count();
    if index as u32 >= slot_count {
        return Err(DispatchError::SlotOutOfRange { index: index as u32, slot_count });
    }
    Ok(index)
}

fn checked_player_index(slot_type: &SlotType, raw: &RawNumber) -> Result<u32, DispatchError> {
    let index = coerce_u32("target_slot_index", raw)?;
    let slot_count = slot_type.slot_count();
    if index >= slot_count {
        return Err(DispatchError::SlotOutOfRange { index, slot_count });
    }
    Ok(index)
}

fn display_raw(raw: Option<&RawNumber>) -> String {
    raw.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
}

fn fill_args(
    resolved: &ResolvedReducer,
    target: ReducerTarget,
    op: OperationKind,
    values: &ArgValues,
) -> Result<Vec<ReducerArg>, DispatchError> {
    let missing = || DispatchError::Unsupported { target, op };
    resolved
        .args
        .iter()
        .map(|slot| match slot {
            ArgSlot::ContainerId => {
                let id = values.container_id.ok_or_else(missing)?;
                Ok(match target.container_type() {
                    ContainerType::Fumarole => ReducerArg::U64(id),
                    _ => ReducerArg::U32(id as u32),
                })
            }
            ArgSlot::SlotIndex => values.slot_index.map(ReducerArg::U8).ok_or_else(missing),
            ArgSlot::ItemInstanceId => values.item_instance_id.map(ReducerArg::U64).ok_or_else(missing),
            ArgSlot::Quantity => values.quantity.map(ReducerArg::U32).ok_or_else(missing),
            ArgSlot::TargetSlotType => values
                .target_slot_type
                .map(|t| ReducerArg::Str(t.to_string()))
                .ok_or_else(missing),
            ArgSlot::TargetSlotIndex => values.target_slot_index.map(ReducerArg::U32).ok_or_else(missing),
            ArgSlot::SourceIndex => values.source_index.map(ReducerArg::U8).ok_or_else(missing),
            ArgSlot::TargetIndex => values.target_index.map(ReducerArg::U8).ok_or_else(missing),
        })
        .collect()
}
