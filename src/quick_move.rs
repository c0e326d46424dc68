/******************************************************************************
 *                                                                            *
 * One-click transfers. Withdrawing is a straight lookup from the slot to    *
 * its container's quick-move reducer. Depositing first decides where the    *
 * item should really go: a broth pot sitting on a campfire, furnace or       *
 * fumarole takes water containers and ingredients ahead of the burner, and  *
 * storage boxes branch on their subtype.                                    *
 *                                                                            *
 ******************************************************************************/

use crate::container_entities::{BoxKind, BrothPotRecord, ContainerEntity};
use crate::error::DispatchError;
use crate::models::{ContainerType, PopulatedItem, SlotReference};
use crate::reducer_names::{OperationKind, ReducerTarget};
use crate::remote::ReducerCall;
use crate::transfer_dispatch::{base_target, checked_slot_index, ArgValues, TransferDispatcher};

/// Items that carry water rather than being cooked.
pub const WATER_CONTAINER_ITEM_NAMES: [&str; 2] = ["Reed Water Bottle", "Plastic Water Jug"];

pub fn is_water_container(item: &PopulatedItem) -> bool {
    WATER_CONTAINER_ITEM_NAMES.contains(&item.definition.name.as_str())
}

/// A broth pot sitting on the container being deposited into, with its
/// ingredient slots already resolved against the item cache.
#[derive(Clone, Debug)]
pub struct AttachedPot<'a> {
    pub record: &'a BrothPotRecord,
    pub ingredients: Vec<Option<PopulatedItem>>,
}

impl AttachedPot<'_> {
    /// Hosts name their pot; campfire pots also point back at the campfire.
    fn is_attached_to(&self, container: &ContainerEntity) -> bool {
        if container.attached_broth_pot_id() == Some(self.record.id) {
            return true;
        }
        match container {
            ContainerEntity::Campfire(c) => self.record.attached_to_campfire_id == Some(c.id),
            _ => false,
        }
    }

    /// An empty ingredient slot, or a stack of the same kind with space left.
    pub fn has_room_for(&self, item: &PopulatedItem) -> bool {
        self.ingredients.iter().any(|slot| match slot {
            None => true,
            Some(existing) => {
                existing.definition.id == item.definition.id
                    && existing.definition.is_stackable
                    && existing.instance.quantity < existing.definition.stack_size
            }
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum QuickMoveRoute {
    PotWaterContainer { pot_id: u64 },
    PotIngredients { pot_id: u64 },
    Container { target: ReducerTarget, container_id: u64 },
}

impl QuickMoveRoute {
    pub fn target(&self) -> ReducerTarget {
        match self {
            QuickMoveRoute::PotWaterContainer { .. } => ReducerTarget::BrothPotWaterContainer,
            QuickMoveRoute::PotIngredients { .. } => ReducerTarget::Container(ContainerType::BrothPot),
            QuickMoveRoute::Container { target, .. } => *target,
        }
    }

    pub fn container_id(&self) -> u64 {
        match self {
            QuickMoveRoute::PotWaterContainer { pot_id } | QuickMoveRoute::PotIngredients { pot_id } => *pot_id,
            QuickMoveRoute::Container { container_id, .. } => *container_id,
        }
    }
}

/// Decides where a one-click deposit of `item` into `container` lands.
pub fn route_quick_move(
    item: &PopulatedItem,
    container: &ContainerEntity,
    pot: Option<&AttachedPot<'_>>,
) -> Result<QuickMoveRoute, DispatchError> {
    let container_type = container.container_type();
    let container_id = container.id();

    let pot_host = matches!(
        container_type,
        ContainerType::Campfire | ContainerType::Furnace | ContainerType::Fumarole
    );
    if let Some(pot) = pot.filter(|p| pot_host && p.is_attached_to(container)) {
        let pot_id = pot.record.id as u64;
        if is_water_container(item) && pot.record.water_container_instance_id().is_none() {
            log::debug!("[QuickMove] Water container {} -> broth pot {} water slot", item.instance.instance_id, pot_id);
            return Ok(QuickMoveRoute::PotWaterContainer { pot_id });
        }
        if pot.has_room_for(item) {
            log::debug!("[QuickMove] Item {} -> broth pot {} ingredients", item.instance.instance_id, pot_id);
            return Ok(QuickMoveRoute::PotIngredients { pot_id });
        }
        if container_type == ContainerType::Fumarole {
            // Falling through would incinerate the item.
            return Err(DispatchError::IncineratorBlocked);
        }
        log::debug!("[QuickMove] Broth pot {} full, depositing into {} {}", pot_id, container_type.tag(), container_id);
    }

    let target = match container {
        ContainerEntity::Stash(stash) if stash.is_hidden => return Err(DispatchError::HiddenStash(container_id)),
        ContainerEntity::WoodenStorageBox(_) => match container.box_kind() {
            Some(BoxKind::Plain) | None => ReducerTarget::Container(ContainerType::WoodenStorageBox),
            Some(kind) => ReducerTarget::BoxVariant(kind),
        },
        _ => ReducerTarget::Container(container_type),
    };
    Ok(QuickMoveRoute::Container { target, container_id })
}

/// One-click deposit from the player's inventory or hotbar.
pub fn quick_move_to_container(
    dispatcher: &TransferDispatcher,
    item: &PopulatedItem,
    container: &ContainerEntity,
    pot: Option<&AttachedPot<'_>>,
) -> Result<ReducerCall, DispatchError> {
    let route = dispatcher.report(route_quick_move(item, container, pot))?;
    let values = ArgValues {
        container_id: Some(route.container_id()),
        item_instance_id: Some(item.instance.instance_id),
        ..ArgValues::default()
    };
    dispatcher.dispatch_operation(route.target(), OperationKind::QuickMoveTo, &values)
}

/// One-click withdraw of whatever sits in `slot`.
pub fn quick_move_to_player(dispatcher: &TransferDispatcher, slot: &SlotReference) -> Result<ReducerCall, DispatchError> {
    let values = dispatcher.report(quick_move_from_values(dispatcher, slot))?;
    dispatcher.dispatch_operation(base_target(&slot.slot_type), OperationKind::QuickMoveFrom, &values)
}

fn quick_move_from_values(dispatcher: &TransferDispatcher, slot: &SlotReference) -> Result<ArgValues, DispatchError> {
    let container_type = slot.slot_type.container_type().ok_or(DispatchError::NotContainerTransfer)?;
    let container_id = dispatcher.container_id_for(container_type, slot.parent_id.as_ref())?;
    let slot_index = checked_slot_index(&slot.slot_type, &slot.index)?;
    Ok(ArgValues { container_id: Some(container_id), slot_index: Some(slot_index), ..ArgValues::default() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container_entities::{CampfireRecord, FumaroleRecord, FurnaceRecord, SlotFields, StashRecord, WoodenStorageBoxRecord};
    use crate::error::ErrorKind;
    use crate::remote::ReducerArg;
    use crate::test_support::{init_logging, populated, RecordingInvoker};

    fn campfire(id: u32) -> ContainerEntity {
        ContainerEntity::Campfire(CampfireRecord {
            id,
            pos_x: 0.0,
            pos_y: 0.0,
            is_burning: false,
            attached_broth_pot_id: None,
            slots: SlotFields::new(),
        })
    }

    fn fumarole_row(json: &str) -> ContainerEntity {
        ContainerEntity::Fumarole(serde_json::from_str::<FumaroleRecord>(json).unwrap())
    }

    fn furnace(attached_broth_pot_id: Option<u32>) -> ContainerEntity {
        ContainerEntity::Furnace(FurnaceRecord {
            id: 9,
            pos_x: 0.0,
            pos_y: 0.0,
            is_burning: false,
            attached_broth_pot_id,
            slots: SlotFields::new(),
        })
    }

    /// A pot as the server stores it while sitting on a fumarole: no
    /// back-reference to its host.
    fn loose_pot_row(water: Option<u64>) -> BrothPotRecord {
        let water = water.map_or("null".to_string(), |id| id.to_string());
        serde_json::from_str(&format!(
            r#"{{"id": 4, "pos_x": 0.0, "pos_y": 0.0, "attached_to_campfire_id": null,
                "water_level_ml": 0, "water_container_instance_id": {water},
                "ingredient_instance_id_0": null, "ingredient_instance_id_1": null,
                "ingredient_instance_id_2": null, "output_item_instance_id": null}}"#
        ))
        .unwrap()
    }

    fn pot_on_campfire(campfire_id: u32, water: Option<u64>) -> BrothPotRecord {
        BrothPotRecord {
            id: 4,
            pos_x: 0.0,
            pos_y: 0.0,
            attached_to_campfire_id: Some(campfire_id),
            water_level_ml: 0,
            slots: SlotFields::new().with(BrothPotRecord::WATER_CONTAINER_FIELD, water),
        }
    }

    fn full_ingredients() -> Vec<Option<PopulatedItem>> {
        let mut full = populated(90, "Mushroom", 100);
        full.definition.stack_size = 100;
        vec![Some(full.clone()), Some(full.clone()), Some(full)]
    }

    fn setup() -> (std::sync::Arc<RecordingInvoker>, TransferDispatcher) {
        init_logging();
        let invoker = RecordingInvoker::new();
        let dispatcher = TransferDispatcher::new(invoker.clone());
        (invoker, dispatcher)
    }

    #[test]
    fn water_container_goes_to_an_empty_water_slot() {
        let (invoker, d) = setup();
        let record = pot_on_campfire(7, None);
        let pot = AttachedPot { record: &record, ingredients: vec![None, None, None] };
        let bottle = populated(12, "Reed Water Bottle", 1);

        let call = quick_move_to_container(&d, &bottle, &campfire(7), Some(&pot)).unwrap();
        assert_eq!(call.reducer.as_str(), "quickMoveToBrothPotWaterContainer");
        assert_eq!(call.args, vec![ReducerArg::U32(4), ReducerArg::U64(12)]);
        assert_eq!(invoker.calls().len(), 1);
    }

    #[test]
    fn filled_water_slot_falls_to_the_ingredients() {
        let (_, d) = setup();
        let record = pot_on_campfire(7, Some(55));
        let pot = AttachedPot { record: &record, ingredients: vec![None, None, None] };
        let bottle = populated(12, "Plastic Water Jug", 1);

        let call = quick_move_to_container(&d, &bottle, &campfire(7), Some(&pot)).unwrap();
        assert_eq!(call.reducer.as_str(), "quickMoveToBrothPot");
    }

    #[test]
    fn full_pot_falls_through_to_the_burner() {
        let (_, d) = setup();
        let record = pot_on_campfire(7, Some(55));
        let pot = AttachedPot { record: &record, ingredients: full_ingredients() };
        let wood = populated(13, "Wood", 10);

        let call = quick_move_to_container(&d, &wood, &campfire(7), Some(&pot)).unwrap();
        assert_eq!(call.reducer.as_str(), "quickMoveToCampfire");
        assert_eq!(call.args, vec![ReducerArg::U32(7), ReducerArg::U64(13)]);
    }

    #[test]
    fn matching_stack_with_space_counts_as_room() {
        let record = pot_on_campfire(7, None);
        let mut ingredients = full_ingredients();
        if let Some(Some(first)) = ingredients.first_mut() {
            first.instance.quantity = 99;
        }
        let pot = AttachedPot { record: &record, ingredients };
        assert!(pot.has_room_for(&populated(90, "Mushroom", 1)));
        assert!(!pot.has_room_for(&populated(91, "Potato", 1)));
    }

    #[test]
    fn pot_on_another_campfire_is_ignored() {
        let record = pot_on_campfire(8, None);
        let pot = AttachedPot { record: &record, ingredients: vec![None, None, None] };
        let route = route_quick_move(&populated(12, "Reed Water Bottle", 1), &campfire(7), Some(&pot)).unwrap();
        assert_eq!(route.target(), ReducerTarget::Container(ContainerType::Campfire));
    }

    #[test]
    fn fumarole_finds_its_pot_through_its_own_row() {
        let fumarole = fumarole_row(r#"{"id": 3, "pos_x": 0.0, "pos_y": 0.0, "attached_broth_pot_id": 4, "slot_instance_id_0": null}"#);
        let record = loose_pot_row(None);
        let pot = AttachedPot { record: &record, ingredients: vec![None, None, None] };

        let route = route_quick_move(&populated(12, "Reed Water Bottle", 1), &fumarole, Some(&pot)).unwrap();
        assert_eq!(route, QuickMoveRoute::PotWaterContainer { pot_id: 4 });

        let other = fumarole_row(r#"{"id": 3, "pos_x": 0.0, "pos_y": 0.0, "attached_broth_pot_id": 5}"#);
        let route = route_quick_move(&populated(12, "Reed Water Bottle", 1), &other, Some(&pot)).unwrap();
        assert_eq!(route.target(), ReducerTarget::Container(ContainerType::Fumarole));
    }

    #[test]
    fn fumarole_never_incinerates_when_the_pot_is_full() {
        let (invoker, d) = setup();
        let fumarole = fumarole_row(r#"{"id": 3, "pos_x": 0.0, "pos_y": 0.0, "attached_broth_pot_id": 4}"#);
        let record = loose_pot_row(Some(55));
        let pot = AttachedPot { record: &record, ingredients: full_ingredients() };
        let err = quick_move_to_container(&d, &populated(13, "Wood", 10), &fumarole, Some(&pot)).unwrap_err();
        assert_eq!(err, DispatchError::IncineratorBlocked);
        assert_eq!(err.kind(), ErrorKind::SemanticRejection);
        assert!(invoker.calls().is_empty());

        let call = quick_move_to_container(&d, &populated(13, "Wood", 10), &fumarole, None).unwrap();
        assert_eq!(call.reducer.as_str(), "quickMoveToFumarole");
        assert_eq!(call.args[0], ReducerArg::U64(3));
    }

    #[test]
    fn furnace_only_hosts_the_pot_its_row_names() {
        let record = loose_pot_row(None);
        let pot = AttachedPot { record: &record, ingredients: vec![None, None, None] };
        let bottle = populated(12, "Reed Water Bottle", 1);

        let route = route_quick_move(&bottle, &furnace(None), Some(&pot)).unwrap();
        assert_eq!(route.target(), ReducerTarget::Container(ContainerType::Furnace));

        let route = route_quick_move(&bottle, &furnace(Some(4)), Some(&pot)).unwrap();
        assert_eq!(route, QuickMoveRoute::PotWaterContainer { pot_id: 4 });
    }

    #[test]
    fn boxes_branch_on_subtype_and_hidden_stashes_refuse() {
        let (invoker, d) = setup();
        let item = populated(1, "Raw Fish", 1);
        for (box_type, expected) in [(0u8, "quickMoveToBox"), (2, "quickMoveToRefrigerator"), (5, "quickMoveToRepairBench"), (10, "quickMoveToFishTrap")] {
            let entity = ContainerEntity::WoodenStorageBox(WoodenStorageBoxRecord {
                id: 2,
                pos_x: 0.0,
                pos_y: 0.0,
                box_type,
                slots: SlotFields::new(),
            });
            assert_eq!(quick_move_to_container(&d, &item, &entity, None).unwrap().reducer.as_str(), expected);
        }

        let stash = ContainerEntity::Stash(StashRecord {
            id: 6,
            pos_x: 0.0,
            pos_y: 0.0,
            placed_by: "aa".into(),
            is_hidden: true,
            last_surfaced_by: None,
            slots: SlotFields::new(),
        });
        assert_eq!(quick_move_to_container(&d, &item, &stash, None).unwrap_err(), DispatchError::HiddenStash(6));
        assert_eq!(invoker.calls().len(), 4);
    }

    #[test]
    fn withdraws_are_straight_lookups() {
        let (invoker, d) = setup();
        let call = quick_move_to_player(&d, &SlotReference::container(ContainerType::Campfire, 2, "7")).unwrap();
        assert_eq!(call.reducer.as_str(), "quickMoveFromCampfire");
        assert_eq!(call.args, vec![ReducerArg::U32(7), ReducerArg::U8(2)]);

        let call = quick_move_to_player(&d, &SlotReference::broth_pot_water_container(4)).unwrap();
        assert_eq!(call.reducer.as_str(), "quickMoveFromBrothPotWaterContainer");
        assert_eq!(call.args, vec![ReducerArg::U32(4)]);

        let call = quick_move_to_player(&d, &SlotReference::broth_pot_output(4)).unwrap();
        assert_eq!(call.reducer.as_str(), "quickMoveFromBrothPotOutput");

        let call = quick_move_to_player(&d, &SlotReference::container(ContainerType::HomesteadHearth, 0, 1)).unwrap();
        assert_eq!(call.reducer.as_str(), "quickMoveFromHearth");

        assert_eq!(
            quick_move_to_player(&d, &SlotReference::inventory(0)).unwrap_err(),
            DispatchError::NotContainerTransfer
        );
        assert_eq!(invoker.calls().len(), 4);
    }
}
