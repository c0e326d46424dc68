/******************************************************************************
 *                                                                            *
 * Derives reducer names and argument layouts from (container, operation).   *
 * Most pairs follow a template with the container's noun substituted in;    *
 * the irregular ones live in an explicit exception table that is consulted  *
 * before any template is applied.                                           *
 *                                                                            *
 ******************************************************************************/

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

use crate::container_entities::BoxKind;
use crate::container_registry::{config_for, reducer_noun};
use crate::models::{ContainerCategory, ContainerType};

/// The gestures the dispatch layer knows how to turn into reducer calls.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    MoveFromPlayer,
    MoveToPlayer,
    MoveWithin,
    SplitFromPlayer,
    SplitToPlayer,
    SplitWithin,
    DropToWorld,
    SplitDropToWorld,
    QuickMoveFrom,
    QuickMoveTo,
    Toggle,
    Light,
    Extinguish,
}

/// What a reducer acts on. Box subtypes and broth pot sub-slots share a
/// container type with their parent but answer to their own reducers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReducerTarget {
    Container(ContainerType),
    BoxVariant(BoxKind),
    BrothPotWaterContainer,
    BrothPotOutput,
}

impl ReducerTarget {
    pub fn container_type(&self) -> ContainerType {
        match self {
            ReducerTarget::Container(t) => *t,
            ReducerTarget::BoxVariant(_) => ContainerType::WoodenStorageBox,
            ReducerTarget::BrothPotWaterContainer | ReducerTarget::BrothPotOutput => ContainerType::BrothPot,
        }
    }
}

impl fmt::Display for ReducerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReducerTarget::Container(t) => write!(f, "{}", t.tag()),
            ReducerTarget::BoxVariant(kind) => write!(f, "wooden_storage_box({:?})", kind),
            ReducerTarget::BrothPotWaterContainer => write!(f, "broth_pot_water_container"),
            ReducerTarget::BrothPotOutput => write!(f, "broth_pot_output"),
        }
    }
}

/// One positional argument of a reducer, named by the value that fills it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArgSlot {
    ContainerId,
    SlotIndex,
    ItemInstanceId,
    Quantity,
    TargetSlotType,
    TargetSlotIndex,
    SourceIndex,
    TargetIndex,
}

/// Client binding name of a reducer (camelCase).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReducerName(String);

impl ReducerName {
    pub fn new(name: impl Into<String>) -> Self {
        ReducerName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The module-side reducer name, as the HTTP API expects it.
    pub fn wire_name(&self) -> String {
        let mut wire = String::with_capacity(self.0.len() + 8);
        for c in self.0.chars() {
            if c.is_ascii_uppercase() {
                if !wire.is_empty() {
                    wire.push('_');
                }
                wire.push(c.to_ascii_lowercase());
            } else {
                wire.push(c);
            }
        }
        wire
    }
}

impl fmt::Display for ReducerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedReducer {
    pub name: ReducerName,
    pub args: &'static [ArgSlot],
}

impl ResolvedReducer {
    fn new(name: impl Into<String>, args: &'static [ArgSlot]) -> Self {
        ResolvedReducer { name: ReducerName::new(name), args }
    }
}

// --- Argument layouts ---

use ArgSlot::*;

const ID_SLOT_ITEM: &[ArgSlot] = &[ContainerId, SlotIndex, ItemInstanceId];
const ID_ITEM_SLOT: &[ArgSlot] = &[ContainerId, ItemInstanceId, SlotIndex];
const ID_ITEM: &[ArgSlot] = &[ContainerId, ItemInstanceId];
const ID_SLOT: &[ArgSlot] = &[ContainerId, SlotIndex];
const ID_ONLY: &[ArgSlot] = &[ContainerId];
const ID_SLOT_TO_PLAYER: &[ArgSlot] = &[ContainerId, SlotIndex, TargetSlotType, TargetSlotIndex];
const ID_TO_PLAYER: &[ArgSlot] = &[ContainerId, TargetSlotType, TargetSlotIndex];
const ID_SRC_TGT: &[ArgSlot] = &[ContainerId, SourceIndex, TargetIndex];
const ITEM_QTY_ID_SLOT: &[ArgSlot] = &[ItemInstanceId, Quantity, ContainerId, SlotIndex];
const ID_SLOT_ITEM_QTY: &[ArgSlot] = &[ContainerId, SlotIndex, ItemInstanceId, Quantity];
const ID_SLOT_QTY_TO_PLAYER: &[ArgSlot] = &[ContainerId, SlotIndex, Quantity, TargetSlotType, TargetSlotIndex];
const ID_SRC_QTY_TGT: &[ArgSlot] = &[ContainerId, SourceIndex, Quantity, TargetIndex];
const ID_SRC_TGT_QTY: &[ArgSlot] = &[ContainerId, SourceIndex, TargetIndex, Quantity];
const ID_SLOT_QTY: &[ArgSlot] = &[ContainerId, SlotIndex, Quantity];

/// An exception table entry: either a hand-named reducer, or a pair the
/// server simply does not offer.
#[derive(Clone, Debug)]
enum Override {
    Named(ResolvedReducer),
    Unsupported,
}

fn named(name: &str, args: &'static [ArgSlot]) -> Override {
    Override::Named(ResolvedReducer::new(name, args))
}

lazy_static! {
    static ref REDUCER_OVERRIDES: HashMap<(ReducerTarget, OperationKind), Override> = {
        use OperationKind::*;
        use ReducerTarget::*;
        let mut table = HashMap::new();

        // Burners withdraw "...ToPlayerSlot"; storage withdraws "From<Noun>".
        for t in [ContainerType::Campfire, ContainerType::Furnace, ContainerType::Lantern, ContainerType::Fumarole] {
            let noun = reducer_noun(t);
            table.insert(
                (Container(t), MoveToPlayer),
                named(&format!("moveItemFrom{}ToPlayerSlot", noun), ID_SLOT_TO_PLAYER),
            );
        }

        // Hearth split-in takes the burner argument order.
        table.insert((Container(ContainerType::HomesteadHearth), SplitFromPlayer), named("splitStackIntoHearth", ITEM_QTY_ID_SLOT));

        // Corpse deposits are spelled with the short noun and the storage argument order.
        table.insert((Container(ContainerType::PlayerCorpse), MoveFromPlayer), named("moveItemToCorpse", ID_SLOT_ITEM));
        table.insert((Container(ContainerType::PlayerCorpse), SplitFromPlayer), named("splitStackIntoCorpse", ID_SLOT_ITEM_QTY));
        table.insert((Container(ContainerType::PlayerCorpse), QuickMoveTo), named("quickMoveToCorpse", ID_ITEM));

        // The rain collector holds one bottle: no splits, no inner moves, no drops.
        let rain = Container(ContainerType::RainCollector);
        table.insert((rain, MoveFromPlayer), named("moveItemToRainCollector", ID_ITEM_SLOT));
        for op in [MoveWithin, SplitFromPlayer, SplitToPlayer, SplitWithin, DropToWorld, SplitDropToWorld, QuickMoveTo] {
            table.insert((rain, op), Override::Unsupported);
        }

        // Broth pot sub-slots sit outside the numbered ingredient range.
        table.insert((BrothPotWaterContainer, MoveFromPlayer), named("moveItemToBrothPotWaterContainer", ID_ITEM));
        table.insert((BrothPotWaterContainer, MoveToPlayer), named("moveItemFromBrothPotWaterContainer", ID_TO_PLAYER));
        table.insert((BrothPotWaterContainer, QuickMoveFrom), named("quickMoveFromBrothPotWaterContainer", ID_ONLY));
        table.insert((BrothPotWaterContainer, QuickMoveTo), named("quickMoveToBrothPotWaterContainer", ID_ITEM));
        table.insert((BrothPotOutput, MoveToPlayer), named("moveItemFromBrothPotOutput", ID_TO_PLAYER));
        table.insert((BrothPotOutput, QuickMoveFrom), named("quickMoveFromBrothPotOutput", ID_ONLY));

        // Box subtypes with their own deposit reducers.
        for (kind, sub) in [
            (BoxKind::Refrigerator, "Refrigerator"),
            (BoxKind::Compost, "Compost"),
            (BoxKind::FishTrap, "FishTrap"),
        ] {
            table.insert((BoxVariant(kind), MoveFromPlayer), named(&format!("moveItemTo{}", sub), ID_SLOT_ITEM));
            table.insert((BoxVariant(kind), SplitFromPlayer), named(&format!("splitStackInto{}", sub), ID_SLOT_ITEM_QTY));
            table.insert((BoxVariant(kind), QuickMoveTo), named(&format!("quickMoveTo{}", sub), ID_ITEM));
        }
        // Repair bench has no split-in reducer; splits fall back to the plain box.
        table.insert((BoxVariant(BoxKind::RepairBench), MoveFromPlayer), named("moveItemToRepairBench", ID_SLOT_ITEM));
        table.insert((BoxVariant(BoxKind::RepairBench), QuickMoveTo), named("quickMoveToRepairBench", ID_ITEM));

        // Toggles that are not "toggle<Noun>Burning".
        table.insert((Container(ContainerType::Lantern), Toggle), named("toggleLantern", ID_ONLY));
        table.insert((Container(ContainerType::Stash), Toggle), named("toggleStashVisibility", ID_ONLY));

        table
    };
}

/// Resolves the reducer for `(target, op)`. Pure: the same input always
/// yields the same name and layout. Returns None when the pair has no reducer.
pub fn resolve(target: ReducerTarget, op: OperationKind) -> Option<ResolvedReducer> {
    if let Some(entry) = REDUCER_OVERRIDES.get(&(target, op)) {
        return match entry {
            Override::Named(resolved) => Some(resolved.clone()),
            Override::Unsupported => None,
        };
    }

    match target {
        ReducerTarget::Container(t) => resolve_template(t, op),
        // Subtypes share every non-deposit reducer with the plain box.
        ReducerTarget::BoxVariant(_) => resolve_template(ContainerType::WoodenStorageBox, op),
        ReducerTarget::BrothPotWaterContainer | ReducerTarget::BrothPotOutput => None,
    }
}

fn resolve_template(container_type: ContainerType, op: OperationKind) -> Option<ResolvedReducer> {
    let config = config_for(container_type);
    let noun = reducer_noun(container_type);
    let fuel = container_type.category() == ContainerCategory::Fuel;

    let resolved = match op {
        OperationKind::MoveFromPlayer => ResolvedReducer::new(format!("moveItemTo{}", noun), ID_SLOT_ITEM),
        OperationKind::MoveToPlayer => ResolvedReducer::new(format!("moveItemFrom{}", noun), ID_SLOT_TO_PLAYER),
        OperationKind::MoveWithin => ResolvedReducer::new(format!("moveItemWithin{}", noun), ID_SRC_TGT),
        OperationKind::SplitFromPlayer => {
            let args = if fuel { ITEM_QTY_ID_SLOT } else { ID_SLOT_ITEM_QTY };
            ResolvedReducer::new(format!("splitStackInto{}", noun), args)
        }
        OperationKind::SplitToPlayer => ResolvedReducer::new(format!("splitStackFrom{}", noun), ID_SLOT_QTY_TO_PLAYER),
        OperationKind::SplitWithin => {
            let args = if fuel { ID_SRC_QTY_TGT } else { ID_SRC_TGT_QTY };
            ResolvedReducer::new(format!("splitStackWithin{}", noun), args)
        }
        OperationKind::DropToWorld => ResolvedReducer::new(format!("dropItemFrom{}SlotToWorld", noun), ID_SLOT),
        OperationKind::SplitDropToWorld => {
            ResolvedReducer::new(format!("splitAndDropItemFrom{}SlotToWorld", noun), ID_SLOT_QTY)
        }
        OperationKind::QuickMoveFrom => ResolvedReducer::new(format!("quickMoveFrom{}", noun), ID_SLOT),
        OperationKind::QuickMoveTo => ResolvedReducer::new(format!("quickMoveTo{}", noun), ID_ITEM),
        OperationKind::Toggle if config.has_toggle => {
            ResolvedReducer::new(format!("toggle{}Burning", noun), ID_ONLY)
        }
        OperationKind::Light if config.has_light_extinguish => ResolvedReducer::new(format!("light{}", noun), ID_ONLY),
        OperationKind::Extinguish if config.has_light_extinguish => {
            ResolvedReducer::new(format!("extinguish{}", noun), ID_ONLY)
        }
        OperationKind::Toggle | OperationKind::Light | OperationKind::Extinguish => return None,
    };
    Some(resolved)
}

// --- Reducers outside the container surface ---

pub const QUERY_HEARTH_UPKEEP_COSTS: &str = "queryHearthUpkeepCosts";
pub const GRANT_BUILDING_PRIVILEGE_FROM_HEARTH: &str = "grantBuildingPrivilegeFromHearth";
pub const REVOKE_PLAYER_BUILDING_PRIVILEGE: &str = "revokePlayerBuildingPrivilege";

#[cfg(test)]
mod tests {
    use super::*;
    use OperationKind::*;

    fn name_of(target: ReducerTarget, op: OperationKind) -> String {
        resolve(target, op).map(|r| r.name.to_string()).unwrap_or_default()
    }

    #[test]
    fn resolution_is_pure() {
        for t in ContainerType::ALL {
            for op in [MoveFromPlayer, MoveToPlayer, MoveWithin, SplitFromPlayer, SplitToPlayer, SplitWithin, DropToWorld, SplitDropToWorld, QuickMoveFrom, QuickMoveTo, Toggle, Light, Extinguish] {
                assert_eq!(resolve(ReducerTarget::Container(t), op), resolve(ReducerTarget::Container(t), op));
            }
        }
    }

    #[test]
    fn templates_substitute_the_noun() {
        let campfire = ReducerTarget::Container(ContainerType::Campfire);
        assert_eq!(name_of(campfire, MoveFromPlayer), "moveItemToCampfire");
        assert_eq!(name_of(campfire, DropToWorld), "dropItemFromCampfireSlotToWorld");
        assert_eq!(name_of(campfire, Toggle), "toggleCampfireBurning");
        let hearth = ReducerTarget::Container(ContainerType::HomesteadHearth);
        assert_eq!(name_of(hearth, QuickMoveTo), "quickMoveToHearth");
        assert_eq!(name_of(hearth, MoveToPlayer), "moveItemFromHearth");
        let stash = ReducerTarget::Container(ContainerType::Stash);
        assert_eq!(name_of(stash, SplitDropToWorld), "splitAndDropItemFromStashSlotToWorld");
    }

    #[test]
    fn withdraw_suffix_differs_by_category() {
        let furnace = resolve(ReducerTarget::Container(ContainerType::Furnace), MoveToPlayer).unwrap();
        assert_eq!(furnace.name.as_str(), "moveItemFromFurnaceToPlayerSlot");
        let boxed = resolve(ReducerTarget::Container(ContainerType::WoodenStorageBox), MoveToPlayer).unwrap();
        assert_eq!(boxed.name.as_str(), "moveItemFromBox");
        assert_eq!(furnace.args, boxed.args);
    }

    #[test]
    fn split_quantity_position_differs_by_category() {
        let fuel = resolve(ReducerTarget::Container(ContainerType::Lantern), SplitWithin).unwrap();
        assert_eq!(fuel.args, &[ContainerId, SourceIndex, Quantity, TargetIndex]);
        let storage = resolve(ReducerTarget::Container(ContainerType::Stash), SplitWithin).unwrap();
        assert_eq!(storage.args, &[ContainerId, SourceIndex, TargetIndex, Quantity]);
        let hearth = resolve(ReducerTarget::Container(ContainerType::HomesteadHearth), SplitFromPlayer).unwrap();
        assert_eq!(hearth.args, &[ItemInstanceId, Quantity, ContainerId, SlotIndex]);
    }

    #[test]
    fn broth_pot_sub_slots_bypass_the_template() {
        let water = resolve(ReducerTarget::BrothPotWaterContainer, MoveFromPlayer).unwrap();
        assert_eq!(water.name.as_str(), "moveItemToBrothPotWaterContainer");
        assert_eq!(water.args, &[ContainerId, ItemInstanceId]);
        assert_eq!(name_of(ReducerTarget::BrothPotOutput, QuickMoveFrom), "quickMoveFromBrothPotOutput");
        // The pot itself still follows the template.
        assert_eq!(name_of(ReducerTarget::Container(ContainerType::BrothPot), MoveFromPlayer), "moveItemToBrothPot");
        assert!(resolve(ReducerTarget::BrothPotOutput, MoveWithin).is_none());
    }

    #[test]
    fn rain_collector_uses_its_own_argument_order() {
        let deposit = resolve(ReducerTarget::Container(ContainerType::RainCollector), MoveFromPlayer).unwrap();
        assert_eq!(deposit.args, &[ContainerId, ItemInstanceId, SlotIndex]);
        assert!(resolve(ReducerTarget::Container(ContainerType::RainCollector), SplitWithin).is_none());
    }

    #[test]
    fn box_variants_override_deposits_only() {
        let fridge = ReducerTarget::BoxVariant(BoxKind::Refrigerator);
        assert_eq!(name_of(fridge, QuickMoveTo), "quickMoveToRefrigerator");
        assert_eq!(name_of(fridge, MoveToPlayer), "moveItemFromBox");
        let bench = ReducerTarget::BoxVariant(BoxKind::RepairBench);
        assert_eq!(name_of(bench, MoveFromPlayer), "moveItemToRepairBench");
        assert_eq!(name_of(bench, SplitFromPlayer), "splitStackIntoBox");
    }

    #[test]
    fn toggles_light_and_extinguish() {
        let lantern = ReducerTarget::Container(ContainerType::Lantern);
        assert_eq!(name_of(lantern, Light), "lightLantern");
        assert_eq!(name_of(lantern, Extinguish), "extinguishLantern");
        assert_eq!(name_of(lantern, Toggle), "toggleLantern");
        assert_eq!(name_of(ReducerTarget::Container(ContainerType::Stash), Toggle), "toggleStashVisibility");
        assert!(resolve(ReducerTarget::Container(ContainerType::Fumarole), Toggle).is_none());
        assert!(resolve(ReducerTarget::Container(ContainerType::Campfire), Light).is_none());
    }

    #[test]
    fn wire_names_are_snake_case() {
        let name = ReducerName::new("moveItemFromCampfireToPlayerSlot");
        assert_eq!(name.wire_name(), "move_item_from_campfire_to_player_slot");
        assert_eq!(ReducerName::new(QUERY_HEARTH_UPKEEP_COSTS).wire_name(), "query_hearth_upkeep_costs");
    }
}
