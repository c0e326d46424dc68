/******************************************************************************
 *                                                                            *
 * Shared client-side models: container type tags, slot references, item     *
 * projections read from the reactive store, and the ephemeral drag payload. *
 *                                                                            *
 ******************************************************************************/

use serde::{Deserialize, Serialize};

use crate::coercion::RawNumber;
use crate::container_registry;

// --- Player slot constants (mirrors the server's player inventory layout) ---
pub const NUM_PLAYER_INVENTORY_SLOTS: u32 = 24;
pub const NUM_PLAYER_HOTBAR_SLOTS: u32 = 6;

/// Every in-world container kind the client can move items through.
/// The set is closed; adding a variant means adding a registry entry.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContainerType {
    Campfire,
    Furnace,
    Lantern,
    Fumarole,
    WoodenStorageBox,
    PlayerCorpse,
    Stash,
    RainCollector,
    HomesteadHearth,
    BrothPot,
}

/// Whether a container follows the fuel-burner reducer conventions or the
/// storage conventions. The two families disagree on withdraw suffixes and
/// on where the split quantity sits in the argument list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContainerCategory {
    Fuel,
    Storage,
}

impl ContainerType {
    pub const ALL: [ContainerType; 10] = [
        ContainerType::Campfire,
        ContainerType::Furnace,
        ContainerType::Lantern,
        ContainerType::Fumarole,
        ContainerType::WoodenStorageBox,
        ContainerType::PlayerCorpse,
        ContainerType::Stash,
        ContainerType::RainCollector,
        ContainerType::HomesteadHearth,
        ContainerType::BrothPot,
    ];

    /// The type tag, as used in table names and reducer noun derivation.
    pub fn tag(&self) -> &'static str {
        match self {
            ContainerType::Campfire => "campfire",
            ContainerType::Furnace => "furnace",
            ContainerType::Lantern => "lantern",
            ContainerType::Fumarole => "fumarole",
            ContainerType::WoodenStorageBox => "wooden_storage_box",
            ContainerType::PlayerCorpse => "player_corpse",
            ContainerType::Stash => "stash",
            ContainerType::RainCollector => "rain_collector",
            ContainerType::HomesteadHearth => "homestead_hearth",
            ContainerType::BrothPot => "broth_pot",
        }
    }

    pub fn from_tag(tag: &str) -> Option<ContainerType> {
        ContainerType::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    pub fn category(&self) -> ContainerCategory {
        match self {
            ContainerType::Campfire
            | ContainerType::Furnace
            | ContainerType::Lantern
            | ContainerType::Fumarole => ContainerCategory::Fuel,
            _ => ContainerCategory::Storage,
        }
    }
}

/// Which kind of slot a UI gesture started or ended on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlotType {
    Inventory,
    Hotbar,
    Container(ContainerType),
    /// The broth pot's dedicated water container slot (outside the ingredient range).
    BrothPotWaterContainer,
    /// The broth pot's finished-output slot (outside the ingredient range).
    BrothPotOutput,
}

impl SlotType {
    pub fn tag(&self) -> &'static str {
        match self {
            SlotType::Inventory => "inventory",
            SlotType::Hotbar => "hotbar",
            SlotType::Container(t) => container_registry::config_for(*t).slot_type_tag,
            SlotType::BrothPotWaterContainer => "broth_pot_water_container",
            SlotType::BrothPotOutput => "broth_pot_output",
        }
    }

    /// Recovers the slot type from a slot tag. Container tags are looked up
    /// through the registry so the registry stays the single source of truth.
    pub fn from_tag(tag: &str) -> Option<SlotType> {
        match tag {
            "inventory" => Some(SlotType::Inventory),
            "hotbar" => Some(SlotType::Hotbar),
            "broth_pot_water_container" => Some(SlotType::BrothPotWaterContainer),
            "broth_pot_output" => Some(SlotType::BrothPotOutput),
            other => container_registry::container_type_for_slot_tag(other).map(SlotType::Container),
        }
    }

    pub fn is_player_slot(&self) -> bool {
        matches!(self, SlotType::Inventory | SlotType::Hotbar)
    }

    /// The container that owns this slot, if it is not a player slot.
    pub fn container_type(&self) -> Option<ContainerType> {
        match self {
            SlotType::Container(t) => Some(*t),
            SlotType::BrothPotWaterContainer | SlotType::BrothPotOutput => Some(ContainerType::BrothPot),
            SlotType::Inventory | SlotType::Hotbar => None,
        }
    }

    /// Number of addressable indices for this slot type.
    pub fn slot_count(&self) -> u32 {
        match self {
            SlotType::Inventory => NUM_PLAYER_INVENTORY_SLOTS,
            SlotType::Hotbar => NUM_PLAYER_HOTBAR_SLOTS,
            SlotType::Container(t) => container_registry::config_for(*t).slot_count as u32,
            SlotType::BrothPotWaterContainer | SlotType::BrothPotOutput => 1,
        }
    }
}

/// Where a gesture picked up or dropped an item. Indices and ids arrive from
/// the UI in whatever numeric shape the widget held, so they stay raw until
/// the dispatcher coerces them.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotReference {
    pub slot_type: SlotType,
    pub index: RawNumber,
    /// Absent means player inventory/hotbar, never a container.
    pub parent_id: Option<RawNumber>,
}

impl SlotReference {
    pub fn inventory(index: impl Into<RawNumber>) -> Self {
        SlotReference { slot_type: SlotType::Inventory, index: index.into(), parent_id: None }
    }

    pub fn hotbar(index: impl Into<RawNumber>) -> Self {
        SlotReference { slot_type: SlotType::Hotbar, index: index.into(), parent_id: None }
    }

    pub fn container(
        container_type: ContainerType,
        index: impl Into<RawNumber>,
        container_id: impl Into<RawNumber>,
    ) -> Self {
        SlotReference {
            slot_type: SlotType::Container(container_type),
            index: index.into(),
            parent_id: Some(container_id.into()),
        }
    }

    pub fn broth_pot_water_container(pot_id: impl Into<RawNumber>) -> Self {
        SlotReference {
            slot_type: SlotType::BrothPotWaterContainer,
            index: RawNumber::Int(0),
            parent_id: Some(pot_id.into()),
        }
    }

    pub fn broth_pot_output(pot_id: impl Into<RawNumber>) -> Self {
        SlotReference {
            slot_type: SlotType::BrothPotOutput,
            index: RawNumber::Int(0),
            parent_id: Some(pot_id.into()),
        }
    }
}

// --- Item projections ---

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    Tool,
    Material,
    Placeable,
    Armor,
    Consumable,
    Ammunition,
    Weapon,
    RangedWeapon,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ItemLocation {
    Inventory { owner_id: String, slot_index: u16 },
    Hotbar { owner_id: String, slot_index: u8 },
    Equipped { owner_id: String },
    Container { container_type: ContainerType, container_id: u64, slot_index: u8 },
    Dropped { pos_x: f32, pos_y: f32 },
    Unknown,
}

/// Read-only projection of a row in the `inventory_item` table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InventoryItem {
    pub instance_id: u64,
    pub item_def_id: u64,
    pub quantity: u32,
    pub location: ItemLocation,
}

/// Read-only projection of a row in the `item_definition` table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItemDefinition {
    pub id: u64,
    pub name: String,
    pub category: ItemCategory,
    #[serde(default)]
    pub is_stackable: bool,
    #[serde(default = "default_stack_size")]
    pub stack_size: u32,
    #[serde(default)]
    pub fuel_burn_duration_secs: Option<f32>,
    #[serde(default)]
    pub cook_time_secs: Option<f32>,
}

fn default_stack_size() -> u32 {
    1
}

/// An instance joined with its definition.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulatedItem {
    pub instance: InventoryItem,
    pub definition: ItemDefinition,
}

/// The item currently carried by a drag gesture. Created on pick-up and
/// consumed by value exactly once when dropped or cancelled.
#[derive(Clone, Debug, PartialEq)]
pub struct DraggedItemInfo {
    pub item: PopulatedItem,
    pub source_slot: SlotReference,
    /// Present when the gesture drags part of a stack.
    pub split_quantity: Option<RawNumber>,
}

impl DraggedItemInfo {
    pub fn whole_stack(item: PopulatedItem, source_slot: SlotReference) -> Self {
        DraggedItemInfo { item, source_slot, split_quantity: None }
    }

    pub fn split(item: PopulatedItem, source_slot: SlotReference, quantity: impl Into<RawNumber>) -> Self {
        DraggedItemInfo { item, source_slot, split_quantity: Some(quantity.into()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_tags_round_trip_through_slot_tags() {
        for t in ContainerType::ALL {
            assert_eq!(ContainerType::from_tag(t.tag()), Some(t));
            let slot = SlotType::Container(t);
            assert_eq!(SlotType::from_tag(slot.tag()), Some(slot));
        }
    }

    #[test]
    fn fuel_slot_tags_resolve_to_their_burner() {
        assert_eq!(SlotType::from_tag("campfire_fuel"), Some(SlotType::Container(ContainerType::Campfire)));
        assert_eq!(SlotType::from_tag("fumarole_slot"), Some(SlotType::Container(ContainerType::Fumarole)));
        assert_eq!(SlotType::from_tag("broth_pot_output"), Some(SlotType::BrothPotOutput));
        assert_eq!(SlotType::from_tag("equipment"), None);
    }

    #[test]
    fn sub_slots_belong_to_the_broth_pot() {
        assert_eq!(SlotType::BrothPotWaterContainer.container_type(), Some(ContainerType::BrothPot));
        assert_eq!(SlotType::Hotbar.container_type(), None);
        assert!(SlotType::Inventory.is_player_slot());
    }

    #[test]
    fn categories_split_burners_from_storage() {
        assert_eq!(ContainerType::Fumarole.category(), ContainerCategory::Fuel);
        assert_eq!(ContainerType::HomesteadHearth.category(), ContainerCategory::Storage);
    }
}
