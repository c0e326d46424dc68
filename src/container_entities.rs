/******************************************************************************
 *                                                                            *
 * Client-side projections of the container tables. Each record keeps its    *
 * per-slot instance-id fields by name, and ContainerEntity wraps them in a   *
 * single sum type so slot addressing is one match instead of runtime casts.  *
 *                                                                            *
 ******************************************************************************/

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::container_registry::{config_for, field_names_for};
use crate::models::{ContainerType, InventoryItem, ItemDefinition, PopulatedItem};

// --- Slot field storage ---

/// Per-slot storage fields captured by name (`slot_instance_id_0`,
/// `fuel_instance_id_0`, `slot_0_instance_id`, ...). Unknown fields of the
/// record land here too, which is harmless: lookups go by field name.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct SlotFields(pub BTreeMap<String, Value>);

impl SlotFields {
    pub fn new() -> Self {
        SlotFields(BTreeMap::new())
    }

    /// Builder used by tests and by callers assembling records by hand.
    pub fn with(mut self, field: &str, instance_id: Option<u64>) -> Self {
        self.set(field, instance_id);
        self
    }

    pub fn set(&mut self, field: &str, instance_id: Option<u64>) {
        let value = match instance_id {
            Some(id) => Value::from(id),
            None => Value::Null,
        };
        self.0.insert(field.to_string(), value);
    }

    /// Reads the optional instance id stored under `field`. Missing fields,
    /// nulls, `{"none": ..}` and anything unparsable count as an empty slot.
    pub fn instance_id(&self, field: &str) -> Option<u64> {
        self.0.get(field).and_then(option_u64)
    }
}

fn option_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Object(map) => map.get("some").and_then(option_u64),
        _ => None,
    }
}

// --- Per-type records ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CampfireRecord {
    pub id: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    #[serde(default)]
    pub is_burning: bool,
    #[serde(default)]
    pub attached_broth_pot_id: Option<u32>,
    #[serde(flatten)]
    pub slots: SlotFields,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FurnaceRecord {
    pub id: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    #[serde(default)]
    pub is_burning: bool,
    #[serde(default)]
    pub attached_broth_pot_id: Option<u32>,
    #[serde(flatten)]
    pub slots: SlotFields,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LanternRecord {
    pub id: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    #[serde(default)]
    pub is_burning: bool,
    #[serde(flatten)]
    pub slots: SlotFields,
}

/// Fumaroles are world features rather than placeables, hence the wide id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FumaroleRecord {
    pub id: u64,
    pub pos_x: f32,
    pub pos_y: f32,
    #[serde(default)]
    pub attached_broth_pot_id: Option<u32>,
    #[serde(flatten)]
    pub slots: SlotFields,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WoodenStorageBoxRecord {
    pub id: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    #[serde(default)]
    pub box_type: u8,
    #[serde(flatten)]
    pub slots: SlotFields,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlayerCorpseRecord {
    pub id: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    #[serde(default)]
    pub username: String,
    #[serde(flatten)]
    pub slots: SlotFields,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StashRecord {
    pub id: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    /// Identity of the placer, hex encoded.
    pub placed_by: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub last_surfaced_by: Option<String>,
    #[serde(flatten)]
    pub slots: SlotFields,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RainCollectorRecord {
    pub id: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    #[serde(default)]
    pub total_water_collected: f32,
    #[serde(flatten)]
    pub slots: SlotFields,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HomesteadHearthRecord {
    pub id: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    pub placed_by: String,
    #[serde(flatten)]
    pub slots: SlotFields,
}

/// The pot's numbered range holds ingredients; the water container and the
/// output live in their own fields outside that range.
/// A pot only records the campfire it sits on; fumaroles (and any other
/// host) point at the pot instead.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BrothPotRecord {
    pub id: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    #[serde(default)]
    pub attached_to_campfire_id: Option<u32>,
    #[serde(default)]
    pub water_level_ml: u32,
    #[serde(flatten)]
    pub slots: SlotFields,
}

impl BrothPotRecord {
    pub const WATER_CONTAINER_FIELD: &'static str = "water_container_instance_id";
    pub const OUTPUT_FIELD: &'static str = "output_item_instance_id";

    pub fn water_container_instance_id(&self) -> Option<u64> {
        self.slots.instance_id(Self::WATER_CONTAINER_FIELD)
    }

    pub fn output_instance_id(&self) -> Option<u64> {
        self.slots.instance_id(Self::OUTPUT_FIELD)
    }
}

// --- Storage box subtypes ---

pub const BOX_TYPE_REFRIGERATOR: u8 = 2;
pub const BOX_TYPE_COMPOST: u8 = 3;
pub const BOX_TYPE_REPAIR_BENCH: u8 = 5;
pub const BOX_TYPE_FISH_TRAP: u8 = 10;

/// Wooden storage boxes share one table but some subtypes take deposits
/// through their own reducers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BoxKind {
    Plain,
    Refrigerator,
    Compost,
    RepairBench,
    FishTrap,
}

impl BoxKind {
    pub fn from_box_type(box_type: u8) -> Self {
        match box_type {
            BOX_TYPE_REFRIGERATOR => BoxKind::Refrigerator,
            BOX_TYPE_COMPOST => BoxKind::Compost,
            BOX_TYPE_REPAIR_BENCH => BoxKind::RepairBench,
            BOX_TYPE_FISH_TRAP => BoxKind::FishTrap,
            _ => BoxKind::Plain,
        }
    }
}

// --- The sum type ---

#[derive(Clone, Debug, PartialEq)]
pub enum ContainerEntity {
    Campfire(CampfireRecord),
    Furnace(FurnaceRecord),
    Lantern(LanternRecord),
    Fumarole(FumaroleRecord),
    WoodenStorageBox(WoodenStorageBoxRecord),
    PlayerCorpse(PlayerCorpseRecord),
    Stash(StashRecord),
    RainCollector(RainCollectorRecord),
    HomesteadHearth(HomesteadHearthRecord),
    BrothPot(BrothPotRecord),
}

/// Read-only slot access shared by every container record.
pub trait ItemContainer {
    fn num_slots(&self) -> usize;

    /// The instance id stored in `slot_index`, or None when empty or out of range.
    fn get_slot_instance_id(&self, slot_index: usize) -> Option<u64>;

    fn get_container_type(&self) -> ContainerType;

    /// Ids are unique per type only; fumarole ids are 64-bit, everything else fits u32.
    fn get_container_id(&self) -> u64;
}

impl ContainerEntity {
    pub fn container_type(&self) -> ContainerType {
        match self {
            ContainerEntity::Campfire(_) => ContainerType::Campfire,
            ContainerEntity::Furnace(_) => ContainerType::Furnace,
            ContainerEntity::Lantern(_) => ContainerType::Lantern,
            ContainerEntity::Fumarole(_) => ContainerType::Fumarole,
            ContainerEntity::WoodenStorageBox(_) => ContainerType::WoodenStorageBox,
            ContainerEntity::PlayerCorpse(_) => ContainerType::PlayerCorpse,
            ContainerEntity::Stash(_) => ContainerType::Stash,
            ContainerEntity::RainCollector(_) => ContainerType::RainCollector,
            ContainerEntity::HomesteadHearth(_) => ContainerType::HomesteadHearth,
            ContainerEntity::BrothPot(_) => ContainerType::BrothPot,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            ContainerEntity::Campfire(r) => r.id as u64,
            ContainerEntity::Furnace(r) => r.id as u64,
            ContainerEntity::Lantern(r) => r.id as u64,
            ContainerEntity::Fumarole(r) => r.id,
            ContainerEntity::WoodenStorageBox(r) => r.id as u64,
            ContainerEntity::PlayerCorpse(r) => r.id as u64,
            ContainerEntity::Stash(r) => r.id as u64,
            ContainerEntity::RainCollector(r) => r.id as u64,
            ContainerEntity::HomesteadHearth(r) => r.id as u64,
            ContainerEntity::BrothPot(r) => r.id as u64,
        }
    }

    pub fn slot_fields(&self) -> &SlotFields {
        match self {
            ContainerEntity::Campfire(r) => &r.slots,
            ContainerEntity::Furnace(r) => &r.slots,
            ContainerEntity::Lantern(r) => &r.slots,
            ContainerEntity::Fumarole(r) => &r.slots,
            ContainerEntity::WoodenStorageBox(r) => &r.slots,
            ContainerEntity::PlayerCorpse(r) => &r.slots,
            ContainerEntity::Stash(r) => &r.slots,
            ContainerEntity::RainCollector(r) => &r.slots,
            ContainerEntity::HomesteadHearth(r) => &r.slots,
            ContainerEntity::BrothPot(r) => &r.slots,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        match self {
            ContainerEntity::Campfire(r) => (r.pos_x, r.pos_y),
            ContainerEntity::Furnace(r) => (r.pos_x, r.pos_y),
            ContainerEntity::Lantern(r) => (r.pos_x, r.pos_y),
            ContainerEntity::Fumarole(r) => (r.pos_x, r.pos_y),
            ContainerEntity::WoodenStorageBox(r) => (r.pos_x, r.pos_y),
            ContainerEntity::PlayerCorpse(r) => (r.pos_x, r.pos_y),
            ContainerEntity::Stash(r) => (r.pos_x, r.pos_y),
            ContainerEntity::RainCollector(r) => (r.pos_x, r.pos_y),
            ContainerEntity::HomesteadHearth(r) => (r.pos_x, r.pos_y),
            ContainerEntity::BrothPot(r) => (r.pos_x, r.pos_y),
        }
    }

    /// Burning state for the three burners that have one.
    pub fn is_burning(&self) -> Option<bool> {
        match self {
            ContainerEntity::Campfire(r) => Some(r.is_burning),
            ContainerEntity::Furnace(r) => Some(r.is_burning),
            ContainerEntity::Lantern(r) => Some(r.is_burning),
            _ => None,
        }
    }

    /// The broth pot a burner or fumarole row says is sitting on it.
    pub fn attached_broth_pot_id(&self) -> Option<u32> {
        match self {
            ContainerEntity::Campfire(r) => r.attached_broth_pot_id,
            ContainerEntity::Furnace(r) => r.attached_broth_pot_id,
            ContainerEntity::Fumarole(r) => r.attached_broth_pot_id,
            _ => None,
        }
    }

    /// Box subtype; None for every other container type.
    pub fn box_kind(&self) -> Option<BoxKind> {
        match self {
            ContainerEntity::WoodenStorageBox(r) => Some(BoxKind::from_box_type(r.box_type)),
            _ => None,
        }
    }
}

impl ItemContainer for ContainerEntity {
    fn num_slots(&self) -> usize {
        config_for(self.container_type()).slot_count
    }

    fn get_slot_instance_id(&self, slot_index: usize) -> Option<u64> {
        let fields = field_names_for(self.container_type());
        fields
            .get(slot_index)
            .and_then(|field| self.slot_fields().instance_id(field))
    }

    fn get_container_type(&self) -> ContainerType {
        self.container_type()
    }

    fn get_container_id(&self) -> u64 {
        self.id()
    }
}

/// Checks if every slot of the container is empty.
pub fn is_container_empty<C: ItemContainer>(container: &C) -> bool {
    (0..container.num_slots()).all(|i| container.get_slot_instance_id(i).is_none())
}

// --- Slot extraction ---

/// Resolves every slot of `entity` against the cached item tables.
/// The result always has exactly `slot_count` entries. A slot whose
/// instance or definition is not (yet) in the cache is reported empty.
pub fn extract_items(
    entity: &ContainerEntity,
    items_by_instance_id: &HashMap<u64, InventoryItem>,
    definitions_by_id: &HashMap<u64, ItemDefinition>,
) -> Vec<Option<PopulatedItem>> {
    let container_type = entity.container_type();
    (0..entity.num_slots())
        .map(|slot_index| {
            let instance_id = entity.get_slot_instance_id(slot_index)?;
            resolve_item(instance_id, items_by_instance_id, definitions_by_id).or_else(|| {
                log::warn!(
                    "[ContainerSlots] {} {} slot {} points at unresolved item {}. Treating as empty.",
                    container_type.tag(),
                    entity.id(),
                    slot_index,
                    instance_id
                );
                None
            })
        })
        .collect()
}

/// Joins one instance id with its definition, if both are cached.
pub fn resolve_item(
    instance_id: u64,
    items_by_instance_id: &HashMap<u64, InventoryItem>,
    definitions_by_id: &HashMap<u64, ItemDefinition>,
) -> Option<PopulatedItem> {
    let instance = items_by_instance_id.get(&instance_id)?;
    let definition = definitions_by_id.get(&instance.item_def_id)?;
    Some(PopulatedItem { instance: instance.clone(), definition: definition.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{definition, instance};

    fn campfire(slots: SlotFields) -> ContainerEntity {
        ContainerEntity::Campfire(CampfireRecord { id: 7, pos_x: 0.0, pos_y: 0.0, is_burning: false, attached_broth_pot_id: None, slots })
    }

    fn entity_with(container_type: ContainerType, slots: SlotFields) -> ContainerEntity {
        match container_type {
            ContainerType::Campfire => campfire(slots),
            ContainerType::Furnace => ContainerEntity::Furnace(FurnaceRecord { id: 1, pos_x: 0.0, pos_y: 0.0, is_burning: false, attached_broth_pot_id: None, slots }),
            ContainerType::Lantern => ContainerEntity::Lantern(LanternRecord { id: 1, pos_x: 0.0, pos_y: 0.0, is_burning: false, slots }),
            ContainerType::Fumarole => ContainerEntity::Fumarole(FumaroleRecord { id: 1, pos_x: 0.0, pos_y: 0.0, attached_broth_pot_id: None, slots }),
            ContainerType::WoodenStorageBox => ContainerEntity::WoodenStorageBox(WoodenStorageBoxRecord { id: 1, pos_x: 0.0, pos_y: 0.0, box_type: 0, slots }),
            ContainerType::PlayerCorpse => ContainerEntity::PlayerCorpse(PlayerCorpseRecord { id: 1, pos_x: 0.0, pos_y: 0.0, username: "ghost".into(), slots }),
            ContainerType::Stash => ContainerEntity::Stash(StashRecord { id: 1, pos_x: 0.0, pos_y: 0.0, placed_by: "aa".into(), is_hidden: false, last_surfaced_by: None, slots }),
            ContainerType::RainCollector => ContainerEntity::RainCollector(RainCollectorRecord { id: 1, pos_x: 0.0, pos_y: 0.0, total_water_collected: 0.0, slots }),
            ContainerType::HomesteadHearth => ContainerEntity::HomesteadHearth(HomesteadHearthRecord { id: 1, pos_x: 0.0, pos_y: 0.0, placed_by: "aa".into(), slots }),
            ContainerType::BrothPot => ContainerEntity::BrothPot(BrothPotRecord { id: 1, pos_x: 0.0, pos_y: 0.0, attached_to_campfire_id: None, water_level_ml: 0, slots }),
        }
    }

    #[test]
    fn extract_length_matches_slot_count_when_empty_and_full() {
        let mut items = HashMap::new();
        let mut defs = HashMap::new();
        defs.insert(1, definition(1, "Wood"));
        for t in ContainerType::ALL {
            let empty = entity_with(t, SlotFields::new());
            let extracted = extract_items(&empty, &items, &defs);
            assert_eq!(extracted.len(), config_for(t).slot_count, "{:?}", t);
            assert!(extracted.iter().all(Option::is_none));

            let mut full = SlotFields::new();
            for (i, field) in field_names_for(t).iter().enumerate() {
                let instance_id = 1000 + i as u64;
                items.insert(instance_id, instance(instance_id, 1, 5));
                full.set(field, Some(instance_id));
            }
            let full = entity_with(t, full);
            let extracted = extract_items(&full, &items, &defs);
            assert_eq!(extracted.len(), config_for(t).slot_count, "{:?}", t);
            assert!(extracted.iter().all(Option::is_some), "{:?}", t);
        }
    }

    #[test]
    fn unresolved_instances_and_definitions_read_as_empty() {
        let mut items = HashMap::new();
        items.insert(10, instance(10, 99, 1)); // definition 99 not cached
        let defs = HashMap::new();
        let entity = campfire(
            SlotFields::new()
                .with("slot_instance_id_0", Some(10))
                .with("slot_instance_id_1", Some(11)),
        );
        let extracted = extract_items(&entity, &items, &defs);
        assert_eq!(extracted.len(), 5);
        assert!(extracted.iter().all(Option::is_none));
    }

    #[test]
    fn slot_fields_tolerate_loose_encodings() {
        let record: CampfireRecord = serde_json::from_str(
            r#"{"id": 7, "pos_x": 1.0, "pos_y": 2.0, "is_burning": true,
                "slot_instance_id_0": 5,
                "slot_instance_id_1": "6",
                "slot_instance_id_2": {"some": 7},
                "slot_instance_id_3": {"none": []},
                "slot_instance_id_4": null,
                "current_fuel_def_id": 3}"#,
        )
        .unwrap();
        let entity = ContainerEntity::Campfire(record);
        assert_eq!(entity.get_slot_instance_id(0), Some(5));
        assert_eq!(entity.get_slot_instance_id(1), Some(6));
        assert_eq!(entity.get_slot_instance_id(2), Some(7));
        assert_eq!(entity.get_slot_instance_id(3), None);
        assert_eq!(entity.get_slot_instance_id(4), None);
        assert_eq!(entity.get_slot_instance_id(5), None);
        assert_eq!(entity.is_burning(), Some(true));
    }

    #[test]
    fn special_layouts_read_their_fixed_fields() {
        let collector = entity_with(ContainerType::RainCollector, SlotFields::new().with("slot_0_instance_id", Some(3)));
        assert_eq!(collector.get_slot_instance_id(0), Some(3));
        assert!(!is_container_empty(&collector));

        let pot = BrothPotRecord {
            id: 2,
            pos_x: 0.0,
            pos_y: 0.0,
            attached_to_campfire_id: Some(7),
            water_level_ml: 0,
            slots: SlotFields::new()
                .with("ingredient_instance_id_2", Some(8))
                .with(BrothPotRecord::WATER_CONTAINER_FIELD, Some(9)),
        };
        assert_eq!(pot.water_container_instance_id(), Some(9));
        assert_eq!(pot.output_instance_id(), None);
        let pot = ContainerEntity::BrothPot(pot);
        assert_eq!(pot.get_slot_instance_id(2), Some(8));
        assert_eq!(pot.get_slot_instance_id(0), None);
    }

    #[test]
    fn box_kind_follows_box_type() {
        assert_eq!(BoxKind::from_box_type(0), BoxKind::Plain);
        assert_eq!(BoxKind::from_box_type(1), BoxKind::Plain);
        assert_eq!(BoxKind::from_box_type(2), BoxKind::Refrigerator);
        assert_eq!(BoxKind::from_box_type(10), BoxKind::FishTrap);
        assert_eq!(entity_with(ContainerType::Stash, SlotFields::new()).box_kind(), None);
    }
}
