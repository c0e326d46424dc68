/******************************************************************************
 *                                                                            *
 * Static per-type container configuration: slot counts, slot type tags,     *
 * storage field naming, capability flags and the reducer noun each type     *
 * contributes to procedure names.                                           *
 *                                                                            *
 ******************************************************************************/

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::models::ContainerType;

// --- Slot counts (match the server-side record layouts) ---
pub const NUM_CAMPFIRE_SLOTS: usize = 5;
pub const NUM_FURNACE_SLOTS: usize = 5;
pub const NUM_LANTERN_SLOTS: usize = 1;
pub const NUM_FUMAROLE_SLOTS: usize = 6;
pub const NUM_BOX_SLOTS: usize = 18;
pub const NUM_CORPSE_SLOTS: usize = 30 + 6; // 24 inv + 6 hotbar + 6 equipment
pub const NUM_STASH_SLOTS: usize = 6;
pub const NUM_RAIN_COLLECTOR_SLOTS: usize = 1;
pub const NUM_HEARTH_SLOTS: usize = 20;
pub const NUM_BROTH_POT_INGREDIENT_SLOTS: usize = 3;

/// How a container's per-slot instance-id fields are named.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SlotFieldLayout {
    /// `prefix + index` for every index in `0..slot_count`.
    Prefixed(&'static str),
    /// Irregular records list their fields explicitly, in slot order.
    Fixed(&'static [&'static str]),
}

#[derive(Clone, Debug)]
pub struct ContainerConfig {
    pub container_type: ContainerType,
    pub slot_count: usize,
    /// Tag carried by slot references; maps back to the container type.
    pub slot_type_tag: &'static str,
    pub field_layout: SlotFieldLayout,
    pub has_toggle: bool,
    pub has_light_extinguish: bool,
}

impl ContainerConfig {
    /// Special containers enumerate their storage fields instead of deriving them.
    pub fn is_special(&self) -> bool {
        matches!(self.field_layout, SlotFieldLayout::Fixed(_))
    }
}

static CAMPFIRE: ContainerConfig = ContainerConfig {
    container_type: ContainerType::Campfire,
    slot_count: NUM_CAMPFIRE_SLOTS,
    slot_type_tag: "campfire_fuel",
    field_layout: SlotFieldLayout::Prefixed("slot_instance_id_"),
    has_toggle: true,
    has_light_extinguish: false,
};

static FURNACE: ContainerConfig = ContainerConfig {
    container_type: ContainerType::Furnace,
    slot_count: NUM_FURNACE_SLOTS,
    slot_type_tag: "furnace_fuel",
    field_layout: SlotFieldLayout::Prefixed("slot_instance_id_"),
    has_toggle: true,
    has_light_extinguish: false,
};

static LANTERN: ContainerConfig = ContainerConfig {
    container_type: ContainerType::Lantern,
    slot_count: NUM_LANTERN_SLOTS,
    slot_type_tag: "lantern_fuel",
    field_layout: SlotFieldLayout::Prefixed("fuel_instance_id_"),
    has_toggle: false,
    has_light_extinguish: true,
};

static FUMAROLE: ContainerConfig = ContainerConfig {
    container_type: ContainerType::Fumarole,
    slot_count: NUM_FUMAROLE_SLOTS,
    slot_type_tag: "fumarole_slot",
    field_layout: SlotFieldLayout::Prefixed("slot_instance_id_"),
    has_toggle: false,
    has_light_extinguish: false,
};

static WOODEN_STORAGE_BOX: ContainerConfig = ContainerConfig {
    container_type: ContainerType::WoodenStorageBox,
    slot_count: NUM_BOX_SLOTS,
    slot_type_tag: "wooden_storage_box",
    field_layout: SlotFieldLayout::Prefixed("slot_instance_id_"),
    has_toggle: false,
    has_light_extinguish: false,
};

static PLAYER_CORPSE: ContainerConfig = ContainerConfig {
    container_type: ContainerType::PlayerCorpse,
    slot_count: NUM_CORPSE_SLOTS,
    slot_type_tag: "player_corpse",
    field_layout: SlotFieldLayout::Prefixed("slot_instance_id_"),
    has_toggle: false,
    has_light_extinguish: false,
};

static STASH: ContainerConfig = ContainerConfig {
    container_type: ContainerType::Stash,
    slot_count: NUM_STASH_SLOTS,
    slot_type_tag: "stash",
    field_layout: SlotFieldLayout::Prefixed("slot_instance_id_"),
    has_toggle: false,
    has_light_extinguish: false,
};

static RAIN_COLLECTOR: ContainerConfig = ContainerConfig {
    container_type: ContainerType::RainCollector,
    slot_count: NUM_RAIN_COLLECTOR_SLOTS,
    slot_type_tag: "rain_collector",
    field_layout: SlotFieldLayout::Fixed(&["slot_0_instance_id"]),
    has_toggle: false,
    has_light_extinguish: false,
};

static HOMESTEAD_HEARTH: ContainerConfig = ContainerConfig {
    container_type: ContainerType::HomesteadHearth,
    slot_count: NUM_HEARTH_SLOTS,
    slot_type_tag: "homestead_hearth",
    field_layout: SlotFieldLayout::Prefixed("slot_instance_id_"),
    has_toggle: false,
    has_light_extinguish: false,
};

static BROTH_POT: ContainerConfig = ContainerConfig {
    container_type: ContainerType::BrothPot,
    slot_count: NUM_BROTH_POT_INGREDIENT_SLOTS,
    slot_type_tag: "broth_pot",
    field_layout: SlotFieldLayout::Fixed(&[
        "ingredient_instance_id_0",
        "ingredient_instance_id_1",
        "ingredient_instance_id_2",
    ]),
    has_toggle: false,
    has_light_extinguish: false,
};

/// Total over the closed type set; the match is the registry.
pub fn config_for(container_type: ContainerType) -> &'static ContainerConfig {
    match container_type {
        ContainerType::Campfire => &CAMPFIRE,
        ContainerType::Furnace => &FURNACE,
        ContainerType::Lantern => &LANTERN,
        ContainerType::Fumarole => &FUMAROLE,
        ContainerType::WoodenStorageBox => &WOODEN_STORAGE_BOX,
        ContainerType::PlayerCorpse => &PLAYER_CORPSE,
        ContainerType::Stash => &STASH,
        ContainerType::RainCollector => &RAIN_COLLECTOR,
        ContainerType::HomesteadHearth => &HOMESTEAD_HEARTH,
        ContainerType::BrothPot => &BROTH_POT,
    }
}

pub fn container_type_for_slot_tag(tag: &str) -> Option<ContainerType> {
    ContainerType::ALL
        .iter()
        .copied()
        .find(|t| config_for(*t).slot_type_tag == tag)
}

// --- Derived tables ---

lazy_static! {
    static ref FIELD_NAMES: HashMap<ContainerType, Vec<String>> = {
        let mut names = HashMap::new();
        for container_type in ContainerType::ALL {
            let config = config_for(container_type);
            let fields = match config.field_layout {
                SlotFieldLayout::Prefixed(prefix) => (0..config.slot_count)
                    .map(|i| format!("{}{}", prefix, i))
                    .collect(),
                SlotFieldLayout::Fixed(fields) => fields.iter().map(|f| f.to_string()).collect(),
            };
            names.insert(container_type, fields);
        }
        names
    };

    /// Reducer nouns that do not follow the PascalCase-of-tag rule.
    static ref NOUN_OVERRIDES: HashMap<ContainerType, &'static str> = {
        let mut nouns = HashMap::new();
        nouns.insert(ContainerType::WoodenStorageBox, "Box");
        nouns.insert(ContainerType::PlayerCorpse, "Corpse");
        nouns.insert(ContainerType::HomesteadHearth, "Hearth");
        nouns
    };
}

/// Storage field names in slot order. Length always equals `slot_count`.
pub fn field_names_for(container_type: ContainerType) -> &'static [String] {
    FIELD_NAMES
        .get(&container_type)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// The noun substituted into reducer name templates (`moveItemTo<Noun>`).
pub fn reducer_noun(container_type: ContainerType) -> String {
    match NOUN_OVERRIDES.get(&container_type) {
        Some(noun) => noun.to_string(),
        None => pascal_case(container_type.tag()),
    }
}

pub(crate) fn pascal_case(tag: &str) -> String {
    tag.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
