/******************************************************************************
 *                                                                            *
 * Reed Bellows duration preview. A bellows sitting in a burner's slots      *
 * makes fuel last longer and cooking finish sooner; tooltips show the        *
 * adjusted numbers. The preview is computed per hover from the current      *
 * slot contents and never written back to the item definition.              *
 *                                                                            *
 ******************************************************************************/

use crate::models::{ContainerCategory, ContainerType, ItemDefinition, PopulatedItem};

// --- Constants ---
pub const REED_BELLOWS_ITEM_NAME: &str = "Reed Bellows";
/// Fuel burns 50% slower (lasts 1.5x longer).
pub const BELLOWS_FUEL_BURN_MULTIPLIER: f32 = 1.5;
/// Cooking/smelting runs 20% faster.
pub const BELLOWS_COOKING_SPEED_MULTIPLIER: f32 = 1.2;

/// Check if a Reed Bellows is present in any of the container's slots.
pub fn has_reed_bellows(items: &[Option<PopulatedItem>]) -> bool {
    items
        .iter()
        .flatten()
        .any(|item| item.definition.name == REED_BELLOWS_ITEM_NAME)
}

pub fn fuel_burn_rate_multiplier(items: &[Option<PopulatedItem>]) -> f32 {
    if has_reed_bellows(items) {
        BELLOWS_FUEL_BURN_MULTIPLIER
    } else {
        1.0
    }
}

pub fn cooking_speed_multiplier(items: &[Option<PopulatedItem>]) -> f32 {
    if has_reed_bellows(items) {
        BELLOWS_COOKING_SPEED_MULTIPLIER
    } else {
        1.0
    }
}

/// Durations to show in a tooltip, in whole seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DurationPreview {
    pub burn_secs: Option<u32>,
    pub cook_secs: Option<u32>,
    pub enhanced: bool,
}

/// Tooltip durations for `definition` while it sits in (or hovers over) a
/// container holding `container_items`. Only burners apply the bellows.
pub fn preview_durations(
    definition: &ItemDefinition,
    container_type: ContainerType,
    container_items: &[Option<PopulatedItem>],
) -> DurationPreview {
    let enhanced = container_type.category() == ContainerCategory::Fuel && has_reed_bellows(container_items);
    let (burn_multiplier, cook_multiplier) = if enhanced {
        (BELLOWS_FUEL_BURN_MULTIPLIER, BELLOWS_COOKING_SPEED_MULTIPLIER)
    } else {
        (1.0, 1.0)
    };

    DurationPreview {
        burn_secs: definition
            .fuel_burn_duration_secs
            .map(|secs| round_secs(secs * burn_multiplier)),
        cook_secs: definition
            .cook_time_secs
            .map(|secs| round_secs(secs / cook_multiplier)),
        enhanced,
    }
}

fn round_secs(secs: f32) -> u32 {
    if secs.is_finite() && secs > 0.0 {
        secs.round() as u32
    } else {
        0
    }
}
