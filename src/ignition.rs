/******************************************************************************
 *                                                                            *
 * Burner toggle gating. A burner can only be lit with valid fuel inside,    *
 * and a campfire standing in heavy rain or a storm stays dark unless a      *
 * shelter or a living tree covers it. Putting a fire out is always allowed. *
 *                                                                            *
 ******************************************************************************/

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::container_entities::ContainerEntity;
use crate::error::DispatchError;
use crate::models::{ContainerType, PopulatedItem};
use crate::reducer_names::{OperationKind, ReducerTarget};
use crate::remote::ReducerCall;
use crate::transfer_dispatch::{ArgValues, TransferDispatcher};

// --- World grid constants (must match the server) ---
pub const TILE_SIZE_PX: u32 = 48;
pub const WORLD_WIDTH_TILES: u32 = 250;
pub const CHUNK_SIZE_TILES: u32 = 10;
pub const WORLD_WIDTH_CHUNKS: u32 = (WORLD_WIDTH_TILES + CHUNK_SIZE_TILES - 1) / CHUNK_SIZE_TILES;

// --- Shelter AABB ---
pub const SHELTER_COLLISION_WIDTH: f32 = 300.0;
pub const SHELTER_COLLISION_HEIGHT: f32 = 125.0;
pub const SHELTER_AABB_HALF_WIDTH: f32 = SHELTER_COLLISION_WIDTH / 2.0;
pub const SHELTER_AABB_HALF_HEIGHT: f32 = SHELTER_COLLISION_HEIGHT / 2.0; // 62.5
/// AABB_center_y = shelter.pos_y - SHELTER_AABB_CENTER_Y_OFFSET_FROM_POS_Y.
pub const SHELTER_AABB_CENTER_Y_OFFSET_FROM_POS_Y: f32 = 200.0;

pub const TREE_PROTECTION_DISTANCE_SQ: f32 = 100.0 * 100.0; // 100px protection radius

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WeatherType {
    #[default]
    Clear,
    LightRain,
    ModerateRain,
    HeavyRain,
    HeavyStorm, // Intense rain with thunder and lightning
}

impl WeatherType {
    /// Only heavy rain and storms put out (or keep out) an open flame.
    pub fn blocks_ignition(&self) -> bool {
        matches!(self, WeatherType::HeavyRain | WeatherType::HeavyStorm)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShelterSnapshot {
    pub id: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    #[serde(default)]
    pub is_destroyed: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TreeSnapshot {
    pub id: u64,
    pub pos_x: f32,
    pub pos_y: f32,
    /// Set while the tree is harvested and waiting to regrow.
    #[serde(default)]
    pub respawn_at: Option<DateTime<Utc>>,
}

/// What the client currently knows about the surroundings of a burner.
#[derive(Clone, Copy, Debug)]
pub struct IgnitionEnvironment<'a> {
    pub chunk_weather: &'a HashMap<u32, WeatherType>,
    pub shelters: &'a [ShelterSnapshot],
    pub trees: &'a [TreeSnapshot],
}

impl IgnitionEnvironment<'_> {
    /// Chunks without a weather row are clear.
    pub fn weather_at(&self, pos_x: f32, pos_y: f32) -> WeatherType {
        self.chunk_weather
            .get(&calculate_chunk_index(pos_x, pos_y))
            .copied()
            .unwrap_or_default()
    }
}

// --- Helper function to calculate chunk index ---
pub fn calculate_chunk_index(pos_x: f32, pos_y: f32) -> u32 {
    let tile_x = (pos_x / TILE_SIZE_PX as f32).floor().max(0.0) as u32;
    let tile_y = (pos_y / TILE_SIZE_PX as f32).floor().max(0.0) as u32;

    let chunk_x = (tile_x / CHUNK_SIZE_TILES).min(WORLD_WIDTH_CHUNKS - 1);
    let chunk_y = (tile_y / CHUNK_SIZE_TILES).min(WORLD_WIDTH_CHUNKS - 1);

    // Row-major
    chunk_y * WORLD_WIDTH_CHUNKS + chunk_x
}

/// Inside a standing shelter's AABB, or within 100px of a living tree.
pub fn is_protected_from_rain(pos_x: f32, pos_y: f32, env: &IgnitionEnvironment<'_>) -> bool {
    for shelter in env.shelters.iter().filter(|s| !s.is_destroyed) {
        let center_y = shelter.pos_y - SHELTER_AABB_CENTER_Y_OFFSET_FROM_POS_Y;
        let inside_x = pos_x >= shelter.pos_x - SHELTER_AABB_HALF_WIDTH && pos_x <= shelter.pos_x + SHELTER_AABB_HALF_WIDTH;
        let inside_y = pos_y >= center_y - SHELTER_AABB_HALF_HEIGHT && pos_y <= center_y + SHELTER_AABB_HALF_HEIGHT;
        if inside_x && inside_y {
            log::debug!("[Ignition] ({:.1}, {:.1}) sheltered by {}", pos_x, pos_y, shelter.id);
            return true;
        }
    }

    env.trees.iter().filter(|t| t.respawn_at.is_none()).any(|tree| {
        let dx = pos_x - tree.pos_x;
        let dy = pos_y - tree.pos_y;
        dx * dx + dy * dy <= TREE_PROTECTION_DISTANCE_SQ
    })
}

/// An occupied slot whose item actually burns.
pub fn has_valid_fuel(items: &[Option<PopulatedItem>]) -> bool {
    items
        .iter()
        .flatten()
        .any(|item| item.definition.fuel_burn_duration_secs.is_some_and(|secs| secs > 0.0) && item.instance.quantity > 0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleAvailability {
    Enabled,
    NoFuel,
    BlockedByWeather,
}

impl ToggleAvailability {
    pub fn is_enabled(&self) -> bool {
        *self == ToggleAvailability::Enabled
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ToggleAvailability::Enabled => None,
            ToggleAvailability::NoFuel => Some("Needs fuel to ignite"),
            ToggleAvailability::BlockedByWeather => Some("Too wet to ignite here; find shelter or tree cover"),
        }
    }
}

/// Whether the burn toggle of `container` is actionable right now.
pub fn toggle_availability(
    container: &ContainerEntity,
    items: &[Option<PopulatedItem>],
    env: &IgnitionEnvironment<'_>,
) -> ToggleAvailability {
    if container.is_burning() == Some(true) {
        return ToggleAvailability::Enabled;
    }
    if !has_valid_fuel(items) {
        return ToggleAvailability::NoFuel;
    }
    if container.container_type() == ContainerType::Campfire {
        let (pos_x, pos_y) = container.position();
        if env.weather_at(pos_x, pos_y).blocks_ignition() && !is_protected_from_rain(pos_x, pos_y, env) {
            return ToggleAvailability::BlockedByWeather;
        }
    }
    ToggleAvailability::Enabled
}

/// Lights or extinguishes a burner. Lanterns take the explicit light /
/// extinguish pair, campfires and furnaces a single toggle.
pub fn toggle_burning(
    dispatcher: &TransferDispatcher,
    container: &ContainerEntity,
    items: &[Option<PopulatedItem>],
    env: &IgnitionEnvironment<'_>,
) -> Result<ReducerCall, DispatchError> {
    let container_type = container.container_type();
    if container.is_burning().is_none() {
        return dispatcher.report(Err(DispatchError::Unsupported {
            target: ReducerTarget::Container(container_type),
            op: OperationKind::Toggle,
        }));
    }
    let availability = toggle_availability(container, items, env);
    if let Some(reason) = availability.reason() {
        return dispatcher.report(Err(DispatchError::NotPermitted(reason.to_string())));
    }

    let op = match (container_type, container.is_burning()) {
        (ContainerType::Lantern, Some(true)) => OperationKind::Extinguish,
        (ContainerType::Lantern, _) => OperationKind::Light,
        _ => OperationKind::Toggle,
    };
    let values = ArgValues { container_id: Some(container.id()), ..ArgValues::default() };
    dispatcher.dispatch_operation(ReducerTarget::Container(container_type), op, &values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container_entities::{CampfireRecord, LanternRecord, SlotFields, StashRecord};
    use crate::error::ErrorKind;
    use crate::remote::ReducerArg;
    use crate::test_support::{populated, RecordingInvoker};

    fn campfire_at(pos_x: f32, pos_y: f32, is_burning: bool) -> ContainerEntity {
        ContainerEntity::Campfire(CampfireRecord { id: 7, pos_x, pos_y, is_burning, attached_broth_pot_id: None, slots: SlotFields::new() })
    }

    fn fuel() -> Vec<Option<PopulatedItem>> {
        let mut wood = populated(1, "Wood", 5);
        wood.definition.fuel_burn_duration_secs = Some(5.0);
        vec![Some(wood), None]
    }

    fn storm_at(pos_x: f32, pos_y: f32) -> HashMap<u32, WeatherType> {
        [(calculate_chunk_index(pos_x, pos_y), WeatherType::HeavyStorm)].into_iter().collect()
    }

    #[test]
    fn chunk_index_is_row_major_and_clamped() {
        assert_eq!(WORLD_WIDTH_CHUNKS, 25);
        assert_eq!(calculate_chunk_index(0.0, 0.0), 0);
        assert_eq!(calculate_chunk_index(480.0, 0.0), 1);
        assert_eq!(calculate_chunk_index(0.0, 480.0), 25);
        assert_eq!(calculate_chunk_index(1_000_000.0, 1_000_000.0), 24 * 25 + 24);
    }

    #[test]
    fn shelter_aabb_sits_above_its_base() {
        let shelters = [ShelterSnapshot { id: 1, pos_x: 1000.0, pos_y: 1000.0, is_destroyed: false }];
        let weather = HashMap::new();
        let env = IgnitionEnvironment { chunk_weather: &weather, shelters: &shelters, trees: &[] };
        assert!(is_protected_from_rain(1000.0, 800.0, &env));
        assert!(is_protected_from_rain(1150.0, 862.5, &env));
        assert!(!is_protected_from_rain(1000.0, 1000.0, &env));
        assert!(!is_protected_from_rain(1151.0, 800.0, &env));

        let destroyed = [ShelterSnapshot { is_destroyed: true, ..shelters[0].clone() }];
        let env = IgnitionEnvironment { shelters: &destroyed, ..env };
        assert!(!is_protected_from_rain(1000.0, 800.0, &env));
    }

    #[test]
    fn only_living_trees_give_cover() {
        let weather = HashMap::new();
        let trees = [
            TreeSnapshot { id: 1, pos_x: 0.0, pos_y: 0.0, respawn_at: Some(Utc::now()) },
            TreeSnapshot { id: 2, pos_x: 500.0, pos_y: 500.0, respawn_at: None },
        ];
        let env = IgnitionEnvironment { chunk_weather: &weather, shelters: &[], trees: &trees };
        assert!(!is_protected_from_rain(10.0, 10.0, &env));
        assert!(is_protected_from_rain(560.0, 580.0, &env));
        assert!(!is_protected_from_rain(600.0, 600.0, &env));
    }

    #[test]
    fn storm_blocks_an_exposed_campfire_only() {
        let weather = storm_at(100.0, 100.0);
        let env = IgnitionEnvironment { chunk_weather: &weather, shelters: &[], trees: &[] };
        assert_eq!(toggle_availability(&campfire_at(100.0, 100.0, false), &fuel(), &env), ToggleAvailability::BlockedByWeather);
        // Burning fires can always be put out.
        assert_eq!(toggle_availability(&campfire_at(100.0, 100.0, true), &fuel(), &env), ToggleAvailability::Enabled);
        // Different chunk, clear sky.
        assert_eq!(toggle_availability(&campfire_at(5000.0, 5000.0, false), &fuel(), &env), ToggleAvailability::Enabled);

        let trees = [TreeSnapshot { id: 3, pos_x: 150.0, pos_y: 100.0, respawn_at: None }];
        let covered = IgnitionEnvironment { trees: &trees, ..env };
        assert_eq!(toggle_availability(&campfire_at(100.0, 100.0, false), &fuel(), &covered), ToggleAvailability::Enabled);
    }

    #[test]
    fn no_fuel_disables_the_toggle() {
        let weather = HashMap::new();
        let env = IgnitionEnvironment { chunk_weather: &weather, shelters: &[], trees: &[] };
        let stone = vec![Some(populated(1, "Stone", 5))];
        assert_eq!(toggle_availability(&campfire_at(0.0, 0.0, false), &stone, &env), ToggleAvailability::NoFuel);
        assert_eq!(toggle_availability(&campfire_at(0.0, 0.0, false), &[None], &env), ToggleAvailability::NoFuel);
    }

    #[test]
    fn toggle_dispatch_by_container_kind() {
        let invoker = RecordingInvoker::new();
        let d = TransferDispatcher::new(invoker.clone());
        let weather = storm_at(0.0, 0.0);
        let env = IgnitionEnvironment { chunk_weather: &weather, shelters: &[], trees: &[] };

        let lantern = |is_burning| {
            ContainerEntity::Lantern(LanternRecord { id: 2, pos_x: 0.0, pos_y: 0.0, is_burning, slots: SlotFields::new() })
        };
        assert_eq!(toggle_burning(&d, &lantern(false), &fuel(), &env).unwrap().reducer.as_str(), "lightLantern");
        assert_eq!(toggle_burning(&d, &lantern(true), &fuel(), &env).unwrap().reducer.as_str(), "extinguishLantern");

        let call = toggle_burning(&d, &campfire_at(0.0, 0.0, true), &fuel(), &env).unwrap();
        assert_eq!(call.reducer.as_str(), "toggleCampfireBurning");
        assert_eq!(call.args, vec![ReducerArg::U32(7)]);

        let err = toggle_burning(&d, &campfire_at(0.0, 0.0, false), &fuel(), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SemanticRejection);

        let stash = ContainerEntity::Stash(StashRecord {
            id: 1,
            pos_x: 0.0,
            pos_y: 0.0,
            placed_by: "aa".into(),
            is_hidden: false,
            last_surfaced_by: None,
            slots: SlotFields::new(),
        });
        let err = toggle_burning(&d, &stash, &fuel(), &IgnitionEnvironment { chunk_weather: &HashMap::new(), ..env }).unwrap_err();
        assert!(matches!(err, DispatchError::Unsupported { .. }));
        assert_eq!(invoker.calls().len(), 3);
    }
}
