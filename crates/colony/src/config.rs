//! Game configuration

use engine2d::config::{Config, ConfigError};
use engine2d::core::ApplicationConfig;
use serde::{Deserialize, Serialize};

/// Everything read from `config.toml`
///
/// Engine sections (`[engine]`, `[physics]`, `[assets]`) sit next to the
/// game's own `[colony]`, `[buildings]` and `[navigation]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Engine configuration
    #[serde(flatten)]
    pub app: ApplicationConfig,
    /// Scene and starting population
    pub colony: ColonyConfig,
    /// Dwelling and mine tuning
    pub buildings: BuildingConfig,
    /// Navigation grid and pathfinding budget
    pub navigation: NavigationConfig,
}

impl GameConfig {
    /// Validate engine and game settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.app.validate()?;
        self.buildings.validate()?;
        self.navigation.validate()
    }
}

impl Config for GameConfig {}

/// Scene and starting population
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonyConfig {
    /// Scene file, relative to the data directory
    pub scene: String,
    /// Dwelling positions in pixels
    pub dwellings: Vec<[f32; 2]>,
    /// Mine positions in pixels
    pub mines: Vec<[f32; 2]>,
    /// Dwarf spawn positions in pixels
    pub dwarves: Vec<[f32; 2]>,
    /// Dwarf walking speed in pixels per second
    pub dwarf_speed: f32,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            scene: "scenes/colony.json".to_string(),
            dwellings: vec![[80.0, 80.0], [400.0, 80.0]],
            mines: vec![[240.0, 400.0]],
            dwarves: vec![[240.0, 240.0], [260.0, 240.0], [280.0, 240.0]],
            dwarf_speed: 50.0,
        }
    }
}

/// Dwelling and mine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingConfig {
    /// Dwarves a single building can be assigned
    pub dwarf_capacity: u32,
    /// Food a dwelling can store
    pub food_capacity: f32,
    /// Fixed steps between two meals in a dwelling
    pub meal_cooldown_frames: u32,
    /// Iron produced per dwarf inside a mine, per fixed step
    pub production_rate: f32,
    /// Iron units per pack handed out by a mine
    pub pack_size: u32,
    /// Iron a mine can hold, packed or not
    pub mine_capacity: u32,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        Self {
            dwarf_capacity: 5,
            food_capacity: 100.0,
            meal_cooldown_frames: 2000,
            production_rate: 0.01,
            pack_size: 20,
            mine_capacity: 100,
        }
    }
}

impl BuildingConfig {
    /// Reject settings the building managers cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dwarf_capacity == 0 {
            return Err(ConfigError::Invalid("dwarf_capacity must be at least 1".to_string()));
        }
        if self.pack_size == 0 {
            return Err(ConfigError::Invalid("pack_size must be at least 1".to_string()));
        }
        if self.food_capacity < 0.0 || self.production_rate < 0.0 {
            return Err(ConfigError::Invalid("building amounts must not be negative".to_string()));
        }
        Ok(())
    }
}

/// Navigation grid and pathfinding budget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Grid width in tiles
    pub width: usize,
    /// Grid height in tiles
    pub height: usize,
    /// Tile size in pixels
    pub tile_size: [f32; 2],
    /// Blocked rectangles as `[x, y, width, height]` in tiles
    pub obstacles: Vec<[usize; 4]>,
    /// Road rectangles as `[x, y, width, height]` in tiles
    pub roads: Vec<[usize; 4]>,
    /// Path requests serviced per update
    pub paths_per_update: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            tile_size: [16.0, 16.0],
            obstacles: vec![[10, 4, 2, 20]],
            roads: vec![[0, 15, 32, 1]],
            paths_per_update: 10,
        }
    }
}

impl NavigationConfig {
    /// Reject grids the pathfinder cannot build
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid("navigation grid must not be empty".to_string()));
        }
        if self.tile_size.iter().any(|extent| *extent <= 0.0) {
            return Err(ConfigError::Invalid("tile_size must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_engine_and_game_tables_share_a_file() {
        let config: GameConfig = toml::from_str(
            "[engine]\ninitial_entity_capacity = 64\n\n[buildings]\ndwarf_capacity = 2\n",
        )
        .unwrap();
        assert_eq!(config.app.engine.initial_entity_capacity, 64);
        assert_eq!(config.buildings.dwarf_capacity, 2);
        assert_eq!(config.buildings.pack_size, 20);
        assert_eq!(config.navigation.paths_per_update, 10);
    }

    #[test]
    fn test_empty_grid_rejected() {
        let mut config = GameConfig::default();
        config.navigation.width = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
