//! Dwarf colony simulation
//!
//! Loads `data/config.toml` (or the path given as first argument), opens the
//! configured scene and lets dwarves settle into their dwellings.

mod buildings;
mod config;
mod dwarf;
mod dwelling;
mod mine;
mod navigation;

use config::GameConfig;
use dwarf::DwarfManager;
use dwelling::DwellingManager;
use engine2d::ecs::SharedSystem;
use engine2d::foundation::logging;
use engine2d::prelude::*;
use mine::MineManager;
use navigation::{NavigationGraph, NavigationSystem};
use std::path::PathBuf;

const STATUS_INTERVAL: f32 = 5.0;

/// Game state handed to the engine loop
struct ColonyApp {
    config: GameConfig,
    dwellings: Option<Shared<DwellingManager>>,
    mines: Option<Shared<MineManager>>,
    dwarves: Option<Shared<DwarfManager>>,
    since_status: f32,
}

impl ColonyApp {
    fn new(config: GameConfig) -> Self {
        Self {
            config,
            dwellings: None,
            mines: None,
            dwarves: None,
            since_status: 0.0,
        }
    }

    fn log_status(&self) {
        let (Some(dwellings), Some(mines), Some(dwarves)) = (&self.dwellings, &self.mines, &self.dwarves) else {
            return;
        };
        let dwellings = dwellings.borrow();
        let mines = mines.borrow();
        let dwarves = dwarves.borrow();

        let packs: u32 = mines
            .buildings()
            .into_iter()
            .filter_map(|mine| mines.store(mine))
            .map(|store| store.packs)
            .sum();
        log::info!(
            "Colony: {}/{} dwarves home, {} dwellings, {} iron packs, unhappiness {}",
            dwarves.at_home_count(),
            dwarves.dwarves().len(),
            dwellings.buildings().len(),
            packs,
            dwellings.unhappiness()
        );
    }
}

fn position([x, y]: [f32; 2]) -> Vec2 {
    Vec2::new(x, y)
}

fn game_logic(error: EcsError) -> AppError {
    AppError::GameLogic(error.to_string())
}

impl Application for ColonyApp {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        let registry = engine.registry().clone();
        let transforms = engine.transforms().clone();

        let graph = NavigationGraph::from_config(&self.config.navigation).map_err(|e| AppError::Config(e.to_string()))?;
        let navigation = NavigationSystem::shared(graph, self.config.navigation.paths_per_update);
        let dwellings = DwellingManager::shared(&registry, &transforms, self.config.buildings.clone());
        let mines = MineManager::shared(&registry, &transforms, self.config.buildings.clone());
        let dwarves = DwarfManager::shared(
            &registry,
            &transforms,
            &dwellings,
            &navigation,
            self.config.colony.dwarf_speed,
        );

        // Scheduling order: requests are answered the frame after they are made
        let systems: [(&str, SharedSystem); 4] = [
            (NavigationSystem::NAME, navigation),
            (DwellingManager::NAME, dwellings.clone()),
            (MineManager::NAME, mines.clone()),
            (DwarfManager::NAME, dwarves.clone()),
        ];
        for (name, system) in &systems {
            let system = system.clone();
            engine.catalog_mut().register(*name, move || system.clone());
        }

        let report = engine.load_scene(&self.config.colony.scene)?;
        if !report.is_clean() {
            log::warn!("Scene `{}` loaded with {} problems", report.name, report.diagnostics.len());
        }
        for (name, system) in systems {
            if engine.scheduler().key_of(name).is_none() {
                log::debug!("Scene did not schedule `{}`, adding it", name);
                engine.add_system(system).map_err(game_logic)?;
            }
        }

        for &spot in &self.config.colony.dwellings {
            dwellings.borrow_mut().add_building(position(spot)).map_err(game_logic)?;
        }
        for &spot in &self.config.colony.mines {
            mines.borrow_mut().add_building(position(spot)).map_err(game_logic)?;
        }
        for &spot in &self.config.colony.dwarves {
            dwarves.borrow_mut().spawn_dwarf(position(spot)).map_err(game_logic)?;
        }
        log::info!(
            "Colony founded: {} dwellings, {} mines, {} dwarves",
            self.config.colony.dwellings.len(),
            self.config.colony.mines.len(),
            self.config.colony.dwarves.len()
        );

        self.dwellings = Some(dwellings);
        self.mines = Some(mines);
        self.dwarves = Some(dwarves);
        Ok(())
    }

    fn update(&mut self, _engine: &mut Engine, delta_time: f32) -> Result<(), AppError> {
        self.since_status += delta_time;
        if self.since_status >= STATUS_INTERVAL {
            self.since_status = 0.0;
            self.log_status();
        }
        Ok(())
    }

    fn cleanup(&mut self, _engine: &mut Engine) {
        self.log_status();
    }
}

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("data/config.toml"), PathBuf::from);
    let config = GameConfig::load_or_default(&config_path);
    logging::init_with_level(&config.app.engine.log_level);
    log::info!("Starting colony with {}", config_path.display());

    if let Err(e) = config.validate() {
        log::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let mut app = ColonyApp::new(config.clone());
    if let Err(e) = Engine::run(config.app, &mut app) {
        log::error!("Colony stopped: {}", e);
        std::process::exit(1);
    }
}
