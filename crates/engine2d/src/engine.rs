//! Core engine implementation

use crate::{
    application::Application,
    assets::FileTextureCatalog,
    core::{ApplicationConfig, ConfigError},
    ecs::{
        components::{
            BehaviorManager, Body2dManager, Collider2dManager, SpriteManager, TileManager, Transform2dManager,
        },
        EcsResult, EntityRegistry, FrameStats, Shared, SharedRegistry, SharedSystem, SystemKey, SystemScheduler,
    },
    editor::Inspector,
    foundation::time::{Stopwatch, Timer},
    scene::{SceneDescriptor, SceneError, SceneLoader, SceneReport, SystemCatalog},
    script::{NativeScriptHost, SharedScriptHost},
};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Main engine struct
///
/// Owns the entity registry, the built-in component managers and the system
/// scheduler, and drives them through the frame pipeline. Managers are wired
/// to their collaborators once, here; nothing reaches back into the engine to
/// find them.
pub struct Engine {
    config: ApplicationConfig,
    registry: SharedRegistry,
    scheduler: SystemScheduler,

    transforms: Shared<Transform2dManager>,
    bodies: Shared<Body2dManager>,
    colliders: Shared<Collider2dManager>,
    behaviors: Shared<BehaviorManager>,
    tiles: Shared<TileManager>,
    sprites: Shared<SpriteManager>,

    scripts: SharedScriptHost,
    loader: SceneLoader,
    catalog: SystemCatalog,
    inspector: Inspector,

    /// Systems added by the current scene, removed on scene switch
    scene_systems: Vec<SystemKey>,
    timer: Timer,
    running: bool,
}

impl Engine {
    /// Create an engine with an empty native script host
    pub fn new(config: ApplicationConfig) -> Result<Self, EngineError> {
        Self::with_script_host(config, NativeScriptHost::new().into_shared())
    }

    /// Create an engine running behaviour and system scripts through `scripts`
    pub fn with_script_host(config: ApplicationConfig, scripts: SharedScriptHost) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!(
            "Initializing engine (capacity {}, fixed step {}s)",
            config.engine.initial_entity_capacity,
            config.engine.fixed_delta_time
        );

        let registry = EntityRegistry::shared(config.engine.initial_entity_capacity);
        registry.borrow_mut().set_max_capacity(config.engine.max_entity_capacity);
        let transforms = Transform2dManager::shared(&registry);
        let bodies = Body2dManager::shared(&registry, &transforms, config.physics.clone());
        let colliders = Collider2dManager::shared(&registry, &transforms);
        let behaviors = BehaviorManager::shared(&registry, scripts.clone());
        let tiles = TileManager::shared(&registry, &transforms);
        let textures = FileTextureCatalog::new(config.assets.data_dir.clone());
        let sprites = SpriteManager::shared(&registry, &transforms, Box::new(textures));

        // Sprites go last so they draw the positions written this frame
        let mut scheduler = SystemScheduler::from_config(&config.engine);
        scheduler.add_system(transforms.clone());
        scheduler.add_system(bodies.clone());
        scheduler.add_system(colliders.clone());
        scheduler.add_system(behaviors.clone());
        scheduler.add_system(tiles.clone());
        scheduler.add_system(sprites.clone());
        let failures = scheduler.init_all();
        if !failures.is_empty() {
            let reasons: Vec<_> = failures.iter().map(ToString::to_string).collect();
            return Err(EngineError::InitializationFailed(reasons.join("; ")));
        }

        let mut loader = SceneLoader::new(registry.clone());
        loader.register_factory(&transforms);
        loader.register_factory(&bodies);
        loader.register_factory(&colliders);
        loader.register_factory(&behaviors);
        loader.register_factory(&tiles);
        loader.register_factory(&sprites);

        let mut inspector = Inspector::new(registry.clone());
        inspector.register(&transforms);
        inspector.register(&bodies);
        inspector.register(&colliders);
        inspector.register(&behaviors);
        inspector.register(&tiles);
        inspector.register(&sprites);

        let catalog = SystemCatalog::new().with_script_host(scripts.clone());

        Ok(Self {
            config,
            registry,
            scheduler,
            transforms,
            bodies,
            colliders,
            behaviors,
            tiles,
            sprites,
            scripts,
            loader,
            catalog,
            inspector,
            scene_systems: Vec::new(),
            timer: Timer::new(),
            running: true,
        })
    }

    /// Run the engine main loop with the given application
    ///
    /// The loop ends when [`quit`](Self::quit) is called or after
    /// `max_frames` frames when the configuration sets it.
    pub fn run<T: Application>(config: ApplicationConfig, app: &mut T) -> Result<(), EngineError> {
        let mut engine = Self::new(config)?;

        app.initialize(&mut engine)
            .map_err(|e| EngineError::ApplicationError(format!("App initialization: {}", e)))?;

        log::info!("Starting main loop...");
        let frame_budget = match engine.config.engine.max_framerate {
            0 => None,
            fps => Some(Duration::from_secs_f64(1.0 / f64::from(fps))),
        };

        while engine.running {
            let delta_time = engine.timer.tick();
            let work = Stopwatch::start_new();

            app.update(&mut engine, delta_time)
                .map_err(|e| EngineError::ApplicationError(format!("App update: {}", e)))?;
            engine.step(delta_time);

            if engine
                .config
                .engine
                .max_frames
                .is_some_and(|max| engine.timer.frame_count() >= max)
            {
                engine.quit();
            }

            if let Some(budget) = frame_budget {
                // Only this frame's work counts; the sleep is not part of it
                if let Some(rest) = budget.checked_sub(work.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        }

        app.cleanup(&mut engine);
        engine.shutdown();

        log::info!(
            "Engine shutdown complete after {} frames ({:.1} fps average)",
            engine.timer.frame_count(),
            engine.timer.average_fps()
        );
        Ok(())
    }

    /// Run one frame of `delta_time` seconds
    pub fn step(&mut self, delta_time: f32) -> FrameStats {
        let stats = self.scheduler.frame(delta_time);
        if self.config.engine.editor {
            if let Some(report) = self.inspector.report() {
                log::trace!("{}", report);
            }
        }
        stats
    }

    /// Switch to the scene file at `path`
    ///
    /// Relative paths that do not exist are looked up under the data directory.
    pub fn load_scene(&mut self, path: impl AsRef<Path>) -> Result<SceneReport, EngineError> {
        let path = path.as_ref();
        let resolved = if path.is_relative() && !path.exists() {
            self.config.assets.data_dir.join(path)
        } else {
            path.to_path_buf()
        };
        let scene = SceneDescriptor::from_path(&resolved)?;
        Ok(self.load_scene_descriptor(&scene))
    }

    /// Switch to an already-parsed scene
    pub fn load_scene_descriptor(&mut self, scene: &SceneDescriptor) -> SceneReport {
        self.clear_scene();
        let report = self.loader.load(scene, &mut self.scheduler, &self.catalog);
        self.scene_systems.clone_from(&report.systems);
        log::info!("Scene Loading Time: {:.3}s", report.elapsed.as_secs_f32());
        report
    }

    /// Drop every entity, component and scene system
    ///
    /// The built-in managers stay scheduled.
    pub fn clear_scene(&mut self) {
        for key in self.scene_systems.drain(..) {
            self.scheduler.remove(key);
        }
        self.scheduler.clear_all();
        self.scheduler.collect_all();
        self.registry.borrow_mut().clear();
        self.inspector.select(None);
    }

    /// Register and initialize a system outside any scene
    ///
    /// A system that fails to initialize stays scheduled but disabled.
    pub fn add_system(&mut self, system: SharedSystem) -> EcsResult<SystemKey> {
        let (key, result) = self.scheduler.add_and_init(system);
        result.map(|()| key)
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// Whether the main loop keeps going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Destroy every system in reverse registration order
    pub fn shutdown(&mut self) {
        self.running = false;
        self.scene_systems.clear();
        self.scheduler.destroy_all();
    }

    /// Engine configuration
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// Entity registry shared with every manager
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// System scheduler
    pub fn scheduler(&self) -> &SystemScheduler {
        &self.scheduler
    }

    /// Mutable system scheduler
    pub fn scheduler_mut(&mut self) -> &mut SystemScheduler {
        &mut self.scheduler
    }

    /// Transform manager
    pub fn transforms(&self) -> &Shared<Transform2dManager> {
        &self.transforms
    }

    /// Body manager
    pub fn bodies(&self) -> &Shared<Body2dManager> {
        &self.bodies
    }

    /// Collider manager
    pub fn colliders(&self) -> &Shared<Collider2dManager> {
        &self.colliders
    }

    /// Behaviour manager
    pub fn behaviors(&self) -> &Shared<BehaviorManager> {
        &self.behaviors
    }

    /// Tile manager
    pub fn tiles(&self) -> &Shared<TileManager> {
        &self.tiles
    }

    /// Sprite manager
    pub fn sprites(&self) -> &Shared<SpriteManager> {
        &self.sprites
    }

    /// Script host shared by behaviours and scripted systems
    pub fn script_host(&self) -> &SharedScriptHost {
        &self.scripts
    }

    /// Catalog used to resolve scene systems
    pub fn catalog_mut(&mut self) -> &mut SystemCatalog {
        &mut self.catalog
    }

    /// Scene loader, for registering extra component factories
    pub fn loader_mut(&mut self) -> &mut SceneLoader {
        &mut self.loader
    }

    /// Entity inspector
    pub fn inspector_mut(&mut self) -> &mut Inspector {
        &mut self.inspector
    }

    /// Frame timer
    pub fn timer(&self) -> &Timer {
        &self.timer
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Initialization error
    #[error("Engine initialization failed: {0}")]
    InitializationFailed(String),

    /// Scene could not be read
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Application error
    #[error("Application error: {0}")]
    ApplicationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
