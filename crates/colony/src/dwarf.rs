//! Dwarves: find a home, ask for a path, walk there

use crate::buildings::spawn_at;
use crate::dwelling::DwellingManager;
use crate::navigation::{NavigationSystem, PathTicket};
use engine2d::prelude::*;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// What a dwarf is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwarfTask {
    /// Looking for a dwelling with room
    Homeless,
    /// Waiting for the navigation system to answer
    WaitingForPath(PathTicket),
    /// Following its path home
    Walking,
    /// Inside its dwelling
    AtHome,
    /// Home cannot be reached
    Stranded,
}

#[derive(Debug, Clone)]
struct Dwarf {
    entity: Entity,
    home: Option<Entity>,
    task: DwarfTask,
    path: VecDeque<Vec2>,
}

/// Moves dwarves between the buildings they are assigned to
pub struct DwarfManager {
    registry: SharedRegistry,
    transforms: Weak<RefCell<Transform2dManager>>,
    dwellings: Weak<RefCell<DwellingManager>>,
    navigation: Weak<RefCell<NavigationSystem>>,
    speed: f32,
    dwarves: Vec<Dwarf>,
}

impl DwarfManager {
    /// System name used in scene files
    pub const NAME: &'static str = "dwarf_manager";

    /// Create a manager walking dwarves at `speed` pixels per second
    pub fn new(
        registry: SharedRegistry,
        transforms: &Shared<Transform2dManager>,
        dwellings: &Shared<DwellingManager>,
        navigation: &Shared<NavigationSystem>,
        speed: f32,
    ) -> Self {
        Self {
            registry,
            transforms: Rc::downgrade(transforms),
            dwellings: Rc::downgrade(dwellings),
            navigation: Rc::downgrade(navigation),
            speed,
            dwarves: Vec::new(),
        }
    }

    /// Create a shared manager
    pub fn shared(
        registry: &SharedRegistry,
        transforms: &Shared<Transform2dManager>,
        dwellings: &Shared<DwellingManager>,
        navigation: &Shared<NavigationSystem>,
        speed: f32,
    ) -> Shared<Self> {
        Rc::new(RefCell::new(Self::new(registry.clone(), transforms, dwellings, navigation, speed)))
    }

    /// Spawn a homeless dwarf at `position`
    pub fn spawn_dwarf(&mut self, position: Vec2) -> EcsResult<Entity> {
        let entity = spawn_at(&self.registry, &self.transforms, position)?;
        self.registry.borrow_mut().set_name(entity, format!("Dwarf {}", entity.id()))?;
        self.dwarves.push(Dwarf {
            entity,
            home: None,
            task: DwarfTask::Homeless,
            path: VecDeque::new(),
        });
        Ok(entity)
    }

    /// Every dwarf entity
    pub fn dwarves(&self) -> Vec<Entity> {
        self.dwarves.iter().map(|dwarf| dwarf.entity).collect()
    }

    /// Current task of `entity`
    pub fn task(&self, entity: Entity) -> Option<DwarfTask> {
        self.find(entity).map(|dwarf| dwarf.task)
    }

    /// Dwelling `entity` is assigned to
    pub fn home(&self, entity: Entity) -> Option<Entity> {
        self.find(entity).and_then(|dwarf| dwarf.home)
    }

    /// Dwarves currently inside their dwelling
    pub fn at_home_count(&self) -> usize {
        self.dwarves.iter().filter(|dwarf| dwarf.task == DwarfTask::AtHome).count()
    }

    fn find(&self, entity: Entity) -> Option<&Dwarf> {
        self.dwarves.iter().find(|dwarf| dwarf.entity == entity)
    }

    fn collaborators(
        &self,
    ) -> EcsResult<(Shared<Transform2dManager>, Shared<DwellingManager>, Shared<NavigationSystem>)> {
        let gone = |what: &str| EcsError::init_failure(Self::NAME, format!("{what} is gone"));
        Ok((
            self.transforms.upgrade().ok_or_else(|| gone("transform manager"))?,
            self.dwellings.upgrade().ok_or_else(|| gone("dwelling manager"))?,
            self.navigation.upgrade().ok_or_else(|| gone("navigation system"))?,
        ))
    }
}

impl System for DwarfManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self) -> EcsResult<()> {
        self.collaborators().map(|_| ())
    }

    fn update(&mut self, _delta_time: f32) -> EcsResult<()> {
        let (transforms, dwellings, navigation) = self.collaborators()?;
        let transforms = transforms.borrow();
        let mut dwellings = dwellings.borrow_mut();
        let mut navigation = navigation.borrow_mut();

        for dwarf in &mut self.dwarves {
            match dwarf.task {
                DwarfTask::Homeless => {
                    let Some(home) = dwellings.free_slot() else { continue };
                    let (Some(from), Some(to)) = (transforms.position(dwarf.entity), transforms.position(home)) else {
                        continue;
                    };
                    dwellings.assign_dwarf(home);
                    dwarf.home = Some(home);
                    dwarf.task = DwarfTask::WaitingForPath(navigation.ask_for_path(from, to));
                }
                DwarfTask::WaitingForPath(ticket) => {
                    let Some(path) = navigation.take_path(ticket) else { continue };
                    if path.is_empty() {
                        log::warn!("{} cannot reach its dwelling", dwarf.entity);
                        if let Some(home) = dwarf.home.take() {
                            dwellings.release_dwarf(home);
                        }
                        dwarf.task = DwarfTask::Stranded;
                    } else {
                        dwarf.path = path.into();
                        dwarf.task = DwarfTask::Walking;
                    }
                }
                DwarfTask::Walking | DwarfTask::AtHome | DwarfTask::Stranded => {}
            }
        }
        Ok(())
    }

    fn fixed_update(&mut self, fixed_delta_time: f32) -> EcsResult<()> {
        let (transforms, dwellings, _) = self.collaborators()?;
        let mut transforms = transforms.borrow_mut();
        let mut dwellings = dwellings.borrow_mut();
        let reach = self.speed * fixed_delta_time;

        for dwarf in self.dwarves.iter_mut().filter(|dwarf| dwarf.task == DwarfTask::Walking) {
            let Some(transform) = transforms.try_get_mut(dwarf.entity) else { continue };
            let mut budget = reach;
            while let Some(&waypoint) = dwarf.path.front() {
                let offset = waypoint - transform.position;
                let distance = offset.norm();
                if distance > budget {
                    transform.position += offset / distance * budget;
                    break;
                }
                transform.position = waypoint;
                budget -= distance;
                dwarf.path.pop_front();
            }

            if dwarf.path.is_empty() {
                if let Some(home) = dwarf.home {
                    dwellings.dwarf_enter(home);
                }
                dwarf.task = DwarfTask::AtHome;
            }
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.dwarves.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildingConfig, NavigationConfig};
    use crate::navigation::NavigationGraph;

    struct Colony {
        transforms: Shared<Transform2dManager>,
        dwellings: Shared<DwellingManager>,
        navigation: Shared<NavigationSystem>,
        dwarves: DwarfManager,
    }

    fn colony(obstacles: Vec<[usize; 4]>) -> Colony {
        let registry = EntityRegistry::shared(4);
        let transforms = Transform2dManager::shared(&registry);
        let config = BuildingConfig {
            dwarf_capacity: 1,
            ..BuildingConfig::default()
        };
        let dwellings = DwellingManager::shared(&registry, &transforms, config);
        let grid = NavigationConfig {
            width: 8,
            height: 8,
            tile_size: [10.0, 10.0],
            obstacles,
            roads: Vec::new(),
            paths_per_update: 4,
        };
        let navigation = NavigationSystem::shared(NavigationGraph::from_config(&grid).unwrap(), 4);
        let dwarves = DwarfManager::new(registry, &transforms, &dwellings, &navigation, 100.0);
        Colony {
            transforms,
            dwellings,
            navigation,
            dwarves,
        }
    }

    impl Colony {
        fn frame(&mut self) {
            self.dwarves.update(0.1).unwrap();
            self.navigation.borrow_mut().update(0.1).unwrap();
            self.dwarves.fixed_update(0.1).unwrap();
        }
    }

    #[test]
    fn test_dwarf_walks_home() {
        let mut colony = colony(Vec::new());
        let home = colony.dwellings.borrow_mut().add_building(Vec2::new(75.0, 5.0)).unwrap();
        let dwarf = colony.dwarves.spawn_dwarf(Vec2::new(5.0, 5.0)).unwrap();
        assert!(colony.dwarves.init().is_ok());

        colony.frame();
        assert_eq!(colony.dwarves.home(dwarf), Some(home));
        assert!(matches!(colony.dwarves.task(dwarf), Some(DwarfTask::WaitingForPath(_))));

        colony.frame();
        assert_eq!(colony.dwarves.task(dwarf), Some(DwarfTask::Walking));

        for _ in 0..10 {
            colony.frame();
        }
        assert_eq!(colony.dwarves.task(dwarf), Some(DwarfTask::AtHome));
        assert_eq!(colony.transforms.borrow().position(dwarf), Some(Vec2::new(75.0, 5.0)));
        assert_eq!(colony.dwellings.borrow().slots(home).map(|s| s.inside), Some(1));
        assert_eq!(colony.dwarves.at_home_count(), 1);
    }

    #[test]
    fn test_second_dwarf_stays_homeless_when_full() {
        let mut colony = colony(Vec::new());
        colony.dwellings.borrow_mut().add_building(Vec2::new(75.0, 75.0)).unwrap();
        let first = colony.dwarves.spawn_dwarf(Vec2::new(5.0, 5.0)).unwrap();
        let second = colony.dwarves.spawn_dwarf(Vec2::new(15.0, 5.0)).unwrap();

        colony.frame();
        assert!(colony.dwarves.home(first).is_some());
        assert_eq!(colony.dwarves.task(second), Some(DwarfTask::Homeless));
    }

    #[test]
    fn test_walled_off_dwarf_is_stranded() {
        let mut colony = colony(vec![[3, 0, 1, 8]]);
        let home = colony.dwellings.borrow_mut().add_building(Vec2::new(75.0, 5.0)).unwrap();
        let dwarf = colony.dwarves.spawn_dwarf(Vec2::new(5.0, 5.0)).unwrap();

        colony.frame();
        colony.frame();
        assert_eq!(colony.dwarves.task(dwarf), Some(DwarfTask::Stranded));
        assert_eq!(colony.dwarves.home(dwarf), None);
        assert_eq!(colony.dwellings.borrow().free_slot(), Some(home));
    }
}
