//! Dense component storage
//!
//! [`ComponentManager`] is the one generic implementation of the
//! add/destroy/resize skeleton every component kind shares. Payloads live in a
//! `Vec<T>` where index `i` belongs to entity `i + 1`; occupancy is tracked only
//! by the registry mask, never by the store.

use super::{Component, EcsError, EcsResult, Entity, ResizeObserver, SharedRegistry};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a manager or system
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap `manager` for sharing and subscribe it to registry growth
pub fn share_observer<M: ResizeObserver + 'static>(manager: M, registry: &SharedRegistry) -> Shared<M> {
    let manager = Rc::new(RefCell::new(manager));
    let observer: Rc<RefCell<dyn ResizeObserver>> = manager.clone();
    registry.borrow_mut().register_observer(Rc::downgrade(&observer));
    manager
}

/// Storage and lifecycle for one component kind
pub struct ComponentManager<T: Component> {
    registry: SharedRegistry,
    components: Vec<T>,
    pending_destroy: Vec<Entity>,
}

impl<T: Component> ComponentManager<T> {
    /// Create a store sized to the registry's current capacity
    pub fn new(registry: SharedRegistry) -> Self {
        let capacity = registry.borrow().capacity();
        let mut components = Vec::with_capacity(capacity);
        components.resize_with(capacity, T::default);
        Self {
            registry,
            components,
            pending_destroy: Vec::new(),
        }
    }

    /// Registry this store is indexed against
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Attach a default-initialized component to an existing entity
    ///
    /// The returned reference is valid until the next call that can resize
    /// this store.
    pub fn add_component(&mut self, entity: Entity) -> EcsResult<&mut T> {
        {
            let registry = self.registry.borrow();
            if !registry.is_alive(entity) {
                return Err(EcsError::InvalidEntity { entity, capacity: registry.capacity() });
            }
        }

        let index = entity.index();
        if index >= self.components.len() {
            self.components.resize_with(index + 1, T::default);
        }
        self.registry.borrow_mut().add_component_type(entity, T::KIND)?;

        let component = &mut self.components[index];
        *component = T::default();
        component.on_create(entity);
        Ok(component)
    }

    /// Detach the component; calling it again is a no-op
    ///
    /// The payload is left in place and must not be read until re-added.
    pub fn destroy_component(&mut self, entity: Entity) -> EcsResult<()> {
        if !self.has_component(entity)? {
            return Ok(());
        }
        if let Some(component) = self.components.get_mut(entity.index()) {
            component.on_destroy(entity);
        }
        self.registry.borrow_mut().remove_component_type(entity, T::KIND)
    }

    /// Registry bit test for this kind
    pub fn has_component(&self, entity: Entity) -> EcsResult<bool> {
        self.registry.borrow().has_component(entity, T::KIND)
    }

    /// Live component of `entity`
    pub fn get(&self, entity: Entity) -> EcsResult<&T> {
        self.check_present(entity)?;
        Ok(&self.components[entity.index()])
    }

    /// Live component of `entity`, mutably
    pub fn get_mut(&mut self, entity: Entity) -> EcsResult<&mut T> {
        self.check_present(entity)?;
        Ok(&mut self.components[entity.index()])
    }

    /// Live component of `entity`, or `None` for any failure
    pub fn try_get(&self, entity: Entity) -> Option<&T> {
        self.get(entity).ok()
    }

    /// Live component of `entity` mutably, or `None` for any failure
    pub fn try_get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.get_mut(entity).ok()
    }

    /// Defer destruction until [`apply_pending_destroys`](Self::apply_pending_destroys)
    pub fn queue_destroy(&mut self, entity: Entity) {
        if !self.pending_destroy.contains(&entity) {
            self.pending_destroy.push(entity);
        }
    }

    /// Destroy every queued component, returning how many were removed
    pub fn apply_pending_destroys(&mut self) -> usize {
        let mut destroyed = 0;
        for entity in std::mem::take(&mut self.pending_destroy) {
            match self.has_component(entity) {
                Ok(true) => {
                    if let Err(e) = self.destroy_component(entity) {
                        log::warn!("Deferred destroy of {} {} failed: {}", T::KIND, entity, e);
                    } else {
                        destroyed += 1;
                    }
                }
                Ok(false) => {}
                Err(e) => log::warn!("Deferred destroy of {} {} skipped: {}", T::KIND, entity, e),
            }
        }
        destroyed
    }

    /// Number of queued destructions
    pub fn pending_destroy_count(&self) -> usize {
        self.pending_destroy.len()
    }

    /// Entities carrying this kind, ascending
    pub fn entities(&self) -> Vec<Entity> {
        self.registry.borrow().entities_with(T::KIND.mask())
    }

    /// Number of live components
    pub fn count(&self) -> usize {
        self.entities().len()
    }

    /// Live components with their entities
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        let entities = self.entities();
        entities
            .into_iter()
            .filter_map(move |entity| self.components.get(entity.index()).map(|c| (entity, c)))
    }

    /// Live components with their entities, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        let live = self.live_flags();
        self.components
            .iter_mut()
            .zip(live)
            .enumerate()
            .filter(|(_, (_, live))| *live)
            .map(|(index, (component, _))| (Entity::from_index(index), component))
    }

    /// Number of payload slots; always at least the registry capacity once resized
    pub fn store_len(&self) -> usize {
        self.components.len()
    }

    /// Grow the store to `capacity`, keeping every index in place
    pub fn resize(&mut self, capacity: usize) {
        if capacity > self.components.len() {
            self.components.resize_with(capacity, T::default);
        }
    }

    /// Detach every component of this kind and reset payloads
    pub fn clear(&mut self) {
        let entities = self.entities();
        let mut registry = self.registry.borrow_mut();
        for entity in entities {
            if let Some(component) = self.components.get_mut(entity.index()) {
                component.on_destroy(entity);
                *component = T::default();
            }
            if let Err(e) = registry.remove_component_type(entity, T::KIND) {
                log::warn!("Failed to clear {} of {}: {}", T::KIND, entity, e);
            }
        }
        self.pending_destroy.clear();
    }

    /// Release spare memory beyond the registry capacity
    pub fn collect(&mut self) {
        let capacity = self.registry.borrow().capacity();
        if self.components.len() > capacity {
            self.components.truncate(capacity);
        }
        self.components.shrink_to_fit();
        self.pending_destroy.shrink_to_fit();
    }

    fn check_present(&self, entity: Entity) -> EcsResult<()> {
        if self.has_component(entity)? && entity.index() < self.components.len() {
            Ok(())
        } else {
            Err(EcsError::MissingComponent { entity, kind: T::KIND })
        }
    }

    fn live_flags(&self) -> Vec<bool> {
        let registry = self.registry.borrow();
        (0..self.components.len())
            .map(|index| {
                registry
                    .get_mask(Entity::from_index(index))
                    .is_ok_and(|mask| mask.has(T::KIND))
            })
            .collect()
    }
}

impl<T: Component> ResizeObserver for ComponentManager<T> {
    fn on_resize(&mut self, capacity: usize) {
        self.resize(capacity);
    }
}
