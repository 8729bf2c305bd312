// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! World: central entity and archetype storage.

use std::any::TypeId;
use std::ptr::NonNull;

use ahash::AHashMap;
use slotmap::SlotMap;
use tracing::debug;

use crate::archetype::{Archetype, ArchetypeSignature};
use crate::component::{Bundle, Component, ComponentId, ComponentRegistry};
use crate::entity::{Entity, EntityLocation};
use crate::error::{Result, SimError};
use crate::query::{Filter, QueryFetch, QueryFetchMut, QueryFilter, QueryIter, QueryIterMut};

/// Central ECS world: entity identity, archetype storage, and the
/// component registry that gives archetype shapes a stable canonical order.
pub struct World {
    id: u64,
    entity_locations: SlotMap<Entity, EntityLocation>,
    recycled_entities: usize,
    archetypes: Vec<Archetype>,
    archetype_index: AHashMap<ArchetypeSignature, usize>,
    registry: ComponentRegistry,
    tick: u32,
    resources: AHashMap<TypeId, Box<dyn std::any::Any + Send + Sync>>,
}

impl World {
    pub fn new() -> Self {
        let mut world = Self {
            id: rand::random(),
            entity_locations: SlotMap::with_key(),
            recycled_entities: 0,
            archetypes: Vec::new(),
            archetype_index: AHashMap::new(),
            registry: ComponentRegistry::new(),
            tick: 0,
            resources: AHashMap::new(),
        };
        // The empty archetype (entities with no components) always lives at
        // index 0; this simplifies lookups elsewhere.
        world.get_or_create_archetype_with(&ArchetypeSignature::new(), |_| {});
        world
    }

    /// Identifies this `World` instance so a `Filter` built against one
    /// world can be recognized as misused against another. Random rather
    /// than a counter, so no process-global mutable state is needed.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Advance the tick counter. Called once per `Scheduler::step`.
    pub fn increment_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    /// Discard every entity and archetype and zero the tick (P6).
    pub fn reset(&mut self) {
        self.entity_locations.clear();
        self.recycled_entities = 0;
        self.archetypes.clear();
        self.archetype_index.clear();
        self.tick = 0;
        self.get_or_create_archetype_with(&ArchetypeSignature::new(), |_| {});
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Create an entity with the given bundle of components (§4.1
    /// `create_entity`).
    pub fn create_entity<B: Bundle>(&mut self, bundle: B) -> Entity {
        let placeholder = EntityLocation {
            archetype_id: usize::MAX,
            archetype_row: usize::MAX,
        };
        let entity = self.entity_locations.insert(placeholder);
        if self.recycled_entities > 0 {
            self.recycled_entities -= 1;
        }

        let ids = B::component_ids(&mut self.registry);
        let mut signature: ArchetypeSignature = ids.to_vec();
        signature.sort();
        signature.dedup();

        let arch_id = self.get_or_create_archetype_with(&signature, |archetype| {
            B::register_columns(archetype, &ids);
        });

        let archetype = &mut self.archetypes[arch_id];
        let row = archetype.allocate_row(entity);

        let mut ptrs: smallvec::SmallVec<[*mut u8; crate::component::MAX_BUNDLE_COMPONENTS]> =
            smallvec::SmallVec::new();
        for &id in ids.iter() {
            let ptr = archetype
                .get_column_mut(id)
                .expect("column registered above")
                .get_ptr_mut(row);
            ptrs.push(ptr);
        }

        unsafe {
            bundle.write_components(&ptrs);
        }

        if let Some(loc) = self.entity_locations.get_mut(entity) {
            *loc = EntityLocation {
                archetype_id: arch_id,
                archetype_row: row,
            };
        }

        entity
    }

    pub fn alive(&self, entity: Entity) -> bool {
        self.entity_locations.contains_key(entity)
    }

    /// Remove an entity and all its components (§4.1 `remove_entity`).
    /// A no-op (not an error) if the entity is already dead, matching the
    /// "failure semantics never panic" contract for dead-handle operations
    /// that return values rather than signal state changes.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<()> {
        let Some(location) = self.entity_locations.remove(entity) else {
            debug!(?entity, "remove_entity called on a dead or unknown entity handle");
            return Err(SimError::EntityNotFound);
        };

        let archetype = &mut self.archetypes[location.archetype_id];
        unsafe {
            if let Some(swapped) = archetype.remove_row(location.archetype_row) {
                if let Some(loc) = self.entity_locations.get_mut(swapped) {
                    loc.archetype_row = location.archetype_row;
                }
            }
        }
        self.recycled_entities += 1;
        Ok(())
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        let Some(location) = self.entity_locations.get(entity) else {
            return false;
        };
        let Some(id) = self.registry.id_of::<T>() else {
            return false;
        };
        self.archetypes[location.archetype_id].has_column(id)
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let Some(location) = self.entity_locations.get(entity) else {
            debug!(?entity, "get called on a dead or unknown entity handle");
            return None;
        };
        let id = self.registry.id_of::<T>()?;
        let archetype = self.archetypes.get(location.archetype_id)?;
        archetype.get_column(id)?.get::<T>(location.archetype_row)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let Some(location) = self.entity_locations.get(entity) else {
            debug!(?entity, "get_mut called on a dead or unknown entity handle");
            return None;
        };
        let id = self.registry.id_of::<T>()?;
        let archetype = self.archetypes.get_mut(location.archetype_id)?;
        archetype
            .get_column_mut(id)?
            .get_mut::<T>(location.archetype_row)
    }

    /// Add a component to an entity, migrating it to a new archetype
    /// (§4.1 `add_component`). Overwrites in place if the entity already
    /// carries `T`.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<()> {
        let location = *self
            .entity_locations
            .get(entity)
            .ok_or(SimError::EntityNotFound)?;
        let id = self.registry.register::<T>();

        let old_archetype = &mut self.archetypes[location.archetype_id];
        if let Some(col) = old_archetype.get_column_mut(id) {
            let ptr = col.get_ptr_mut(location.archetype_row) as *mut T;
            unsafe {
                std::ptr::write(ptr, component);
            }
            return Ok(());
        }

        let mut new_signature = old_archetype.signature().clone();
        new_signature.push(id);
        new_signature.sort();

        let mut columns_to_add = Vec::with_capacity(new_signature.len());
        for &cid in old_archetype.signature() {
            if let Some(col) = old_archetype.get_column(cid) {
                columns_to_add.push((cid, col.clone_empty()));
            }
        }

        let new_archetype_id = self.get_or_create_archetype_with(&new_signature, |archetype| {
            for (cid, col) in columns_to_add {
                archetype.add_column_raw(cid, col);
            }
            archetype.register_component::<T>(id);
        });

        self.move_entity(entity, location, new_archetype_id, None, move |archetype, row| {
            if let Some(col) = archetype.get_column_mut(id) {
                let ptr = col.get_ptr_mut(row) as *mut T;
                unsafe {
                    std::ptr::write(ptr, component);
                }
            }
        })
    }

    /// Remove a component from an entity, migrating it to a new archetype
    /// (§4.1 `remove_component`).
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<()> {
        let old_location = self
            .entity_locations
            .get(entity)
            .copied()
            .ok_or(SimError::EntityNotFound)?;
        let id = self
            .registry
            .id_of::<T>()
            .ok_or(SimError::ComponentNotFound)?;
        let old_archetype = &self.archetypes[old_location.archetype_id];
        if !old_archetype.has_column(id) {
            return Err(SimError::ComponentNotFound);
        }

        let mut new_signature = old_archetype.signature().clone();
        new_signature.retain(|&cid| cid != id);

        let mut columns_to_add = Vec::with_capacity(new_signature.len());
        for &cid in &new_signature {
            if let Some(col) = old_archetype.get_column(cid) {
                columns_to_add.push((cid, col.clone_empty()));
            }
        }

        let new_archetype_id = self.get_or_create_archetype_with(&new_signature, |archetype| {
            for (cid, col) in columns_to_add {
                archetype.add_column_raw(cid, col);
            }
        });

        self.move_entity(entity, old_location, new_archetype_id, Some(id), |_, _| {})
    }

    /// Move an entity's row from its current archetype into
    /// `new_archetype_id`, copying every component the two archetypes share
    /// and running `on_new_location` to fill in whatever the destination
    /// adds. `dropped_component`, if given, names a component present only
    /// in the source archetype whose value must be dropped rather than
    /// carried forward (the component a `remove_component` call is
    /// removing). Every other source-only value is impossible by
    /// construction: `add_component`/`remove_component` only ever add or
    /// remove exactly one component relative to the entity's current shape.
    fn move_entity<F>(
        &mut self,
        entity: Entity,
        old_loc: EntityLocation,
        new_archetype_id: usize,
        dropped_component: Option<ComponentId>,
        on_new_location: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Archetype, usize),
    {
        if old_loc.archetype_id == new_archetype_id {
            on_new_location(&mut self.archetypes[new_archetype_id], old_loc.archetype_row);
            return Ok(());
        }

        let (old_arch, new_arch) = if old_loc.archetype_id < new_archetype_id {
            let (left, right) = self.archetypes.split_at_mut(new_archetype_id);
            (&mut left[old_loc.archetype_id], &mut right[0])
        } else {
            let (left, right) = self.archetypes.split_at_mut(old_loc.archetype_id);
            (&mut right[0], &mut left[new_archetype_id])
        };

        let new_row = new_arch.allocate_row(entity);

        // Every shared column's bytes are memcpy'd into the new archetype;
        // the old archetype's copy is never dropped for these (see
        // `Archetype::take_row`), so ownership transfers exactly once.
        for &id in new_arch.signature().clone().iter() {
            if let (Some(old_col), Some(new_col)) =
                (old_arch.get_column_mut(id), new_arch.get_column_mut(id))
            {
                unsafe {
                    let src = old_col.get_ptr_mut(old_loc.archetype_row);
                    let dst = new_col.get_ptr_mut(new_row);
                    std::ptr::copy_nonoverlapping(src, dst, old_col.item_size());
                }
            }
        }

        on_new_location(new_arch, new_row);

        unsafe {
            if let Some(id) = dropped_component {
                old_arch.drop_value_in_column(id, old_loc.archetype_row);
            }
            if let Some(swapped) = old_arch.take_row(old_loc.archetype_row) {
                if let Some(loc) = self.entity_locations.get_mut(swapped) {
                    loc.archetype_row = old_loc.archetype_row;
                }
            }
        }

        if let Some(loc) = self.entity_locations.get_mut(entity) {
            loc.archetype_id = new_archetype_id;
            loc.archetype_row = new_row;
        }

        Ok(())
    }

    /// Build a filter once (resolving/registering its component ids) then
    /// reuse it across `query`/`query_mut` calls.
    pub fn filter<Q: QueryFilter>(&mut self) -> Filter<Q> {
        Filter::new(self)
    }

    pub fn query<'w, Q>(&'w self, filter: &Filter<Q>) -> QueryIter<'w, Q>
    where
        Q: QueryFilter + QueryFetch<'w>,
    {
        QueryIter::new(self, filter)
    }

    pub fn query_mut<'w, Q>(&'w mut self, filter: &Filter<Q>) -> QueryIterMut<'w, Q>
    where
        Q: QueryFilter + QueryFetchMut<'w>,
    {
        QueryIterMut::new(self, filter)
    }

    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub fn get_archetype(&self, id: usize) -> Option<&Archetype> {
        self.archetypes.get(id)
    }

    pub(crate) fn archetype_ptr_mut(&mut self, id: usize) -> Option<NonNull<Archetype>> {
        self.archetypes.get_mut(id).map(NonNull::from)
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entity_locations.len()
    }

    pub fn recycled_entity_count(&self) -> usize {
        self.recycled_entities
    }

    // ===== Resources (typed singletons) =====

    pub fn insert_resource<R: Send + Sync + 'static>(&mut self, resource: R) {
        self.resources.insert(TypeId::of::<R>(), Box::new(resource));
    }

    pub fn resource<R: 'static>(&self) -> Option<&R> {
        self.resources
            .get(&TypeId::of::<R>())
            .and_then(|r| r.downcast_ref())
    }

    pub fn resource_mut<R: 'static>(&mut self) -> Option<&mut R> {
        self.resources
            .get_mut(&TypeId::of::<R>())
            .and_then(|r| r.downcast_mut())
    }

    pub fn has_resource<R: 'static>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<R>())
    }

    pub fn remove_resource<R: 'static>(&mut self) -> Option<R> {
        self.resources
            .remove(&TypeId::of::<R>())
            .and_then(|r| r.downcast().ok())
            .map(|boxed| *boxed)
    }

    fn get_or_create_archetype_with<F>(&mut self, signature: &ArchetypeSignature, on_create: F) -> usize
    where
        F: FnOnce(&mut Archetype),
    {
        if let Some(&id) = self.archetype_index.get(signature) {
            return id;
        }

        let mut archetype = Archetype::new(signature.clone());
        on_create(&mut archetype);

        self.archetypes.push(archetype);
        let id = self.archetypes.len() - 1;
        self.archetype_index.insert(signature.clone(), id);
        id
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity {
        dx: f32,
    }

    #[test]
    fn create_and_remove_entity() {
        let mut world = World::new();
        let e = world.create_entity((Position { x: 1.0, y: 2.0 },));
        assert!(world.alive(e));
        world.remove_entity(e).unwrap();
        assert!(!world.alive(e));
    }

    #[test]
    fn dead_entity_operations_return_not_found() {
        let mut world = World::new();
        let e = world.create_entity((Position { x: 0.0, y: 0.0 },));
        world.remove_entity(e).unwrap();
        assert_eq!(world.remove_entity(e), Err(SimError::EntityNotFound));
        assert_eq!(
            world.add_component(e, Velocity { dx: 1.0 }),
            Err(SimError::EntityNotFound)
        );
    }

    #[test]
    fn add_component_migrates_archetype() {
        let mut world = World::new();
        let e = world.create_entity((Position { x: 0.0, y: 0.0 },));
        assert!(world.has::<Position>(e));
        assert!(!world.has::<Velocity>(e));

        world.add_component(e, Velocity { dx: 3.0 }).unwrap();
        assert!(world.has::<Velocity>(e));
        assert_eq!(world.get::<Velocity>(e).unwrap().dx, 3.0);
        assert_eq!(world.get::<Position>(e).unwrap().x, 0.0);
    }

    #[test]
    fn remove_component_migrates_archetype() {
        let mut world = World::new();
        let e = world.create_entity((Position { x: 1.0, y: 1.0 }, Velocity { dx: 2.0 }));
        world.remove_component::<Velocity>(e).unwrap();
        assert!(!world.has::<Velocity>(e));
        assert!(world.has::<Position>(e));
    }

    #[test]
    fn remove_component_not_present_is_error() {
        let mut world = World::new();
        let e = world.create_entity((Position { x: 0.0, y: 0.0 },));
        assert_eq!(
            world.remove_component::<Velocity>(e),
            Err(SimError::ComponentNotFound)
        );
    }

    #[test]
    fn tick_resets_to_zero() {
        let mut world = World::new();
        world.increment_tick();
        world.increment_tick();
        assert_eq!(world.tick(), 2);
        world.reset();
        assert_eq!(world.tick(), 0);
    }

    #[test]
    fn resources_round_trip() {
        let mut world = World::new();
        world.insert_resource(42i32);
        assert_eq!(*world.resource::<i32>().unwrap(), 42);
        *world.resource_mut::<i32>().unwrap() += 1;
        assert_eq!(*world.resource::<i32>().unwrap(), 43);
    }
}
