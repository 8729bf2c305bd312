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

//! Typed views and the Filter/Query pair.
//!
//! A `Filter<Q>` binds a tuple of component types to a `World`'s
//! `ComponentId`s once; `World::query`/`query_mut` then scan archetypes for
//! that filter's ids each call and yield `(Entity, Q::Item)` per matching
//! row. Iteration order is archetype-creation order, then row order within
//! an archetype — deterministic for a given sequence of world operations.

use std::marker::PhantomData;
use std::ptr::NonNull;

use smallvec::SmallVec;
use tracing::debug;

use crate::archetype::{Archetype, ComponentColumn};
use crate::component::{Component, ComponentId, ComponentRegistry, MAX_BUNDLE_COMPONENTS};
use crate::entity::Entity;
use crate::world::World;

/// A tuple of component types resolved against one `World`'s registry.
///
/// Constructed once (`Filter::new`) and reused across ticks; resolving ids
/// registers any component types the filter names that the world hasn't
/// seen yet, so a filter built before the first matching entity exists will
/// still start matching once one is spawned.
pub struct Filter<Q: QueryFilter> {
    ids: SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>,
    world_id: u64,
    _marker: PhantomData<Q>,
}

impl<Q: QueryFilter> Filter<Q> {
    pub fn new(world: &mut World) -> Self {
        let world_id = world.id();
        Self {
            ids: Q::ids(world.registry_mut()),
            world_id,
            _marker: PhantomData,
        }
    }

    pub fn ids(&self) -> &[ComponentId] {
        &self.ids
    }

    fn matching_archetype_indices(&self, archetypes: &[Archetype]) -> Vec<usize> {
        archetypes
            .iter()
            .enumerate()
            .filter(|(_, arch)| self.ids.iter().all(|id| arch.has_column(*id)))
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Resolves the `ComponentId`s a view's leaves require.
pub trait QueryFilter {
    fn push_ids(
        registry: &mut ComponentRegistry,
        ids: &mut SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>,
    );

    fn ids(registry: &mut ComponentRegistry) -> SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]> {
        let mut ids = SmallVec::new();
        Self::push_ids(registry, &mut ids);
        ids
    }
}

/// Immutable fetch for one view. `ids`/`cursor` let a tuple's leaves consume
/// one id each, in the same order `push_ids` produced them.
///
/// # Safety
/// Implementations must only read through pointers obtained from `prepare`
/// for rows within the archetype it was prepared against.
pub unsafe trait QueryFetch<'w>: QueryFilter {
    type Item;
    type State;

    fn prepare(archetype: &'w Archetype, ids: &[ComponentId], cursor: &mut usize) -> Option<Self::State>;

    unsafe fn fetch(state: &Self::State, row: usize) -> Option<Self::Item>;
}

/// Mutable fetch for one view.
///
/// # Safety
/// Implementations must ensure `fetch` is called at most once per row per
/// prepared state, and that no two leaves of one tuple alias the same
/// column mutably.
pub unsafe trait QueryFetchMut<'w>: QueryFilter {
    type Item;
    type State;

    fn prepare(
        archetype: &'w mut Archetype,
        ids: &[ComponentId],
        cursor: &mut usize,
    ) -> Option<Self::State>;

    unsafe fn fetch(state: &mut Self::State, row: usize) -> Option<Self::Item>;
}

impl<T: Component> QueryFilter for &T {
    fn push_ids(
        registry: &mut ComponentRegistry,
        ids: &mut SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>,
    ) {
        ids.push(registry.register::<T>());
    }
}

unsafe impl<'w, T: Component> QueryFetch<'w> for &'w T {
    type Item = &'w T;
    type State = &'w ComponentColumn;

    fn prepare(archetype: &'w Archetype, ids: &[ComponentId], cursor: &mut usize) -> Option<Self::State> {
        let id = ids[*cursor];
        *cursor += 1;
        archetype.get_column(id)
    }

    unsafe fn fetch(state: &Self::State, row: usize) -> Option<Self::Item> {
        state.get::<T>(row)
    }
}

unsafe impl<'w, T: Component> QueryFetchMut<'w> for &'w T {
    type Item = &'w T;
    type State = *const ComponentColumn;

    fn prepare(
        archetype: &'w mut Archetype,
        ids: &[ComponentId],
        cursor: &mut usize,
    ) -> Option<Self::State> {
        let id = ids[*cursor];
        *cursor += 1;
        archetype.get_column(id).map(|c| c as *const ComponentColumn)
    }

    unsafe fn fetch(state: &mut Self::State, row: usize) -> Option<Self::Item> {
        let column = unsafe { &**state };
        column.get::<T>(row)
    }
}

impl<T: Component> QueryFilter for &mut T {
    fn push_ids(
        registry: &mut ComponentRegistry,
        ids: &mut SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>,
    ) {
        ids.push(registry.register::<T>());
    }
}

unsafe impl<'w, T: Component> QueryFetchMut<'w> for &'w mut T {
    type Item = &'w mut T;
    type State = *mut ComponentColumn;

    fn prepare(
        archetype: &'w mut Archetype,
        ids: &[ComponentId],
        cursor: &mut usize,
    ) -> Option<Self::State> {
        let id = ids[*cursor];
        *cursor += 1;
        archetype.get_column_mut(id).map(|c| c as *mut ComponentColumn)
    }

    unsafe fn fetch(state: &mut Self::State, row: usize) -> Option<Self::Item> {
        let column = unsafe { &mut **state };
        column.get_mut::<T>(row)
    }
}

/// The empty filter: no required components, so every archetype matches,
/// including the one entities with no components live in.
impl QueryFilter for () {
    fn push_ids(_registry: &mut ComponentRegistry, _ids: &mut SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>) {}
}

unsafe impl<'w> QueryFetch<'w> for () {
    type Item = ();
    type State = ();

    fn prepare(_archetype: &'w Archetype, _ids: &[ComponentId], _cursor: &mut usize) -> Option<Self::State> {
        Some(())
    }

    unsafe fn fetch(_state: &Self::State, _row: usize) -> Option<Self::Item> {
        Some(())
    }
}

unsafe impl<'w> QueryFetchMut<'w> for () {
    type Item = ();
    type State = ();

    fn prepare(_archetype: &'w mut Archetype, _ids: &[ComponentId], _cursor: &mut usize) -> Option<Self::State> {
        Some(())
    }

    unsafe fn fetch(_state: &mut Self::State, _row: usize) -> Option<Self::Item> {
        Some(())
    }
}

macro_rules! impl_query_filter_tuple {
    ($($T:ident),+) => {
        impl<$($T: QueryFilter),+> QueryFilter for ($($T,)+) {
            fn push_ids(
                registry: &mut ComponentRegistry,
                ids: &mut SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>,
            ) {
                $($T::push_ids(registry, ids);)+
            }
        }

        unsafe impl<'w, $($T: QueryFetch<'w>),+> QueryFetch<'w> for ($($T,)+) {
            type Item = ($($T::Item,)+);
            type State = ($($T::State,)+);

            fn prepare(archetype: &'w Archetype, ids: &[ComponentId], cursor: &mut usize) -> Option<Self::State> {
                Some(($($T::prepare(archetype, ids, cursor)?,)+))
            }

            #[allow(non_snake_case)]
            unsafe fn fetch(state: &Self::State, row: usize) -> Option<Self::Item> {
                let ($($T,)+) = state;
                Some(($($T::fetch($T, row)?,)+))
            }
        }

        unsafe impl<'w, $($T: QueryFetchMut<'w>),+> QueryFetchMut<'w> for ($($T,)+) {
            type Item = ($($T::Item,)+);
            type State = ($($T::State,)+);

            fn prepare(
                archetype: &'w mut Archetype,
                ids: &[ComponentId],
                cursor: &mut usize,
            ) -> Option<Self::State> {
                // SAFETY: each leaf's `prepare` only touches the column for its
                // own id, and `Filter`'s ids are de-duplicated per World
                // registration, so leaves never alias the same column.
                let ptr = archetype as *mut Archetype;
                Some(($($T::prepare(unsafe { &mut *ptr }, ids, cursor)?,)+))
            }

            #[allow(non_snake_case)]
            unsafe fn fetch(state: &mut Self::State, row: usize) -> Option<Self::Item> {
                let ($($T,)+) = state;
                Some(($($T::fetch($T, row)?,)+))
            }
        }
    };
}

impl_query_filter_tuple!(A);
impl_query_filter_tuple!(A, B);
impl_query_filter_tuple!(A, B, C);
impl_query_filter_tuple!(A, B, C, D);

/// Immutable cursor over the rows matching a `Filter`.
pub struct QueryIter<'w, Q: QueryFilter + QueryFetch<'w>> {
    world: &'w World,
    ids: SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>,
    matches: Vec<usize>,
    arch_idx: usize,
    row_idx: usize,
    state: Option<Q::State>,
}

impl<'w, Q: QueryFilter + QueryFetch<'w>> QueryIter<'w, Q> {
    pub(crate) fn new(world: &'w World, filter: &Filter<Q>) -> Self {
        let matches = if world.id() == filter.world_id {
            filter.matching_archetype_indices(world.archetypes())
        } else {
            debug!(
                filter_world = filter.world_id,
                query_world = world.id(),
                "query run with a Filter built against a different World; yielding no rows"
            );
            Vec::new()
        };
        Self {
            world,
            ids: filter.ids.clone(),
            matches,
            arch_idx: 0,
            row_idx: 0,
            state: None,
        }
    }
}

impl<'w, Q: QueryFilter + QueryFetch<'w>> Iterator for QueryIter<'w, Q> {
    type Item = (Entity, Q::Item);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.arch_idx >= self.matches.len() {
                return None;
            }
            let archetype = self.world.get_archetype(self.matches[self.arch_idx])?;

            if self.state.is_none() {
                let mut cursor = 0;
                self.state = Q::prepare(archetype, &self.ids, &mut cursor);
                self.row_idx = 0;
                if self.state.is_none() {
                    self.arch_idx += 1;
                    continue;
                }
            }

            if self.row_idx >= archetype.len() {
                self.state = None;
                self.arch_idx += 1;
                continue;
            }

            let row = self.row_idx;
            self.row_idx += 1;
            let entity = archetype.entities()[row];

            if let Some(item) = unsafe { Q::fetch(self.state.as_ref().unwrap(), row) } {
                return Some((entity, item));
            }
        }
    }
}

/// Mutable cursor over the rows matching a `Filter`.
pub struct QueryIterMut<'w, Q: QueryFilter + QueryFetchMut<'w>> {
    ids: SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>,
    archetypes: Vec<NonNull<Archetype>>,
    arch_idx: usize,
    row_idx: usize,
    state: Option<Q::State>,
    _marker: PhantomData<&'w mut World>,
}

impl<'w, Q: QueryFilter + QueryFetchMut<'w>> QueryIterMut<'w, Q> {
    pub(crate) fn new(world: &'w mut World, filter: &Filter<Q>) -> Self {
        let indices = if world.id() == filter.world_id {
            filter.matching_archetype_indices(world.archetypes())
        } else {
            debug!(
                filter_world = filter.world_id,
                query_world = world.id(),
                "query_mut run with a Filter built against a different World; yielding no rows"
            );
            Vec::new()
        };
        let mut archetypes = Vec::with_capacity(indices.len());
        for idx in indices {
            if let Some(ptr) = world.archetype_ptr_mut(idx) {
                archetypes.push(ptr);
            }
        }
        Self {
            ids: filter.ids.clone(),
            archetypes,
            arch_idx: 0,
            row_idx: 0,
            state: None,
            _marker: PhantomData,
        }
    }
}

impl<'w, Q: QueryFilter + QueryFetchMut<'w>> Iterator for QueryIterMut<'w, Q> {
    type Item = (Entity, Q::Item);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.arch_idx >= self.archetypes.len() {
                return None;
            }
            let archetype_ptr = self.archetypes[self.arch_idx];

            if self.state.is_none() {
                // SAFETY: each pointer targets a distinct archetype owned by the
                // `World` borrowed for `'w`; we only ever hold one at a time.
                let archetype = unsafe { self.archetypes[self.arch_idx].as_mut() };
                let mut cursor = 0;
                self.state = Q::prepare(archetype, &self.ids, &mut cursor);
                self.row_idx = 0;
                if self.state.is_none() {
                    self.arch_idx += 1;
                    continue;
                }
            }

            // SAFETY: each pointer targets a distinct archetype owned by the
            // `World` borrowed for `'w`; we only ever hold one at a time.
            let archetype = unsafe { archetype_ptr.as_ref() };

            if self.row_idx >= archetype.len() {
                self.state = None;
                self.arch_idx += 1;
                continue;
            }

            let row = self.row_idx;
            self.row_idx += 1;
            let entity = archetype.entities()[row];

            if let Some(item) = unsafe { Q::fetch(self.state.as_mut().unwrap(), row) } {
                return Some((entity, item));
            }
        }
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
    fn query_yields_only_matching_entities() {
        let mut world = World::new();
        for _ in 0..10 {
            world.create_entity((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0 }));
        }
        for _ in 0..5 {
            world.create_entity((Position { x: 0.0, y: 0.0 },));
        }

        let filter = Filter::<(&Position, &Velocity)>::new(&mut world);
        let count = world.query(&filter).count();
        assert_eq!(count, 10);
    }

    #[test]
    fn query_mut_writes_through_column() {
        let mut world = World::new();
        let e = world.create_entity((Position { x: 1.0, y: 1.0 },));

        let filter = Filter::<&mut Position>::new(&mut world);
        for (entity, pos) in world.query_mut(&filter) {
            if entity == e {
                pos.x = 42.0;
            }
        }

        assert_eq!(world.get::<Position>(e).unwrap().x, 42.0);
    }

    #[test]
    fn empty_tuple_filter_matches_every_archetype() {
        let mut world = World::new();
        world.create_entity((Position { x: 0.0, y: 0.0 },));
        world.create_entity((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0 }));

        let filter = Filter::<()>::new(&mut world);
        let count = world.query(&filter).count();
        assert_eq!(count, 2);
    }

    #[test]
    fn filter_built_against_a_different_world_yields_nothing() {
        let mut world_a = World::new();
        world_a.create_entity((Position { x: 0.0, y: 0.0 },));
        let filter = Filter::<&Position>::new(&mut world_a);

        let mut world_b = World::new();
        world_b.create_entity((Position { x: 1.0, y: 1.0 },));

        let count = world_b.query(&filter).count();
        assert_eq!(count, 0);
    }
}
