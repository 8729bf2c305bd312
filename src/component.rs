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

//! Component identity, the `Component`/`Bundle` traits, and the per-`World`
//! component registry.
//!
//! Components are plain data; they carry no behavior and no type hierarchy.
//! A `ComponentId` is the crate's runtime identity for a component type,
//! assigned in first-registration order rather than borrowed from
//! `TypeId`'s own (unspecified) ordering, so that archetype shape keys sort
//! deterministically — see `ComponentRegistry`.

use std::any::TypeId;

use ahash::AHashMap;
use smallvec::{smallvec, SmallVec};

use crate::archetype::Archetype;

/// Maximum number of components a `Bundle` implementation may group.
pub const MAX_BUNDLE_COMPONENTS: usize = 8;

/// Marker trait for component types. Components must be `'static` (no
/// borrowed data) and are copied by value during archetype moves.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// Stable, per-`World` identity for a component type.
///
/// Assigned by `ComponentRegistry` in first-registration order. Two worlds
/// may assign different ids to the same Rust type; within one `World` the
/// id never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub(crate) u32);

/// Per-type size and drop metadata, keyed by `ComponentId`.
struct ComponentMeta {
    type_id: TypeId,
    name: &'static str,
    size: usize,
    drop_fn: Option<unsafe fn(*mut u8)>,
}

/// Maps component types to stable `ComponentId`s and carries the
/// size/drop metadata archetype columns need to manage raw storage.
///
/// A type is auto-registered the first time an entity is spawned or a
/// component is added with it; lookups never register (`id_of` returns
/// `None` for an unknown type rather than allocating one).
pub struct ComponentRegistry {
    ids: AHashMap<TypeId, ComponentId>,
    meta: Vec<ComponentMeta>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            ids: AHashMap::new(),
            meta: Vec::new(),
        }
    }

    /// Get the id for `T`, registering it under a fresh id if this is the
    /// first time the registry has seen it.
    pub fn register<T: Component>(&mut self) -> ComponentId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.ids.get(&type_id) {
            return id;
        }
        let id = ComponentId(self.meta.len() as u32);
        self.meta.push(ComponentMeta {
            type_id,
            name: std::any::type_name::<T>(),
            size: std::mem::size_of::<T>(),
            drop_fn: if std::mem::needs_drop::<T>() {
                Some(|ptr| unsafe { std::ptr::drop_in_place(ptr as *mut T) })
            } else {
                None
            },
        });
        self.ids.insert(type_id, id);
        id
    }

    /// Look up the id for `T` without registering it.
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    pub fn size_of(&self, id: ComponentId) -> usize {
        self.meta[id.0 as usize].size
    }

    pub fn drop_fn_of(&self, id: ComponentId) -> Option<unsafe fn(*mut u8)> {
        self.meta[id.0 as usize].drop_fn
    }

    pub fn name_of(&self, id: ComponentId) -> &'static str {
        self.meta[id.0 as usize].name
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed set of component types that can be spawned onto one entity at
/// once. Implemented for tuples of 1 through `MAX_BUNDLE_COMPONENTS` types.
pub trait Bundle: Send + Sync + 'static {
    /// Resolve (registering if necessary) the `ComponentId` of every member,
    /// in bundle-field order (not canonical archetype order).
    fn component_ids(registry: &mut ComponentRegistry) -> SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>
    where
        Self: Sized;

    /// Ensure each member has a column in `archetype`. `ids` must be the
    /// same slice `component_ids` returned, in the same order.
    fn register_columns(archetype: &mut Archetype, ids: &[ComponentId])
    where
        Self: Sized;

    /// Write every member's bytes into the matching pointer in `ptrs`.
    ///
    /// # Safety
    /// Caller must supply one valid, correctly-aligned, uninitialized
    /// pointer per member, in the same order as `component_ids`.
    unsafe fn write_components(self, ptrs: &[*mut u8]);
}

macro_rules! impl_bundle {
    ($($T:ident),*) => {
        impl<$($T: Component),*> Bundle for ($($T,)*) {
            fn component_ids(registry: &mut ComponentRegistry) -> SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]> {
                smallvec![$(registry.register::<$T>()),*]
            }

            #[allow(non_snake_case, unused_assignments)]
            fn register_columns(archetype: &mut Archetype, ids: &[ComponentId]) {
                let mut i = 0;
                $(
                    archetype.register_component::<$T>(ids[i]);
                    i += 1;
                )*
            }

            #[allow(non_snake_case)]
            unsafe fn write_components(self, ptrs: &[*mut u8]) {
                let ($($T,)*) = self;
                let mut i = 0;
                $(
                    std::ptr::write(ptrs[i] as *mut $T, $T);
                    i += 1;
                )*
                let _ = i;
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    #![allow(dead_code)]
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy)]
    struct Velocity {
        x: f32,
    }

    #[test]
    fn registry_assigns_stable_ids() {
        let mut registry = ComponentRegistry::new();
        let a = registry.register::<Position>();
        let b = registry.register::<Position>();
        assert_eq!(a, b);
    }

    #[test]
    fn registry_assigns_ids_in_first_registration_order() {
        let mut registry = ComponentRegistry::new();
        let velocity = registry.register::<Velocity>();
        let position = registry.register::<Position>();
        assert!(velocity < position);
    }

    #[test]
    fn unknown_type_is_not_registered_by_lookup() {
        let registry = ComponentRegistry::new();
        assert!(registry.id_of::<Position>().is_none());
    }

    #[test]
    fn bundle_reports_one_id_per_member() {
        let mut registry = ComponentRegistry::new();
        let ids = <(Position, Velocity)>::component_ids(&mut registry);
        assert_eq!(ids.len(), 2);
    }
}
