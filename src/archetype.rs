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

//! Archetype storage with row allocation and removal.
//!
//! Columns are keyed by `ComponentId` rather than `TypeId` so that a
//! signature's canonical ordering (ascending id, assigned in
//! first-registration order) is stable across runs.

use rustc_hash::FxHashMap;

use crate::component::{Component, ComponentId};
use crate::entity::Entity;

/// Component signature
pub type ArchetypeSignature = Vec<ComponentId>;

/// Archetype: Structure of Arrays storage
pub struct Archetype {
    signature: ArchetypeSignature,
    entities: Vec<Entity>,
    components: Vec<ComponentColumn>,
    component_indices: FxHashMap<ComponentId, usize>,
}

impl Archetype {
    /// Create new archetype
    pub fn new(signature: ArchetypeSignature) -> Self {
        Self {
            signature,
            entities: Vec::new(),
            components: Vec::new(),
            component_indices: FxHashMap::default(),
        }
    }

    /// Get signature
    pub fn signature(&self) -> &ArchetypeSignature {
        &self.signature
    }

    /// Allocate row for entity
    pub fn allocate_row(&mut self, entity: Entity) -> usize {
        let row = self.entities.len();
        self.entities.push(entity);
        row
    }

    /// Remove row from every column and return the entity swapped into it.
    ///
    /// # Safety
    /// Caller must ensure `row` is a valid index within this archetype.
    pub unsafe fn remove_row(&mut self, row: usize) -> Option<Entity> {
        if row >= self.entities.len() {
            return None;
        }

        for column in &mut self.components {
            column.swap_remove(row);
        }
        self.entities.swap_remove(row);

        if row < self.entities.len() {
            Some(self.entities[row])
        } else {
            None
        }
    }

    /// Remove a row the way `remove_row` does, but without running any
    /// column's drop glue. Used when an archetype migration has already
    /// `memcpy`'d a row's bytes into another archetype's column: the value
    /// still lives, just at a new address, so dropping it here would free
    /// memory the new location still owns. Any component *not* carried
    /// forward by the caller must have its value dropped explicitly, via
    /// `drop_value_in_column`, before calling this.
    ///
    /// # Safety
    /// Caller must ensure `row` is valid, and that every column's value at
    /// `row` has either been moved elsewhere or already dropped.
    pub unsafe fn take_row(&mut self, row: usize) -> Option<Entity> {
        if row >= self.entities.len() {
            return None;
        }

        for column in &mut self.components {
            column.forget_row(row);
        }
        self.entities.swap_remove(row);

        if row < self.entities.len() {
            Some(self.entities[row])
        } else {
            None
        }
    }

    /// Run `id`'s drop glue on the value at `row`, without removing the row.
    ///
    /// # Safety
    /// Caller must ensure `row` is valid and that this value is not read or
    /// dropped again afterwards.
    pub unsafe fn drop_value_in_column(&mut self, id: ComponentId, row: usize) {
        if let Some(column) = self.get_column_mut(id) {
            column.drop_value(row);
        }
    }

    /// Get column immutably
    pub fn get_column(&self, id: ComponentId) -> Option<&ComponentColumn> {
        let idx = *self.component_indices.get(&id)?;
        self.components.get(idx)
    }

    /// Get column by index
    pub fn get_column_by_index(&self, index: usize) -> Option<&ComponentColumn> {
        self.components.get(index)
    }

    /// Get column mutably
    pub fn get_column_mut(&mut self, id: ComponentId) -> Option<&mut ComponentColumn> {
        let idx = *self.component_indices.get(&id)?;
        self.components.get_mut(idx)
    }

    /// Get column index for a component id
    pub fn column_index(&self, id: ComponentId) -> Option<usize> {
        self.component_indices.get(&id).copied()
    }

    /// Get component column by precomputed index
    pub fn get_column_mut_by_index(&mut self, index: usize) -> Option<&mut ComponentColumn> {
        self.components.get_mut(index)
    }

    pub fn has_column(&self, id: ComponentId) -> bool {
        self.component_indices.contains_key(&id)
    }

    /// Reserve space for additional rows
    pub fn reserve_rows(&mut self, additional: usize) {
        if self.entities.capacity() - self.entities.len() < additional {
            self.entities.reserve(additional);
            for column in &mut self.components {
                column.reserve(additional);
            }
        }
    }

    /// Get all entities
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Register component column for `T` under `id`, if it doesn't exist yet.
    pub fn register_component<T: Component>(&mut self, id: ComponentId) {
        if !self.component_indices.contains_key(&id) {
            let idx = self.components.len();
            self.components.push(ComponentColumn::new::<T>());
            self.component_indices.insert(id, idx);
        }
    }

    /// Attach an already-built (empty) column under `id`, used when a
    /// migrated entity's other columns are cloned into a new archetype.
    pub fn add_column_raw(&mut self, id: ComponentId, column: ComponentColumn) {
        if !self.component_indices.contains_key(&id) {
            let idx = self.components.len();
            self.components.push(column);
            self.component_indices.insert(id, idx);
        }
    }
}

/// Type-erased component column
pub struct ComponentColumn {
    data: Vec<u8>,
    item_size: usize,
    drop_fn: Option<unsafe fn(*mut u8)>,
}

impl ComponentColumn {
    /// Create new column for type T
    pub fn new<T: Component>() -> Self {
        Self {
            data: Vec::new(),
            item_size: std::mem::size_of::<T>(),
            drop_fn: if std::mem::needs_drop::<T>() {
                Some(|ptr| unsafe {
                    std::ptr::drop_in_place(ptr as *mut T);
                })
            } else {
                None
            },
        }
    }

    /// An empty column with the same item size and drop glue as `self`.
    pub fn clone_empty(&self) -> Self {
        Self {
            data: Vec::new(),
            item_size: self.item_size,
            drop_fn: self.drop_fn,
        }
    }

    pub fn reserve(&mut self, additional_rows: usize) {
        self.data.reserve(additional_rows * self.item_size);
    }

    /// Size in bytes of one element, used by `World::move_entity` to copy
    /// a row's raw bytes between two columns of the same component type.
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Get mutable pointer for writing
    pub fn get_ptr_mut(&mut self, index: usize) -> *mut u8 {
        let offset = index * self.item_size;
        if offset + self.item_size > self.data.len() {
            self.data.resize(offset + self.item_size, 0);
        }
        unsafe { self.data.as_mut_ptr().add(offset) }
    }

    /// Get component at index
    pub fn get<T: Component>(&self, index: usize) -> Option<&T> {
        let offset = index * self.item_size;
        if offset + self.item_size > self.data.len() {
            return None;
        }
        Some(unsafe { &*(self.data.as_ptr().add(offset) as *const T) })
    }

    /// Get mutable component at index
    pub fn get_mut<T: Component>(&mut self, index: usize) -> Option<&mut T> {
        let offset = index * self.item_size;
        if offset + self.item_size > self.data.len() {
            return None;
        }
        Some(unsafe { &mut *(self.data.as_mut_ptr().add(offset) as *mut T) })
    }

    /// Number of components
    pub fn len(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }

    /// Is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the value at `row` and swap the last row into its place,
    /// mirroring `Vec::swap_remove`.
    fn swap_remove(&mut self, row: usize) {
        let len = self.len();
        if row >= len {
            return;
        }
        unsafe {
            let row_ptr = self.data.as_mut_ptr().add(row * self.item_size);
            if let Some(drop_fn) = self.drop_fn {
                drop_fn(row_ptr);
            }
            let last = len - 1;
            if row != last {
                let last_ptr = self.data.as_ptr().add(last * self.item_size);
                std::ptr::copy_nonoverlapping(last_ptr, row_ptr, self.item_size);
            }
        }
        let new_len = (len - 1) * self.item_size;
        self.data.truncate(new_len);
    }

    /// Like `swap_remove`, but skips the drop glue: the value at `row` is
    /// assumed to have already been moved or dropped by the caller.
    fn forget_row(&mut self, row: usize) {
        let len = self.len();
        if row >= len {
            return;
        }
        let last = len - 1;
        if row != last {
            unsafe {
                let row_ptr = self.data.as_mut_ptr().add(row * self.item_size);
                let last_ptr = self.data.as_ptr().add(last * self.item_size);
                std::ptr::copy_nonoverlapping(last_ptr, row_ptr, self.item_size);
            }
        }
        let new_len = last * self.item_size;
        self.data.truncate(new_len);
    }

    /// Run drop glue on the value at `row` without removing it from the
    /// column; a subsequent `forget_row` finishes removing the slot.
    fn drop_value(&mut self, row: usize) {
        if row >= self.len() {
            return;
        }
        if let Some(drop_fn) = self.drop_fn {
            unsafe {
                let row_ptr = self.data.as_mut_ptr().add(row * self.item_size);
                drop_fn(row_ptr);
            }
        }
    }
}

impl Drop for ComponentColumn {
    fn drop(&mut self) {
        if let Some(drop_fn) = self.drop_fn {
            let count = self.len();
            for i in 0..count {
                let offset = i * self.item_size;
                unsafe {
                    drop_fn(self.data.as_mut_ptr().add(offset));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archetype_creation() {
        let sig = vec![ComponentId(0), ComponentId(1)];
        let arch = Archetype::new(sig.clone());
        assert_eq!(arch.signature(), &sig);
        assert_eq!(arch.len(), 0);
    }

    #[test]
    fn column_swap_remove_keeps_length_aligned() {
        let mut column = ComponentColumn::new::<u32>();
        for i in 0..4u32 {
            let ptr = column.get_ptr_mut(i as usize) as *mut u32;
            unsafe { std::ptr::write(ptr, i * 10) };
        }
        assert_eq!(column.len(), 4);
        column.swap_remove(1);
        assert_eq!(column.len(), 3);
        assert_eq!(*column.get::<u32>(1).unwrap(), 30);
    }
}
