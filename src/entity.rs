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

//! Entity identifiers and location metadata.

use slotmap::new_key_type;

new_key_type! {
    /// Opaque `{index, generation}` handle to a row in a `World`.
    ///
    /// Two handles compare equal iff they share both index and generation.
    /// A handle whose generation no longer matches the slot's stored
    /// generation is dead; every `World` lookup on it fails cleanly instead
    /// of resolving to whatever now occupies that slot.
    pub struct Entity;
}

/// Where a live entity's row lives: which archetype, and which row within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub archetype_id: usize,
    pub archetype_row: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn dead_handle_fails_lookup_cleanly() {
        let mut slots: SlotMap<Entity, EntityLocation> = SlotMap::with_key();
        let e = slots.insert(EntityLocation {
            archetype_id: 0,
            archetype_row: 0,
        });
        slots.remove(e);
        assert!(!slots.contains_key(e));
    }
}
