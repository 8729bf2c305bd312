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

//! The `System` trait run by a [`crate::scheduler::Scheduler`].
//!
//! There is no access-conflict analysis or parallel stage planning here:
//! systems run strictly in the order they were registered, one at a time,
//! against the same `World`.

use crate::error::Result;
use crate::world::World;

/// One step of simulation logic. Update systems run every tick; draw
/// systems run only in headed mode, after all update systems for that tick.
pub trait System: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&mut self, world: &mut World) -> Result<()>;
}

pub type BoxedSystem = Box<dyn System>;

#[cfg(test)]
mod tests {
    use super::*;

    struct CounterSystem;
    impl System for CounterSystem {
        fn name(&self) -> &'static str {
            "CounterSystem"
        }
        fn run(&mut self, world: &mut World) -> Result<()> {
            world.insert_resource(world.resource::<u32>().copied().unwrap_or(0) + 1);
            Ok(())
        }
    }

    #[test]
    fn system_mutates_world_resources() {
        let mut world = World::new();
        let mut system = CounterSystem;
        system.run(&mut world).unwrap();
        system.run(&mut world).unwrap();
        assert_eq!(*world.resource::<u32>().unwrap(), 2);
    }
}
