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

//! A deterministic archetype-ECS simulation core with a QA/observation
//! harness.
//!
//! The crate is three layers: an archetype-based ECS (`archetype`,
//! `component`, `entity`, `query`, `world`), a deterministic scheduler
//! (`time`, `system`, `scheduler`), and a game-agnostic QA harness (`qa`)
//! that drives a `GameAdapter` through scripted or randomized play and
//! turns the resulting observation history into a report.

pub mod archetype;
pub mod component;
pub mod entity;
pub mod error;
pub mod qa;
pub mod query;
pub mod scheduler;
pub mod system;
pub mod time;
pub mod world;

pub mod prelude;

pub use archetype::Archetype;
pub use component::{Bundle, Component, ComponentId};
pub use entity::Entity;
pub use error::{Result, SimError};
pub use query::{Filter, QueryFetch, QueryFetchMut, QueryFilter, QueryIter, QueryIterMut};
pub use scheduler::Scheduler;
pub use system::{BoxedSystem, System};
pub use world::World;
