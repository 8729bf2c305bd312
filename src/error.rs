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

//! Error types
//!
//! `SimError` covers the whole crate: the ECS core, the scheduler, and the
//! QA harness. Caller-misuse and dead-entity paths return `EntityNotFound`/
//! `ComponentNotFound` rather than panicking; resource exhaustion is
//! `OutOfCapacity`; adapter failures carry their own message.

use std::fmt;

/// Crate-wide error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// The entity handle does not resolve to a live slot (dead, or never
    /// existed in this `World`).
    EntityNotFound,

    /// The entity is alive but does not carry the requested component.
    ComponentNotFound,

    /// A structural mutation could not allocate the space it needed; no
    /// partial state was left behind.
    OutOfCapacity,

    /// `GameAdapter::perform_action` rejected an action.
    AdapterError(String),

    /// A `ReportSink` write or read failed.
    IoError(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::EntityNotFound => write!(f, "entity not found"),
            SimError::ComponentNotFound => write!(f, "component not found"),
            SimError::OutOfCapacity => write!(f, "out of capacity"),
            SimError::AdapterError(msg) => write!(f, "adapter error: {msg}"),
            SimError::IoError(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::IoError(err.to_string())
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        assert_eq!(SimError::EntityNotFound.to_string(), "entity not found");
        assert_eq!(
            SimError::AdapterError("boom".into()).to_string(),
            "adapter error: boom"
        );
    }
}
