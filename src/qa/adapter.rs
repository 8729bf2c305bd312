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

//! The game-agnostic adapter contract the QA harness drives.
//!
//! Anything that can report a [`GameState`] snapshot and accept an
//! [`ActionKind`] can be put through a `Session`, without the harness
//! knowing anything about the game's own ECS layout.

use serde::{Serialize, Serializer};

use crate::error::Result;

/// One of the actions a `GameAdapter` must support in `available_actions`/
/// `perform_action`, plus an escape hatch for adapter-specific actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    None,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Jump,
    Attack,
    Use,
    Pause,
    Custom(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::None => "none",
            ActionKind::MoveUp => "move_up",
            ActionKind::MoveDown => "move_down",
            ActionKind::MoveLeft => "move_left",
            ActionKind::MoveRight => "move_right",
            ActionKind::Jump => "jump",
            ActionKind::Attack => "attack",
            ActionKind::Use => "use",
            ActionKind::Pause => "pause",
            ActionKind::Custom(name) => name,
        }
    }
}

impl Serialize for ActionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A projection of one game's state at a single tick, shaped so every game
/// can fill it regardless of its internal representation.
#[derive(Debug, Clone, Serialize)]
pub struct GameState {
    pub tick: u32,
    pub score: i64,
    pub player_pos: (f32, f32),
    pub player_health: [f32; 2],
    pub entity_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<serde_json::Value>,
}

impl GameState {
    pub fn new(tick: u32, score: i64, player_pos: (f32, f32), player_health: [f32; 2], entity_count: usize) -> Self {
        Self {
            tick,
            score,
            player_pos,
            player_health,
            entity_count,
            custom: None,
        }
    }
}

/// The boundary surface between a game and the QA harness. Every method is
/// expected to return quickly and never panic: `perform_action` is a no-op
/// for actions the game doesn't support, and `reset` is idempotent.
pub trait GameAdapter {
    fn name(&self) -> &str;
    fn state(&self) -> GameState;
    fn is_game_over(&self) -> bool;
    fn score(&self) -> i64;
    fn available_actions(&self) -> Vec<ActionKind>;
    /// Apply an action. May return a typed error for an action the adapter
    /// rejects outright; the session logs it and moves on to the next
    /// tick rather than aborting the run.
    fn perform_action(&mut self, action: &ActionKind) -> Result<()>;
    fn step(&mut self);
    fn reset(&mut self);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A minimal adapter used across the QA module's tests: the player
    /// walks right every tick, score climbs, entity count stays fixed.
    pub struct MockAdapter {
        pub tick: u32,
        pub score: i64,
        pub pos: (f32, f32),
        pub health: [f32; 2],
        pub entity_count: usize,
        pub score_per_tick: i64,
        pub pos_delta: (f32, f32),
        pub max_ticks: u32,
    }

    impl MockAdapter {
        pub fn new(score_per_tick: i64, pos_delta: (f32, f32)) -> Self {
            Self {
                tick: 0,
                score: 0,
                pos: (0.0, 0.0),
                health: [100.0, 100.0],
                entity_count: 10,
                score_per_tick,
                pos_delta,
                max_ticks: u32::MAX,
            }
        }
    }

    impl GameAdapter for MockAdapter {
        fn name(&self) -> &str {
            "mock"
        }

        fn state(&self) -> GameState {
            GameState::new(self.tick, self.score, self.pos, self.health, self.entity_count)
        }

        fn is_game_over(&self) -> bool {
            self.tick >= self.max_ticks
        }

        fn score(&self) -> i64 {
            self.score
        }

        fn available_actions(&self) -> Vec<ActionKind> {
            vec![ActionKind::MoveRight, ActionKind::None]
        }

        fn perform_action(&mut self, action: &ActionKind) -> Result<()> {
            if *action == ActionKind::MoveRight {
                self.pos.0 += self.pos_delta.0;
                self.pos.1 += self.pos_delta.1;
            }
            Ok(())
        }

        fn step(&mut self) {
            self.tick += 1;
            self.score += self.score_per_tick;
        }

        fn reset(&mut self) {
            self.tick = 0;
            self.score = 0;
            self.pos = (0.0, 0.0);
            self.health = [100.0, 100.0];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MockAdapter;
    use super::*;

    #[test]
    fn mock_adapter_steps_and_scores() {
        let mut adapter = MockAdapter::new(10, (1.0, 0.0));
        adapter.perform_action(&ActionKind::MoveRight).unwrap();
        adapter.step();
        assert_eq!(adapter.score(), 10);
        assert_eq!(adapter.state().player_pos, (1.0, 0.0));
    }

    #[test]
    fn action_kind_serializes_as_snake_case_string() {
        let json = serde_json::to_string(&ActionKind::MoveLeft).unwrap();
        assert_eq!(json, "\"move_left\"");
    }
}
