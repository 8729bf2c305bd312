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

//! Action-choosing strategies a `Session` can drive a `GameAdapter` with.
//!
//! Every player owns its own randomness; none of them touch a shared or
//! global RNG, so two sessions seeded identically produce identical runs
//! regardless of what else is running.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::qa::adapter::{ActionKind, GameState};
use crate::qa::behavior_tree::{Blackboard, BehaviorTree, Context, Status};
use crate::world::World;

/// Chooses the next action for the adapter given its current state and the
/// set of actions it currently supports.
pub trait Player {
    fn choose_action(&mut self, state: &GameState, available: &[ActionKind]) -> ActionKind;
}

/// Picks uniformly among the available actions.
pub struct RandomPlayer {
    rng: StdRng,
}

impl RandomPlayer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Player for RandomPlayer {
    fn choose_action(&mut self, _state: &GameState, available: &[ActionKind]) -> ActionKind {
        if available.is_empty() {
            return ActionKind::None;
        }
        let idx = self.rng.gen_range(0..available.len());
        available[idx].clone()
    }
}

/// Picks among the available actions with per-action weights; an action
/// with no configured weight defaults to `1.0`.
pub struct WeightedRandomPlayer {
    rng: StdRng,
    weights: HashMap<ActionKind, f64>,
}

impl WeightedRandomPlayer {
    pub fn new(seed: u64, weights: HashMap<ActionKind, f64>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            weights,
        }
    }

    fn weight_of(&self, action: &ActionKind) -> f64 {
        self.weights.get(action).copied().unwrap_or(1.0)
    }
}

impl Player for WeightedRandomPlayer {
    fn choose_action(&mut self, _state: &GameState, available: &[ActionKind]) -> ActionKind {
        if available.is_empty() {
            return ActionKind::None;
        }
        let total: f64 = available.iter().map(|a| self.weight_of(a)).sum();
        if total <= 0.0 {
            debug!(total, "weighted player saw a non-positive total weight, falling back to uniform pick");
            let idx = self.rng.gen_range(0..available.len());
            return available[idx].clone();
        }
        let mut roll = self.rng.gen_range(0.0..total);
        for action in available {
            let weight = self.weight_of(action);
            if roll < weight {
                return action.clone();
            }
            roll -= weight;
        }
        available.last().unwrap().clone()
    }
}

/// Replays a fixed script of actions; once the script is exhausted it
/// always answers `ActionKind::None`.
pub struct ReplayPlayer {
    script: Vec<ActionKind>,
    index: usize,
}

impl ReplayPlayer {
    pub fn new(script: Vec<ActionKind>) -> Self {
        Self { script, index: 0 }
    }
}

impl Player for ReplayPlayer {
    fn choose_action(&mut self, _state: &GameState, _available: &[ActionKind]) -> ActionKind {
        let action = self.script.get(self.index).cloned().unwrap_or(ActionKind::None);
        self.index += 1;
        action
    }
}

/// Drives action choice from a behavior tree; the tree is expected to set
/// a chosen `ActionKind` onto the blackboard before returning `Success` or
/// `Running`.
pub struct StrategyPlayer {
    tree: BehaviorTree,
    blackboard: Blackboard,
}

impl StrategyPlayer {
    pub fn new(tree: BehaviorTree) -> Self {
        Self {
            tree,
            blackboard: Blackboard::new(),
        }
    }

    /// Tick the tree against a world/entity pair and read back whatever
    /// action it staged on the blackboard.
    pub fn decide(&mut self, world: &World, entity: crate::entity::Entity) -> ActionKind {
        let mut ctx = Context {
            world,
            entity,
            blackboard: &mut self.blackboard,
        };
        let _status: Status = self.tree.tick(&mut ctx);
        ctx.blackboard.get::<ActionKind>().cloned().unwrap_or(ActionKind::None)
    }
}

impl Player for StrategyPlayer {
    fn choose_action(&mut self, _state: &GameState, _available: &[ActionKind]) -> ActionKind {
        self.blackboard.get::<ActionKind>().cloned().unwrap_or(ActionKind::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        GameState::new(0, 0, (0.0, 0.0), [100.0, 100.0], 1)
    }

    #[test]
    fn random_player_only_picks_from_available_actions() {
        let mut player = RandomPlayer::new(42);
        let available = vec![ActionKind::MoveUp, ActionKind::Jump];
        for _ in 0..20 {
            let chosen = player.choose_action(&state(), &available);
            assert!(available.contains(&chosen));
        }
    }

    #[test]
    fn random_player_is_deterministic_for_a_seed() {
        let mut a = RandomPlayer::new(7);
        let mut b = RandomPlayer::new(7);
        let available = vec![ActionKind::MoveUp, ActionKind::MoveDown, ActionKind::Jump];
        let sequence_a: Vec<_> = (0..10).map(|_| a.choose_action(&state(), &available)).collect();
        let sequence_b: Vec<_> = (0..10).map(|_| b.choose_action(&state(), &available)).collect();
        assert_eq!(sequence_a, sequence_b);
    }

    #[test]
    fn replay_player_falls_back_to_none_past_script_end() {
        let mut player = ReplayPlayer::new(vec![ActionKind::Jump]);
        assert_eq!(player.choose_action(&state(), &[]), ActionKind::Jump);
        assert_eq!(player.choose_action(&state(), &[]), ActionKind::None);
        assert_eq!(player.choose_action(&state(), &[]), ActionKind::None);
    }

    #[test]
    fn weighted_player_uses_default_weight_for_unlisted_action() {
        let mut weights = HashMap::new();
        weights.insert(ActionKind::Jump, 0.0);
        let mut player = WeightedRandomPlayer::new(1, weights);
        let available = vec![ActionKind::Jump, ActionKind::MoveUp];
        for _ in 0..20 {
            let chosen = player.choose_action(&state(), &available);
            assert_eq!(chosen, ActionKind::MoveUp);
        }
    }

    #[test]
    fn weighted_player_falls_back_to_uniform_pick_when_all_weights_are_zero() {
        let mut weights = HashMap::new();
        weights.insert(ActionKind::Jump, 0.0);
        weights.insert(ActionKind::MoveUp, 0.0);
        let mut player = WeightedRandomPlayer::new(3, weights);
        let available = vec![ActionKind::Jump, ActionKind::MoveUp];
        let mut seen_jump = false;
        let mut seen_move_up = false;
        for _ in 0..50 {
            match player.choose_action(&state(), &available) {
                ActionKind::Jump => seen_jump = true,
                ActionKind::MoveUp => seen_move_up = true,
                other => panic!("unexpected action: {other:?}"),
            }
        }
        assert!(seen_jump && seen_move_up, "uniform fallback should eventually pick both actions");
    }
}
