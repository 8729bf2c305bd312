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

//! Rule-based anomaly detection over an observation history.
//!
//! Rules never mutate the history they're given; `AnomalyDetector::analyze`
//! runs every registered rule, in registration order, against the same
//! slice and concatenates their findings. Running it twice on the same
//! history produces the same anomalies.

use serde_json::json;

use crate::qa::observer::ObservationRecord;

const STUCK_WINDOW: usize = 120;
const STUCK_EPSILON: f32 = 1.0;
const ENTITY_LEAK_ABSOLUTE: usize = 500;
const ENTITY_LEAK_WINDOW: usize = 100;
const ENTITY_LEAK_GROWTH_FLOOR: usize = 100;
const HEALTH_DRAIN_WINDOW: usize = 60;
const HEALTH_DRAIN_RATE: f32 = 0.5;
const BOUNDARY_X: f32 = 1920.0;
const BOUNDARY_Y: f32 = 1080.0;

/// Tunable thresholds for the built-in rules. `AnomalyDetector::new` uses
/// `DetectorConfig::default()`; `with_config` lets a caller tighten or
/// loosen any of them without writing a custom `Rule`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub stuck_window: usize,
    pub stuck_epsilon: f32,
    pub entity_leak_absolute: usize,
    pub entity_leak_window: usize,
    pub entity_leak_growth_floor: usize,
    pub health_drain_window: usize,
    pub health_drain_rate: f32,
    pub boundary_x: f32,
    pub boundary_y: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            stuck_window: STUCK_WINDOW,
            stuck_epsilon: STUCK_EPSILON,
            entity_leak_absolute: ENTITY_LEAK_ABSOLUTE,
            entity_leak_window: ENTITY_LEAK_WINDOW,
            entity_leak_growth_floor: ENTITY_LEAK_GROWTH_FLOOR,
            health_drain_window: HEALTH_DRAIN_WINDOW,
            health_drain_rate: HEALTH_DRAIN_RATE,
            boundary_x: BOUNDARY_X,
            boundary_y: BOUNDARY_Y,
        }
    }
}

impl DetectorConfig {
    pub fn with_stuck_window(mut self, window: usize) -> Self {
        self.stuck_window = window;
        self
    }

    pub fn with_stuck_epsilon(mut self, epsilon: f32) -> Self {
        self.stuck_epsilon = epsilon;
        self
    }

    pub fn with_entity_leak_absolute(mut self, absolute: usize) -> Self {
        self.entity_leak_absolute = absolute;
        self
    }

    pub fn with_entity_leak_window(mut self, window: usize) -> Self {
        self.entity_leak_window = window;
        self
    }

    pub fn with_entity_leak_growth_floor(mut self, floor: usize) -> Self {
        self.entity_leak_growth_floor = floor;
        self
    }

    pub fn with_health_drain_window(mut self, window: usize) -> Self {
        self.health_drain_window = window;
        self
    }

    pub fn with_health_drain_rate(mut self, rate: f32) -> Self {
        self.health_drain_rate = rate;
        self
    }

    pub fn with_boundary(mut self, x: f32, y: f32) -> Self {
        self.boundary_x = x;
        self.boundary_y = y;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnomalyKind {
    Stuck,
    EntityLeak,
    ScoreRegression,
    HealthDrain,
    BoundaryViolation,
    Custom(String),
}

impl AnomalyKind {
    pub fn as_str(&self) -> &str {
        match self {
            AnomalyKind::Stuck => "stuck",
            AnomalyKind::EntityLeak => "entity_leak",
            AnomalyKind::ScoreRegression => "score_regression",
            AnomalyKind::HealthDrain => "health_drain",
            AnomalyKind::BoundaryViolation => "boundary_violation",
            AnomalyKind::Custom(name) => name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: AnomalySeverity,
    pub tick: u32,
    pub description: String,
    pub evidence: serde_json::Value,
}

/// One detection rule. Implementations must be pure: given the same
/// history slice they must always report the same anomalies, and must
/// never reach into the world or mutate `history`.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self, history: &[ObservationRecord]) -> Vec<Anomaly>;
}

struct StuckRule {
    window: usize,
    epsilon: f32,
}

impl Rule for StuckRule {
    fn name(&self) -> &str {
        "stuck"
    }

    fn check(&self, history: &[ObservationRecord]) -> Vec<Anomaly> {
        if history.len() < self.window {
            return Vec::new();
        }
        let mut anomalies = Vec::new();
        for window in history.windows(self.window) {
            let origin = window[0].state.player_pos;
            let moved = window.iter().any(|r| {
                let dx = r.state.player_pos.0 - origin.0;
                let dy = r.state.player_pos.1 - origin.1;
                (dx * dx + dy * dy).sqrt() >= self.epsilon
            });
            if !moved {
                let last = window.last().unwrap();
                let epsilon = self.epsilon;
                let window_len = self.window;
                anomalies.push(Anomaly {
                    kind: AnomalyKind::Stuck,
                    severity: AnomalySeverity::Medium,
                    tick: last.tick,
                    description: format!(
                        "player position moved less than {epsilon} units over {window_len} consecutive records"
                    ),
                    evidence: json!({ "threshold": window_len, "epsilon": epsilon }),
                });
                break;
            }
        }
        anomalies
    }
}

struct EntityLeakRule {
    absolute: usize,
    window: usize,
    growth_floor: usize,
}

impl Rule for EntityLeakRule {
    fn name(&self) -> &str {
        "entity_leak"
    }

    fn check(&self, history: &[ObservationRecord]) -> Vec<Anomaly> {
        let Some(last) = history.last() else {
            return Vec::new();
        };

        if last.state.entity_count > self.absolute {
            let absolute = self.absolute;
            return vec![Anomaly {
                kind: AnomalyKind::EntityLeak,
                severity: AnomalySeverity::High,
                tick: last.tick,
                description: format!("entity count {} exceeds {absolute}", last.state.entity_count),
                evidence: json!({ "entity_count": last.state.entity_count }),
            }];
        }

        if history.len() > self.window {
            let baseline = history[history.len() - 1 - self.window].state.entity_count;
            if last.state.entity_count > self.growth_floor && last.state.entity_count >= baseline * 2 {
                let window = self.window;
                return vec![Anomaly {
                    kind: AnomalyKind::EntityLeak,
                    severity: AnomalySeverity::Medium,
                    tick: last.tick,
                    description: format!(
                        "entity count doubled from {baseline} to {} over {window} records",
                        last.state.entity_count
                    ),
                    evidence: json!({ "baseline": baseline, "entity_count": last.state.entity_count }),
                }];
            }
        }

        Vec::new()
    }
}

struct ScoreRegressionRule;
impl Rule for ScoreRegressionRule {
    fn name(&self) -> &str {
        "score_regression"
    }

    fn check(&self, history: &[ObservationRecord]) -> Vec<Anomaly> {
        history
            .windows(2)
            .filter(|pair| pair[1].state.score < pair[0].state.score)
            .map(|pair| Anomaly {
                kind: AnomalyKind::ScoreRegression,
                severity: AnomalySeverity::Low,
                tick: pair[1].tick,
                description: format!("score dropped from {} to {}", pair[0].state.score, pair[1].state.score),
                evidence: json!({ "previous": pair[0].state.score, "current": pair[1].state.score }),
            })
            .collect()
    }
}

struct HealthDrainRule {
    window: usize,
    rate: f32,
}

impl Rule for HealthDrainRule {
    fn name(&self) -> &str {
        "health_drain"
    }

    fn check(&self, history: &[ObservationRecord]) -> Vec<Anomaly> {
        if history.len() < 2 {
            return Vec::new();
        }
        let window_len = history.len().min(self.window);
        let window = &history[history.len() - window_len..];
        let first = window.first().unwrap().state.player_health[0];
        let last = window.last().unwrap();
        let drop = first - last.state.player_health[0];
        let rate = drop / (window.len() - 1).max(1) as f32;
        if rate > self.rate {
            vec![Anomaly {
                kind: AnomalyKind::HealthDrain,
                severity: AnomalySeverity::Medium,
                tick: last.tick,
                description: format!("average health loss of {rate:.2} HP/tick over {window_len} records"),
                evidence: json!({ "rate": rate, "window": window_len }),
            }]
        } else {
            Vec::new()
        }
    }
}

struct BoundaryViolationRule {
    x: f32,
    y: f32,
}

impl Rule for BoundaryViolationRule {
    fn name(&self) -> &str {
        "boundary_violation"
    }

    fn check(&self, history: &[ObservationRecord]) -> Vec<Anomaly> {
        let (bx, by) = (self.x, self.y);
        history
            .iter()
            .filter(|r| {
                let (x, y) = r.state.player_pos;
                !(0.0..=bx).contains(&x) || !(0.0..=by).contains(&y)
            })
            .map(|r| Anomaly {
                kind: AnomalyKind::BoundaryViolation,
                severity: AnomalySeverity::High,
                tick: r.tick,
                description: format!("player position {:?} outside [0,{bx}]x[0,{by}]", r.state.player_pos),
                evidence: json!({ "pos": [r.state.player_pos.0, r.state.player_pos.1] }),
            })
            .collect()
    }
}

/// Runs every registered rule, in registration order, over a history.
pub struct AnomalyDetector {
    rules: Vec<Box<dyn Rule>>,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    /// Build the detector with the default rule set, each rule reading its
    /// thresholds from `config` instead of the built-in defaults.
    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            rules: vec![
                Box::new(StuckRule { window: config.stuck_window, epsilon: config.stuck_epsilon }),
                Box::new(EntityLeakRule {
                    absolute: config.entity_leak_absolute,
                    window: config.entity_leak_window,
                    growth_floor: config.entity_leak_growth_floor,
                }),
                Box::new(ScoreRegressionRule),
                Box::new(HealthDrainRule { window: config.health_drain_window, rate: config.health_drain_rate }),
                Box::new(BoundaryViolationRule { x: config.boundary_x, y: config.boundary_y }),
            ],
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn analyze(&self, history: &[ObservationRecord]) -> Vec<Anomaly> {
        self.rules.iter().flat_map(|rule| rule.check(history)).collect()
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa::adapter::{ActionKind, GameState};

    fn record(tick: u32, score: i64, pos: (f32, f32), health: f32, entity_count: usize) -> ObservationRecord {
        ObservationRecord::new(tick, tick as u64, GameState::new(tick, score, pos, [health, 100.0], entity_count), ActionKind::None)
    }

    #[test]
    fn stuck_rule_fires_after_window_with_no_movement() {
        let history: Vec<_> = (0..200).map(|t| record(t, 0, (5.0, 5.0), 100.0, 10)).collect();
        let rule = StuckRule { window: STUCK_WINDOW, epsilon: STUCK_EPSILON };
        let anomalies = rule.check(&history);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].kind, AnomalyKind::Stuck);
    }

    #[test]
    fn boundary_violation_flags_out_of_range_position() {
        let history = vec![record(0, 0, (-5.0, 10.0), 100.0, 10)];
        let rule = BoundaryViolationRule { x: BOUNDARY_X, y: BOUNDARY_Y };
        let anomalies = rule.check(&history);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, AnomalySeverity::High);
    }

    #[test]
    fn detector_config_overrides_the_stuck_window() {
        let config = DetectorConfig::default().with_stuck_window(5).with_stuck_epsilon(1.0);
        let detector = AnomalyDetector::with_config(config);
        let history: Vec<_> = (0..10).map(|t| record(t, 0, (5.0, 5.0), 100.0, 10)).collect();
        let anomalies = detector.analyze(&history);
        assert!(anomalies.iter().any(|a| a.kind == AnomalyKind::Stuck));
    }

    #[test]
    fn score_regression_detects_drop_between_adjacent_records() {
        let history = vec![record(0, 10, (0.0, 0.0), 100.0, 10), record(1, 5, (0.0, 0.0), 100.0, 10)];
        let anomalies = ScoreRegressionRule.check(&history);
        assert_eq!(anomalies.len(), 1);
    }

    #[test]
    fn analyze_runs_every_rule_in_order() {
        let detector = AnomalyDetector::new();
        let history = vec![record(0, 10, (1900.0, 5.0), 100.0, 10)];
        let anomalies = detector.analyze(&history);
        assert!(anomalies.iter().any(|a| a.kind == AnomalyKind::BoundaryViolation));
    }
}
