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

//! The QA session orchestrator: drives a `GameAdapter` with a `Player` for
//! a configured number of runs and turns the resulting observation
//! histories into a `Report`.
//!
//! A session is the error boundary for a run: an adapter misbehaving never
//! aborts the whole session, it shows up as a (possibly empty) run in the
//! final report.

use tracing::{info, warn};

use crate::qa::adapter::GameAdapter;
use crate::qa::detector::AnomalyDetector;
use crate::qa::observer::Observer;
use crate::qa::player::Player;
use crate::qa::report::{Report, RunResult};

/// How many ticks pass between anomaly-detector sweeps when
/// `stop_on_anomaly` is set.
const ANOMALY_CHECK_INTERVAL: u32 = 100;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub runs: usize,
    pub max_ticks: u32,
    /// Record every tick when `<= 1`.
    pub record_every: u32,
    pub stop_on_anomaly: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            runs: 5,
            max_ticks: 3600,
            record_every: 1,
            stop_on_anomaly: false,
        }
    }
}

pub struct Session {
    config: SessionConfig,
    detector: AnomalyDetector,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            detector: AnomalyDetector::new(),
        }
    }

    pub fn detector_mut(&mut self) -> &mut AnomalyDetector {
        &mut self.detector
    }

    /// Run the configured number of runs against `adapter`, driven by
    /// `player`, and return the aggregate report. Each run follows the same
    /// protocol: reset, then per tick project state, decide, perform,
    /// step, and record the post-step state; a run ends early on game over
    /// or (if configured) on the first anomaly sweep that finds something.
    pub fn run(&mut self, adapter: &mut dyn GameAdapter, player: &mut dyn Player) -> Report {
        let mut run_results = Vec::with_capacity(self.config.runs);

        for run_index in 0..self.config.runs {
            adapter.reset();
            let mut observer = Observer::new(self.config.max_ticks.max(1) as usize);
            let mut ts = 0u64;
            let mut ticks_run = 0u32;

            while ticks_run < self.config.max_ticks {
                if adapter.is_game_over() {
                    break;
                }

                let pre_state = adapter.state();
                let available = adapter.available_actions();
                let action = player.choose_action(&pre_state, &available);
                if let Err(err) = adapter.perform_action(&action) {
                    warn!(run = run_index, tick = ticks_run, error = %err, "perform_action failed, continuing with next tick");
                }
                adapter.step();
                ticks_run += 1;

                let post_state = adapter.state();
                let should_record = self.config.record_every <= 1 || ticks_run % self.config.record_every == 0;
                if should_record {
                    observer.record(post_state.tick, ts, post_state, action);
                    ts += 1;
                }

                if self.config.stop_on_anomaly
                    && ticks_run % ANOMALY_CHECK_INTERVAL == 0
                {
                    let history: Vec<_> = observer.history().iter().cloned().collect();
                    if !self.detector.analyze(&history).is_empty() {
                        break;
                    }
                }
            }

            let history: Vec<_> = observer.history().iter().cloned().collect();
            let anomalies = self.detector.analyze(&history);
            let game_over = adapter.is_game_over();
            info!(run = run_index, ticks_run, anomalies = anomalies.len(), game_over, "run finished");

            run_results.push(RunResult {
                run_index,
                ticks_run,
                final_score: adapter.score(),
                game_over,
                anomalies,
            });
        }

        Report::from_runs(adapter.name().to_string(), self.config.max_ticks, run_results)
    }
}
