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

//! Deterministic QA/observation harness.
//!
//! A [`session::Session`] drives a [`adapter::GameAdapter`] with a
//! [`player::Player`], recording every tick in an [`observer::Observer`]
//! and sweeping the result through a [`detector::AnomalyDetector`] to
//! produce a reproducible [`report::Report`].

pub mod adapter;
pub mod behavior_tree;
pub mod detector;
pub mod observer;
pub mod player;
pub mod report;
pub mod session;

pub use adapter::{ActionKind, GameAdapter, GameState};
pub use behavior_tree::{BehaviorTree, Blackboard, Context, Node, Status};
pub use detector::{Anomaly, AnomalyDetector, AnomalyKind, AnomalySeverity, DetectorConfig, Rule};
pub use observer::{Observer, ObservationRecord, ObserverStats};
pub use player::{Player, RandomPlayer, ReplayPlayer, StrategyPlayer, WeightedRandomPlayer};
pub use report::{Conclusion, FsReportSink, Report, ReportSink, RunResult};
pub use session::{Session, SessionConfig};

#[cfg(test)]
mod tests {
    use super::adapter::test_support::MockAdapter;
    use super::*;

    #[test]
    fn session_with_random_player_passes_on_a_healthy_mock_game() {
        let mut adapter = MockAdapter::new(10, (5.0, 0.0));
        let mut player = RandomPlayer::new(42);
        let mut session = Session::new(SessionConfig {
            runs: 2,
            max_ticks: 100,
            record_every: 1,
            stop_on_anomaly: false,
        });

        let report = session.run(&mut adapter, &mut player);

        assert_eq!(report.runs.len(), 2);
        assert_eq!(report.conclusion, Conclusion::Pass);
        assert_eq!(report.conclusion_text(), "PASS - No anomalies detected");
        assert!(report.avg_score > 0.0);
    }
}
