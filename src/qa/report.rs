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

//! Report aggregation and persistence.
//!
//! A `Session` always produces a `Report`, even when every run hit an
//! adapter-level failure; `ReportSink` is the one filesystem boundary the
//! QA harness crosses, and only for persisting that report.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::qa::detector::Anomaly;

/// The outcome of one run within a session.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_index: usize,
    pub ticks_run: u32,
    pub final_score: i64,
    pub game_over: bool,
    pub anomalies: Vec<Anomaly>,
}

/// The verdict a `Report` carries: how many anomalies were found, tiered
/// into PASS / WARNING / FAIL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conclusion {
    Pass,
    Warning,
    Fail,
}

impl Conclusion {
    pub fn from_anomaly_count(total: usize) -> Self {
        match total {
            0 => Conclusion::Pass,
            1..=3 => Conclusion::Warning,
            _ => Conclusion::Fail,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Conclusion::Pass => "PASS",
            Conclusion::Warning => "WARNING",
            Conclusion::Fail => "FAIL",
        }
    }

    pub fn text(self, total_anomalies: usize) -> String {
        match self {
            Conclusion::Pass => format!("{} - No anomalies detected", self.label()),
            _ => format!("{} - {total_anomalies} anomalies detected", self.label()),
        }
    }
}

/// The aggregate result of a `Session::run`.
#[derive(Debug, Clone)]
pub struct Report {
    pub game_name: String,
    pub max_ticks: u32,
    pub runs: Vec<RunResult>,
    pub total_anomalies: usize,
    pub best_score: i64,
    pub worst_score: i64,
    pub avg_score: f64,
    pub conclusion: Conclusion,
}

impl Report {
    pub fn from_runs(game_name: String, max_ticks: u32, runs: Vec<RunResult>) -> Self {
        let total_anomalies = runs.iter().map(|r| r.anomalies.len()).sum();
        let best_score = runs.iter().map(|r| r.final_score).max().unwrap_or(0);
        let worst_score = runs.iter().map(|r| r.final_score).min().unwrap_or(0);
        let avg_score = if runs.is_empty() {
            0.0
        } else {
            runs.iter().map(|r| r.final_score).sum::<i64>() as f64 / runs.len() as f64
        };
        let conclusion = Conclusion::from_anomaly_count(total_anomalies);

        Self {
            game_name,
            max_ticks,
            runs,
            total_anomalies,
            best_score,
            worst_score,
            avg_score,
            conclusion,
        }
    }

    pub fn conclusion_text(&self) -> String {
        self.conclusion.text(self.total_anomalies)
    }

    /// Render the literal, diff-stable report text: a summary table
    /// followed by a per-run anomaly breakdown.
    pub fn to_text(&self, date: &str) -> String {
        let mut out = String::new();
        out.push_str("# QA Test Report\n");
        out.push_str(&format!("Game: {}\n", self.game_name));
        out.push_str(&format!("Date: {date}\n"));
        out.push_str(&format!("Runs: {} \u{d7} {}\n\n", self.runs.len(), self.max_ticks));

        out.push_str("## Summary\n");
        out.push_str("| Metric          | Value |\n");
        out.push_str(&format!("| Total Anomalies | {} |\n", self.total_anomalies));
        out.push_str(&format!("| Best Score      | {} |\n", self.best_score));
        out.push_str(&format!("| Avg Score       | {:.2} |\n", self.avg_score));
        out.push_str(&format!("| Worst Score     | {} |\n", self.worst_score));
        out.push_str(&format!("| Conclusion      | {} |\n\n", self.conclusion_text()));

        out.push_str("## Run Details\n");
        for run in &self.runs {
            out.push_str(&format!("### Run {}\n", run.run_index + 1));
            out.push_str(&format!(
                "  - Ticks: {} | Score: {} | Game Over: {}\n",
                run.ticks_run, run.final_score, run.game_over
            ));
            out.push_str(&format!("  - Anomalies: {}\n", run.anomalies.len()));
            for anomaly in &run.anomalies {
                out.push_str(&format!(
                    "    - [{:?}] {} @ tick {}\n",
                    anomaly.severity,
                    anomaly.kind.as_str(),
                    anomaly.tick
                ));
            }
        }

        out
    }
}

/// Where a rendered report can be written. The harness never writes
/// anywhere else on disk.
pub trait ReportSink {
    fn write(&self, name: &str, contents: &str) -> Result<()>;
}

/// Writes reports as files under a directory.
pub struct FsReportSink {
    dir: PathBuf,
}

impl FsReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ReportSink for FsReportSink {
    fn write(&self, name: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path: &Path = &self.dir.join(name);
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa::detector::{Anomaly, AnomalyKind, AnomalySeverity};

    fn anomaly() -> Anomaly {
        Anomaly {
            kind: AnomalyKind::Stuck,
            severity: AnomalySeverity::Medium,
            tick: 42,
            description: "test".into(),
            evidence: serde_json::json!({}),
        }
    }

    #[test]
    fn zero_anomalies_yields_pass() {
        let report = Report::from_runs(
            "mock".into(),
            100,
            vec![RunResult { run_index: 0, ticks_run: 100, final_score: 10, game_over: false, anomalies: vec![] }],
        );
        assert_eq!(report.conclusion, Conclusion::Pass);
        assert!(report.conclusion_text().contains("PASS"));
    }

    #[test]
    fn four_anomalies_yields_fail() {
        let report = Report::from_runs(
            "mock".into(),
            100,
            vec![RunResult {
                run_index: 0,
                ticks_run: 100,
                final_score: 10,
                game_over: true,
                anomalies: vec![anomaly(), anomaly(), anomaly(), anomaly()],
            }],
        );
        assert_eq!(report.conclusion, Conclusion::Fail);
    }

    #[test]
    fn text_report_includes_game_name_and_run_sections() {
        let report = Report::from_runs(
            "mock".into(),
            50,
            vec![RunResult {
                run_index: 0,
                ticks_run: 50,
                final_score: 5,
                game_over: true,
                anomalies: vec![anomaly()],
            }],
        );
        let text = report.to_text("2026-08-01");
        assert!(text.contains("Game: mock"));
        assert!(text.contains("### Run 1"));
        assert!(text.contains("Ticks: 50 | Score: 5 | Game Over: true"));
        assert!(text.contains("Total Anomalies"));
        assert!(text.contains("stuck @ tick 42"));
    }
}
