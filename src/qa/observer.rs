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

//! Bounded observation log.
//!
//! An `Observer` records one [`ObservationRecord`] per tick and evicts the
//! oldest record once its configured capacity is exceeded, so a long run
//! never grows memory unbounded.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::qa::adapter::{ActionKind, GameState};

/// One tick's snapshot: the projected state, the action chosen for it, and
/// any metrics derived at record time.
#[derive(Debug, Clone, Serialize)]
pub struct ObservationRecord {
    pub tick: u32,
    pub ts: u64,
    pub state: GameState,
    pub action: ActionKind,
    pub metrics: HashMap<String, f64>,
}

impl ObservationRecord {
    pub fn new(tick: u32, ts: u64, state: GameState, action: ActionKind) -> Self {
        let mut metrics = HashMap::new();
        metrics.insert("entity_count".to_string(), state.entity_count as f64);
        Self {
            tick,
            ts,
            state,
            action,
            metrics,
        }
    }
}

/// Aggregate statistics over an observer's current history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverStats {
    pub total_ticks: usize,
    pub max_score: i64,
    pub min_health: f32,
    pub max_entity_count: usize,
    pub final_score: i64,
}

/// A FIFO-bounded log of `ObservationRecord`s for one run. Records must be
/// appended in strictly non-decreasing tick order; the caller, not the
/// observer, is responsible for ordering.
pub struct Observer {
    capacity: usize,
    records: VecDeque<ObservationRecord>,
    on_record: Option<Box<dyn FnMut(&ObservationRecord)>>,
}

impl Observer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: VecDeque::new(),
            on_record: None,
        }
    }

    pub fn with_callback(mut self, callback: impl FnMut(&ObservationRecord) + 'static) -> Self {
        self.on_record = Some(Box::new(callback));
        self
    }

    pub fn record(&mut self, tick: u32, ts: u64, state: GameState, action: ActionKind) {
        let record = ObservationRecord::new(tick, ts, state, action);
        if let Some(cb) = self.on_record.as_mut() {
            cb(&record);
        }
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn history(&self) -> &VecDeque<ObservationRecord> {
        &self.records
    }

    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &ObservationRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip)
    }

    pub fn stats(&self) -> ObserverStats {
        let mut max_score = i64::MIN;
        let mut min_health = f32::MAX;
        let mut max_entity_count = 0usize;
        let mut final_score = 0i64;

        for record in &self.records {
            max_score = max_score.max(record.state.score);
            min_health = min_health.min(record.state.player_health[0]);
            max_entity_count = max_entity_count.max(record.state.entity_count);
            final_score = record.state.score;
        }

        if self.records.is_empty() {
            max_score = 0;
            min_health = 0.0;
        }

        // The tick span, not the record count: `record_every` can skip
        // ticks, so two records ten ticks apart still cover ten ticks.
        let total_ticks = match (self.records.front(), self.records.back()) {
            (Some(first), Some(last)) => (last.tick - first.tick) as usize + 1,
            _ => 0,
        };

        ObserverStats {
            total_ticks,
            max_score,
            min_health,
            max_entity_count,
            final_score,
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(score: i64) -> GameState {
        GameState::new(0, score, (0.0, 0.0), [100.0, 100.0], 10)
    }

    #[test]
    fn capacity_evicts_oldest_record_fifo() {
        let mut observer = Observer::new(5);
        for tick in 0..10u32 {
            observer.record(tick, tick as u64, state(tick as i64), ActionKind::None);
        }
        let ticks: Vec<u32> = observer.history().iter().map(|r| r.tick).collect();
        assert_eq!(ticks, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn stats_reflect_final_and_extreme_values() {
        let mut observer = Observer::new(10);
        observer.record(0, 0, state(5), ActionKind::None);
        observer.record(1, 1, state(15), ActionKind::None);
        let stats = observer.stats();
        assert_eq!(stats.final_score, 15);
        assert_eq!(stats.max_score, 15);
        assert_eq!(stats.total_ticks, 2);
    }

    #[test]
    fn total_ticks_spans_the_recorded_range_even_with_gaps() {
        let mut observer = Observer::new(10);
        // Records every third tick, as `record_every = 3` would produce.
        observer.record(0, 0, state(0), ActionKind::None);
        observer.record(3, 1, state(1), ActionKind::None);
        observer.record(6, 2, state(2), ActionKind::None);
        let stats = observer.stats();
        assert_eq!(stats.total_ticks, 7);
    }

    #[test]
    fn total_ticks_is_zero_for_an_empty_observer() {
        let observer = Observer::new(10);
        assert_eq!(observer.stats().total_ticks, 0);
    }
}
