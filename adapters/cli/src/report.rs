use std::{fmt::Write as _, time::Duration};

use miasma_engine::{Engine, TickReport};
use serde::Serialize;

/// Outcome of a scripted run, printable as text or JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub(crate) struct RunReport {
    ticks: u32,
    elapsed_secs: f64,
    shapes_applied: u64,
    tiles_cleared: u64,
    regrown: u64,
    forgotten: u64,
    expired: u64,
    evicted_over_capacity: u64,
    peak_cleared: usize,
    final_cleared: usize,
    final_frontier: usize,
    frontier_pruned: u64,
    version: u64,
}

impl RunReport {
    /// Creates an empty report for a run of `ticks` steps of `dt` each.
    pub(crate) fn new(ticks: u32, dt: Duration) -> Self {
        Self {
            ticks,
            elapsed_secs: dt.as_secs_f64() * f64::from(ticks),
            ..Self::default()
        }
    }

    /// Records one clearing request and the number of tiles it cleared.
    pub(crate) fn record_shape(&mut self, cleared: usize) {
        self.shapes_applied += 1;
        self.tiles_cleared += cleared as u64;
    }

    /// Records what one tick changed.
    pub(crate) fn record_tick(&mut self, tick: &TickReport) {
        self.regrown += tick.regrown as u64;
        self.forgotten += tick.forgotten as u64;
        self.expired += tick.expired as u64;
        self.evicted_over_capacity += tick.over_capacity as u64;
    }

    /// Captures the final engine state once the run has ended.
    pub(crate) fn finish(&mut self, engine: &Engine) {
        self.final_cleared = engine.cleared_count();
        self.final_frontier = engine.frontier_count();
        self.peak_cleared = self.peak_cleared.max(self.final_cleared);
        self.frontier_pruned = engine.stats().frontier_pruned;
        self.version = engine.version();
    }

    /// Tracks the largest cleared set seen during the run.
    pub(crate) fn observe_cleared(&mut self, cleared: usize) {
        self.peak_cleared = self.peak_cleared.max(cleared);
    }

    /// Renders the report as aligned `key: value` lines.
    pub(crate) fn to_text(&self) -> String {
        let mut text = String::new();
        let rows: [(&str, String); 13] = [
            ("ticks", self.ticks.to_string()),
            ("elapsed", format!("{:.2}s", self.elapsed_secs)),
            ("shapes applied", self.shapes_applied.to_string()),
            ("tiles cleared", self.tiles_cleared.to_string()),
            ("regrown", self.regrown.to_string()),
            ("forgotten", self.forgotten.to_string()),
            ("expired", self.expired.to_string()),
            ("evicted (capacity)", self.evicted_over_capacity.to_string()),
            ("frontier pruned", self.frontier_pruned.to_string()),
            ("peak cleared", self.peak_cleared.to_string()),
            ("final cleared", self.final_cleared.to_string()),
            ("final frontier", self.final_frontier.to_string()),
            ("version", self.version.to_string()),
        ];
        for (label, value) in rows {
            let _ = writeln!(text, "{label:<20}{value}");
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_ticks_and_shapes() {
        let mut report = RunReport::new(10, Duration::from_millis(500));
        report.record_shape(12);
        report.record_shape(0);
        report.record_tick(&TickReport {
            regrown: 3,
            forgotten: 2,
            ..TickReport::default()
        });
        report.observe_cleared(40);

        assert_eq!(report.shapes_applied, 2);
        assert_eq!(report.tiles_cleared, 12);
        assert_eq!(report.regrown, 3);
        assert_eq!(report.forgotten, 2);
        assert_eq!(report.peak_cleared, 40);
        assert_eq!(report.elapsed_secs, 5.0);
    }

    #[test]
    fn text_report_lists_every_counter() {
        let text = RunReport::new(1, Duration::from_secs(1)).to_text();
        assert_eq!(text.lines().count(), 13);
        assert!(text.starts_with("ticks               1\n"));
        assert!(text.contains("elapsed             1.00s\n"));
    }

    #[test]
    fn json_report_uses_field_names() {
        let json = serde_json::to_value(RunReport::new(2, Duration::from_secs(1)))
            .expect("report serializes");
        assert_eq!(json["ticks"], 2);
        assert_eq!(json["final_cleared"], 0);
    }
}
