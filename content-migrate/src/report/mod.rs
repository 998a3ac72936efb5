//! Run report.
//!
//! Every item the pipeline touches ends up here as a success, failure or skip, so a run
//! can complete with partial failures and still tell exactly what went wrong.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Pipeline step an item outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Export,
    Reset,
    Create,
    Relations,
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Export => "export",
            Stage::Reset => "reset",
            Stage::Create => "create",
            Stage::Relations => "relations",
            Stage::Upload => "upload",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeeded,
    Failed(String),
    Skipped(String),
}

/// Outcome of one item (record, file or collection) at one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub stage: Stage,
    pub item: String,
    pub outcome: Outcome,
}

/// Outcomes of one collection, or of the media section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionReport {
    pub name: String,
    pub items: Vec<ItemOutcome>,
    /// Set when the section stopped before processing its items.
    pub aborted: Option<String>,
}

impl SectionReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            aborted: None,
        }
    }

    pub fn record_success(&mut self, stage: Stage, item: impl fmt::Display) {
        self.push(stage, item, Outcome::Succeeded);
    }

    pub fn record_failure(&mut self, stage: Stage, item: impl fmt::Display, reason: impl fmt::Display) {
        self.push(stage, item, Outcome::Failed(reason.to_string()));
    }

    pub fn record_skip(&mut self, stage: Stage, item: impl fmt::Display, reason: impl fmt::Display) {
        self.push(stage, item, Outcome::Skipped(reason.to_string()));
    }

    pub fn abort(&mut self, reason: impl fmt::Display) {
        self.aborted = Some(reason.to_string());
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    fn push(&mut self, stage: Stage, item: impl fmt::Display, outcome: Outcome) {
        self.items.push(ItemOutcome {
            stage,
            item: item.to_string(),
            outcome,
        });
    }

    pub fn successes(&self, stage: Stage) -> usize {
        self.count(stage, |o| matches!(o, Outcome::Succeeded))
    }

    pub fn failures(&self, stage: Stage) -> usize {
        self.count(stage, |o| matches!(o, Outcome::Failed(_)))
    }

    pub fn skips(&self, stage: Stage) -> usize {
        self.count(stage, |o| matches!(o, Outcome::Skipped(_)))
    }

    /// Failed items across all stages, plus one if the section was aborted.
    pub fn failure_count(&self) -> usize {
        let failed = self
            .items
            .iter()
            .filter(|item| matches!(item.outcome, Outcome::Failed(_)))
            .count();
        failed + usize::from(self.is_aborted())
    }

    fn count<F>(&self, stage: Stage, predicate: F) -> usize
    where
        F: Fn(&Outcome) -> bool,
    {
        self.items
            .iter()
            .filter(|item| item.stage == stage && predicate(&item.outcome))
            .count()
    }
}

/// Report of a whole run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub export: Vec<SectionReport>,
    pub import: Vec<SectionReport>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            export: Vec::new(),
            import: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn failure_count(&self) -> usize {
        self.export
            .iter()
            .chain(&self.import)
            .map(SectionReport::failure_count)
            .sum()
    }

    /// Import section called `name`.
    pub fn section(&self, name: &str) -> Option<&SectionReport> {
        self.import.iter().find(|section| section.name == name)
    }

    /// Export section called `name`.
    pub fn export_section(&self, name: &str) -> Option<&SectionReport> {
        self.export.iter().find(|section| section.name == name)
    }

    /// Log one line per section and the overall totals.
    pub fn log_summary(&self) {
        for section in &self.export {
            log_section("export", section, &[Stage::Export]);
        }
        for section in &self.import {
            log_section(
                "import",
                section,
                &[Stage::Upload, Stage::Reset, Stage::Create, Stage::Relations],
            );
        }

        let elapsed_ms = self
            .finished_at
            .map(|end| (end - self.started_at).num_milliseconds());
        info!(
            started_at = %self.started_at.to_rfc3339(),
            elapsed_ms = ?elapsed_ms,
            failures = self.failure_count(),
            "Migration run completed"
        );
    }
}

fn log_section(phase: &str, section: &SectionReport, stages: &[Stage]) {
    if let Some(reason) = &section.aborted {
        warn!(phase, section = %section.name, reason = %reason, "Section aborted");
        return;
    }

    for stage in stages {
        let succeeded = section.successes(*stage);
        let failed = section.failures(*stage);
        let skipped = section.skips(*stage);
        if succeeded + failed + skipped == 0 {
            continue;
        }
        if failed > 0 {
            warn!(phase, section = %section.name, stage = %stage, succeeded, failed, skipped, "Section finished with failures");
        } else {
            info!(phase, section = %section.name, stage = %stage, succeeded, skipped, "Section finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_stage() {
        let mut section = SectionReport::new("navigation-items");
        section.record_success(Stage::Create, 1);
        section.record_success(Stage::Create, 2);
        section.record_failure(Stage::Create, 3, "HTTP 400");
        section.record_skip(Stage::Relations, 1, "nothing to restore");

        assert_eq!(section.successes(Stage::Create), 2);
        assert_eq!(section.failures(Stage::Create), 1);
        assert_eq!(section.skips(Stage::Relations), 1);
        assert_eq!(section.failures(Stage::Relations), 0);
        assert_eq!(section.failure_count(), 1);
    }

    #[test]
    fn test_aborted_section_counts_as_failure() {
        let mut report = RunReport::new();
        let mut section = SectionReport::new("artikels");
        section.abort("connection refused");
        report.import.push(section);
        report.import.push(SectionReport::new("pages"));

        assert_eq!(report.failure_count(), 1);
        assert!(report.section("artikels").unwrap().is_aborted());
        assert!(!report.section("pages").unwrap().is_aborted());
        assert!(report.section("missing").is_none());
    }

    #[test]
    fn test_finish_sets_end_time() {
        let mut report = RunReport::new();
        report.finish();

        assert!(report.finished_at.unwrap() >= report.started_at);
        report.log_summary();
    }
}
