use strum::IntoEnumIterator;

use crate::enums::Severity;
use crate::output::sarif::SarifLog;
use crate::structs::{Issue, IssueSummary, Project};

pub fn get_issue_summary(issues: &[Issue]) -> IssueSummary {
    let count = |severity: Severity| issues.iter().filter(|i| i.severity == Some(severity)).count();
    IssueSummary {
        critical: count(Severity::Critical),
        high: count(Severity::High),
        medium: count(Severity::Medium),
        low: count(Severity::Low),
        informational: count(Severity::Informational),
        unrated: issues.iter().filter(|i| i.severity.is_none()).count(),
        dismissed: issues.iter().filter(|i| i.dismissed).count(),
        total: issues.len(),
    }
}

pub fn get_issue_summary_table_rows(summary: &IssueSummary) -> Vec<Vec<String>> {
    vec![vec![
        summary.critical.to_string(),
        summary.high.to_string(),
        summary.medium.to_string(),
        summary.low.to_string(),
        summary.informational.to_string(),
        summary.unrated.to_string(),
        summary.dismissed.to_string(),
        summary.total.to_string(),
    ]]
}

pub fn get_project_table_rows(projects: &[Project]) -> Vec<Vec<String>> {
    projects
        .iter()
        .enumerate()
        .map(|(index, project)| vec![index.to_string(), project.name.clone(), project.id.clone()])
        .collect()
}

/// Issues per severity, most severe first, skipping severities with no issues.
pub fn get_severity_breakdown(issues: &[Issue]) -> Vec<(Severity, usize)> {
    Severity::iter()
        .map(|severity| (severity, issues.iter().filter(|i| i.severity == Some(severity)).count()))
        .filter(|(_, count)| *count > 0)
        .collect()
}

pub fn get_sarif_table_rows(sarif: &SarifLog) -> Vec<Vec<String>> {
    vec![vec![
        sarif.rules().len().to_string(),
        sarif.runs.first().map(|run| run.artifacts.len()).unwrap_or(0).to_string(),
        sarif.results().len().to_string(),
    ]]
}
