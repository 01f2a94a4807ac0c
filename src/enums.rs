use clap::ValueEnum;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Display, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    #[strum(to_string = "Informational", serialize = "info")]
    Informational,
}

impl Severity {
    /// Score used for `security-severity` when Polaris gives no overall score.
    pub fn security_severity(&self) -> Option<&'static str> {
        match self {
            Severity::Critical => Some("9.5"),
            Severity::High => Some("8.0"),
            Severity::Medium => Some("5.5"),
            Severity::Low => Some("2.0"),
            Severity::Informational => None,
        }
    }
}

/// Which Polaris API generation to pull issues from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IssueEndpoint {
    /// specialization-layer-service issue families
    IssueFamilies,
    /// findings service issues
    Findings,
}

/// SARIF conversion behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// Id-keyed rules, triage filtering, CWE-decorated names, indexed artifacts
    #[default]
    Findings,
    /// Type-keyed rules, every issue kept, no artifact catalog
    Basic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKey {
    IssueId,
    IssueType,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!(Severity::from_str("CRITICAL").unwrap(), Severity::Critical);
        assert_eq!(Severity::from_str("high").unwrap(), Severity::High);
        assert_eq!(Severity::from_str("Informational").unwrap(), Severity::Informational);
        assert_eq!(Severity::from_str("INFO").unwrap(), Severity::Informational);
        assert!(Severity::from_str("catastrophic").is_err());
    }

    #[test]
    fn severity_displays_variant_name() {
        assert_eq!(Severity::Medium.to_string(), "Medium");
        assert_eq!(Severity::Informational.to_string(), "Informational");
    }
}
