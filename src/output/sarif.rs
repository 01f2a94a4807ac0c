//! SARIF 2.1.0 model and the issue to SARIF conversion.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::{Profile, RuleKey, Severity};
use crate::structs::Issue;
use crate::utils::file::get_source_language;

pub const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";
pub const SARIF_VERSION: &str = "2.1.0";
pub const MAX_RULE_ID_LEN: usize = 255;
const MAX_FULL_DESCRIPTION_LEN: usize = 200;
const SRCROOT: &str = "SRCROOT";
pub const DEFAULT_HELP_URI: &str = "https://polaris.blackduck.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SarifLog {
    #[serde(rename = "$schema", default)]
    pub schema: String,
    pub version: String,
    pub runs: Vec<Run>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub tool: Tool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invocations: Vec<Invocation>,
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub driver: Driver,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub information_uri: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub short_description: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_description: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<RuleProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message { text: text.into(), markdown: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleProperties {
    #[serde(rename = "security-severity", default, skip_serializing_if = "Option::is_none")]
    pub security_severity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub location: ArtifactLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLocation {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_base_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    pub execution_successful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_utc: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Note,
    None,
}

impl From<Severity> for Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical | Severity::High => Level::Error,
            Severity::Medium => Level::Warning,
            Severity::Low => Level::Note,
            Severity::Informational => Level::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    pub message: Message,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub physical_location: PhysicalLocation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logical_locations: Vec<LogicalLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalLocation {
    pub artifact_location: ArtifactLocation,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub start_line: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalLocation {
    pub fully_qualified_name: String,
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub tool_name: String,
    pub information_uri: Option<String>,
    pub help_uri: String,
    pub rule_key: RuleKey,
    pub skip_dismissed_and_informational: bool,
    pub cwe_in_rule_name: bool,
    /// Emit `ruleIndex`, the artifact catalog and artifact indexes.
    pub indexed: bool,
    pub default_file_path: String,
}

impl ConvertOptions {
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Findings => ConvertOptions {
                tool_name: "Polaris".to_string(),
                information_uri: Some(DEFAULT_HELP_URI.to_string()),
                help_uri: DEFAULT_HELP_URI.to_string(),
                rule_key: RuleKey::IssueId,
                skip_dismissed_and_informational: true,
                cwe_in_rule_name: true,
                indexed: true,
                default_file_path: "POLARIS".to_string(),
            },
            Profile::Basic => ConvertOptions {
                tool_name: "Polaris Custom Import".to_string(),
                information_uri: Some(DEFAULT_HELP_URI.to_string()),
                help_uri: DEFAULT_HELP_URI.to_string(),
                rule_key: RuleKey::IssueType,
                skip_dismissed_and_informational: false,
                cwe_in_rule_name: false,
                indexed: false,
                default_file_path: "UNKNOWN".to_string(),
            },
        }
    }

    pub fn with_tool_name(mut self, tool_name: Option<&str>) -> Self {
        if let Some(name) = tool_name {
            self.tool_name = name.to_string();
        }
        self
    }

    pub fn with_help_uri(mut self, help_uri: &str) -> Self {
        self.help_uri = help_uri.to_string();
        self.information_uri = Some(help_uri.to_string());
        self
    }

    fn keeps(&self, issue: &Issue) -> bool {
        !(self.skip_dismissed_and_informational && (issue.dismissed || issue.is_informational()))
    }

    fn rule_id(&self, issue: &Issue) -> String {
        let id = match self.rule_key {
            RuleKey::IssueId => issue.id.as_deref().unwrap_or("PolarisIssueID"),
            RuleKey::IssueType => issue.issue_type.as_deref().unwrap_or("PolarisIssue"),
        };
        truncate(id, MAX_RULE_ID_LEN)
    }

    fn rule_name(&self, issue: &Issue, rule_id: &str) -> String {
        if self.rule_key == RuleKey::IssueType {
            return rule_id.to_string();
        }
        let base = issue
            .type_name
            .as_deref()
            .or(issue.issue_type.as_deref())
            .unwrap_or("Polaris Issue");
        match (&issue.cwe, self.cwe_in_rule_name) {
            (Some(cwe), true) => format!("{base} ({cwe})"),
            _ => base.to_string(),
        }
    }

    fn build_rule(&self, issue: &Issue, id: String, name: String) -> Rule {
        if self.rule_key == RuleKey::IssueType {
            return Rule {
                id,
                short_description: Message::text(&name),
                name,
                full_description: None,
                help_uri: None,
                help: None,
                properties: None,
            };
        }
        let description = issue.description.clone().unwrap_or_else(|| name.clone());
        let more_info = format!("[Visit Polaris for more information]({})", self.help_uri);
        let security_severity = issue
            .overall_score
            .clone()
            .or_else(|| issue.severity.and_then(|s| s.security_severity()).map(str::to_string));
        let mut tags = vec!["security".to_string()];
        if let Some(cwe) = &issue.cwe {
            tags.push(cwe.clone());
        }
        Rule {
            id,
            short_description: Message::text(&name),
            full_description: Some(Message {
                text: truncate(&description, MAX_FULL_DESCRIPTION_LEN),
                markdown: Some(more_info.clone()),
            }),
            help_uri: Some(self.help_uri.clone()),
            help: Some(Message { text: description, markdown: Some(more_info) }),
            properties: Some(RuleProperties { security_severity, tags }),
            name,
        }
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions::for_profile(Profile::default())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Normalizes raw Polaris records and converts them.
pub fn convert_values(values: &[Value], options: &ConvertOptions) -> SarifLog {
    let issues: Vec<Issue> = values.iter().map(Issue::from_value).collect();
    convert_issues(&issues, options)
}

pub fn convert_issues(issues: &[Issue], options: &ConvertOptions) -> SarifLog {
    let mut rules: IndexMap<String, Rule> = IndexMap::new();
    let mut artifacts: IndexMap<String, Artifact> = IndexMap::new();
    let mut results = Vec::new();

    for issue in issues.iter().filter(|issue| options.keeps(issue)) {
        let rule_id = options.rule_id(issue);
        let rule_name = options.rule_name(issue, &rule_id);
        let rule_index = match rules.get_index_of(&rule_id) {
            Some(index) => index,
            None => {
                let rule = options.build_rule(issue, rule_id.clone(), rule_name.clone());
                rules.insert_full(rule_id.clone(), rule).0
            }
        };

        let file_path =
            issue.file_path.clone().unwrap_or_else(|| options.default_file_path.clone());
        let artifact_location = if options.indexed {
            let index = match artifacts.get_index_of(&file_path) {
                Some(index) => index,
                None => {
                    let artifact = Artifact {
                        location: ArtifactLocation {
                            uri: file_path.clone(),
                            uri_base_id: Some(SRCROOT.to_string()),
                            index: None,
                        },
                        source_language: get_source_language(&file_path).map(str::to_string),
                    };
                    artifacts.insert_full(file_path.clone(), artifact).0
                }
            };
            ArtifactLocation {
                uri: file_path,
                uri_base_id: Some(SRCROOT.to_string()),
                index: Some(index),
            }
        } else {
            ArtifactLocation { uri: file_path, uri_base_id: None, index: None }
        };

        results.push(SarifResult {
            rule_id,
            rule_index: options.indexed.then_some(rule_index),
            level: issue.severity.map(Level::from),
            message: Message::text(issue.message.clone().unwrap_or(rule_name)),
            locations: vec![Location {
                physical_location: PhysicalLocation {
                    artifact_location,
                    region: Region { start_line: issue.line.unwrap_or(1).max(1) },
                },
                logical_locations: issue
                    .logical_location
                    .iter()
                    .map(|name| LogicalLocation { fully_qualified_name: name.clone() })
                    .collect(),
            }],
        });
    }

    SarifLog {
        schema: SARIF_SCHEMA.to_string(),
        version: SARIF_VERSION.to_string(),
        runs: vec![Run {
            tool: Tool {
                driver: Driver {
                    name: options.tool_name.clone(),
                    information_uri: options.information_uri.clone(),
                    rules: rules.into_values().collect(),
                },
            },
            artifacts: artifacts.into_values().collect(),
            invocations: vec![],
            results,
        }],
    }
}

impl SarifLog {
    pub fn results(&self) -> &[SarifResult] {
        self.runs.first().map(|run| run.results.as_slice()).unwrap_or_default()
    }

    pub fn rules(&self) -> &[Rule] {
        self.runs.first().map(|run| run.tool.driver.rules.as_slice()).unwrap_or_default()
    }

    pub fn record_invocation(&mut self, invocation: Invocation) {
        if let Some(run) = self.runs.first_mut() {
            run.invocations.push(invocation);
        }
    }
}
