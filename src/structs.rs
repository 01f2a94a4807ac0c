use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::Severity;
use crate::utils::serde::{deserialize_links, value_to_text, value_to_u64};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// One page of a Polaris collection response.
#[derive(Debug, Deserialize)]
pub struct Page<T = Value> {
    #[serde(rename = "_items", default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(rename = "_links", default, deserialize_with = "deserialize_links")]
    pub links: Vec<Link>,
}

impl<T> Page<T> {
    /// Returns the `next` and `first` hrefs. The last link with a given relation wins.
    pub fn next_and_first(&self) -> (Option<&str>, Option<&str>) {
        let mut next = None;
        let mut first = None;
        for link in &self.links {
            match link.rel.as_str() {
                "next" => next = Some(link.href.as_str()),
                "first" => first = Some(link.href.as_str()),
                _ => {}
            }
        }
        (next, first)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Picks a project either by its position in the listing or by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectSelector {
    Index(usize),
    Id(String),
}

impl FromStr for ProjectSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("project selector must not be empty".to_string());
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse()
                .map(ProjectSelector::Index)
                .map_err(|e| format!("invalid project index '{s}': {e}"));
        }
        Ok(ProjectSelector::Id(s.to_string()))
    }
}

impl ProjectSelector {
    pub fn select<'p>(&self, projects: &'p [Project]) -> Option<&'p Project> {
        match self {
            ProjectSelector::Index(index) => projects.get(*index),
            ProjectSelector::Id(id) => projects.iter().find(|p| &p.id == id),
        }
    }
}

/// Canonical view of a Polaris issue, independent of which API shape it came from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Issue {
    pub id: Option<String>,
    pub issue_type: Option<String>,
    pub type_name: Option<String>,
    pub description: Option<String>,
    pub message: Option<String>,
    pub file_path: Option<String>,
    pub line: Option<u64>,
    pub severity: Option<Severity>,
    pub cwe: Option<String>,
    pub overall_score: Option<String>,
    pub dismissed: bool,
    pub logical_location: Option<String>,
}

impl Issue {
    /// Normalizes a raw record. Both the `occurrenceProperties` shape and the flat
    /// `severity`/`issueType` shape are understood; anything unrecognised is left empty.
    pub fn from_value(value: &Value) -> Issue {
        let occurrence_props = value.get("occurrenceProperties");
        let issue_type_obj = value.get("type").filter(|t| t.is_object());
        let location = value.get("location");

        Issue {
            id: value.get("id").and_then(value_to_text),
            issue_type: value
                .get("issueType")
                .and_then(value_to_text)
                .or_else(|| value.get("type").and_then(value_to_text))
                .or_else(|| issue_type_obj.and_then(|t| t.get("name")).and_then(value_to_text))
                .or_else(|| issue_type_obj.and_then(|t| t.get("id")).and_then(value_to_text)),
            type_name: issue_type_obj.and_then(|t| {
                t.get("altName").and_then(value_to_text).or_else(|| {
                    t.pointer("/_localized/name").and_then(value_to_text)
                })
            }),
            description: issue_type_obj
                .and_then(|t| t.pointer("/_localized/otherDetails"))
                .and_then(|details| property(details, "description"))
                .and_then(value_to_text)
                .or_else(|| value.get("description").and_then(value_to_text)),
            message: value.get("message").and_then(|m| {
                value_to_text(m).or_else(|| m.get("text").and_then(value_to_text))
            }),
            file_path: location.and_then(|l| {
                l.get("filePath")
                    .and_then(value_to_text)
                    .or_else(|| l.get("path").and_then(value_to_text))
            }),
            line: location.and_then(|l| l.get("line")).and_then(value_to_u64),
            severity: occurrence_props
                .and_then(|props| property(props, "severity"))
                .or_else(|| value.get("severity"))
                .and_then(value_to_text)
                .and_then(|s| Severity::from_str(s.trim()).ok()),
            cwe: occurrence_props
                .and_then(|props| property(props, "cwe"))
                .or_else(|| value.get("cwe"))
                .and_then(value_to_text),
            overall_score: occurrence_props
                .and_then(|props| property(props, "overall-score"))
                .or_else(|| value.get("overallScore"))
                .and_then(value_to_text),
            dismissed: value
                .get("triageProperties")
                .and_then(|props| property(props, "is-dismissed"))
                .map(|v| match v {
                    Value::Bool(b) => *b,
                    Value::String(s) => s.eq_ignore_ascii_case("true"),
                    _ => false,
                })
                .unwrap_or(false),
            logical_location: value
                .get("function")
                .and_then(value_to_text)
                .or_else(|| value.get("logicalLocation").and_then(value_to_text)),
        }
    }

    pub fn is_informational(&self) -> bool {
        self.severity == Some(Severity::Informational)
    }
}

/// Looks up `value` of the first `{ "key": .., "value": .. }` entry matching `key`.
fn property<'v>(props: &'v Value, key: &str) -> Option<&'v Value> {
    props
        .as_array()?
        .iter()
        .find(|prop| prop.get("key").and_then(Value::as_str) == Some(key))
        .and_then(|prop| prop.get("value"))
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct IssueSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub informational: usize,
    pub unrated: usize,
    pub dismissed: usize,
    pub total: usize,
}
