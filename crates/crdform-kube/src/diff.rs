//! Plan/live diff of a managed object
//!
//! The live object is pruned to the fields the plan sets, so server-managed
//! fields (uid, managedFields, status, defaults the plan does not mention)
//! never show up as changes. Both sides are rendered to YAML and compared
//! line by line.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use similar::{ChangeTag, TextDiff};
use std::fmt;

use crate::error::Result;

/// What applying the plan would do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Create,
    Update,
    /// Name or namespace changed: delete and create
    Replace,
    NoOp,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanAction::Create => write!(f, "create"),
            PlanAction::Update => write!(f, "update"),
            PlanAction::Replace => write!(f, "replace"),
            PlanAction::NoOp => write!(f, "no changes"),
        }
    }
}

/// Result of comparing a planned object with the live one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDiff {
    pub action: PlanAction,
    /// Line diff of the YAML forms
    pub content: DiffContent,
}

impl PlanDiff {
    pub fn has_changes(&self) -> bool {
        self.action != PlanAction::NoOp
    }

    /// Compare the desired object with the live one (`None` if absent)
    pub fn compute(desired: &Value, live: Option<&Value>) -> Result<Self> {
        let desired_yaml = serde_yaml::to_string(desired)?;

        let Some(live) = live else {
            return Ok(Self {
                action: PlanAction::Create,
                content: DiffContent::addition(&desired_yaml),
            });
        };

        let live_yaml = serde_yaml::to_string(&prune_to(desired, live))?;
        let content = DiffContent::between(&live_yaml, &desired_yaml);
        let action = if content.has_changes() {
            PlanAction::Update
        } else {
            PlanAction::NoOp
        };

        Ok(Self { action, content })
    }

    /// The plan moves the object; `previous` is the object at its old identity
    pub fn replacement(desired: &Value, previous: Option<&Value>) -> Result<Self> {
        let content = Self::compute(desired, previous)?.content;
        Ok(Self {
            action: PlanAction::Replace,
            content,
        })
    }

    pub fn to_unified_diff(&self) -> String {
        self.content.to_unified_diff()
    }
}

/// Keep only the parts of `live` that `planned` mentions
pub fn prune_to(planned: &Value, live: &Value) -> Value {
    match (planned, live) {
        (Value::Object(planned), Value::Object(live)) => {
            let mut pruned = Map::new();
            for (key, planned_value) in planned {
                if let Some(live_value) = live.get(key) {
                    pruned.insert(key.clone(), prune_to(planned_value, live_value));
                }
            }
            Value::Object(pruned)
        }
        (Value::Array(planned), Value::Array(live)) => Value::Array(
            live.iter()
                .enumerate()
                .map(|(i, item)| match planned.get(i) {
                    Some(planned_item) => prune_to(planned_item, item),
                    None => item.clone(),
                })
                .collect(),
        ),
        (_, live) => live.clone(),
    }
}

/// Detailed diff content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffContent {
    pub lines: Vec<DiffLine>,
}

impl DiffContent {
    fn addition(content: &str) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .map(|(i, line)| DiffLine {
                line_type: LineType::Added,
                content: line.to_string(),
                old_line_no: None,
                new_line_no: Some(i),
            })
            .collect();
        Self { lines }
    }

    fn between(old: &str, new: &str) -> Self {
        let diff = TextDiff::from_lines(old, new);
        let lines = diff
            .iter_all_changes()
            .map(|change| DiffLine {
                line_type: match change.tag() {
                    ChangeTag::Delete => LineType::Removed,
                    ChangeTag::Insert => LineType::Added,
                    ChangeTag::Equal => LineType::Context,
                },
                content: change.value().trim_end().to_string(),
                old_line_no: change.old_index(),
                new_line_no: change.new_index(),
            })
            .collect();
        Self { lines }
    }

    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(|l| l.line_type != LineType::Context)
    }

    /// Count of added and removed lines
    pub fn stats(&self) -> (usize, usize) {
        self.lines.iter().fold((0, 0), |(added, removed), line| match line.line_type {
            LineType::Added => (added + 1, removed),
            LineType::Removed => (added, removed + 1),
            LineType::Context => (added, removed),
        })
    }

    /// Generate a unified diff string
    pub fn to_unified_diff(&self) -> String {
        let mut output = String::new();
        for line in &self.lines {
            let prefix = match line.line_type {
                LineType::Added => "+",
                LineType::Removed => "-",
                LineType::Context => " ",
            };
            output.push_str(prefix);
            output.push_str(&line.content);
            output.push('\n');
        }
        output
    }
}

/// A single line in a diff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffLine {
    pub line_type: LineType,
    pub content: String,
    pub old_line_no: Option<usize>,
    pub new_line_no: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Added,
    Removed,
    Context,
}
