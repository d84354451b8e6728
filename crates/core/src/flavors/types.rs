use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A humor flavor: a named chain of LLM prompt steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flavor {
    pub id: i64,
    pub created_datetime_utc: DateTime<Utc>,
    pub slug: String,
    pub description: Option<String>,
    /// Number of steps configured for this flavor.
    pub step_count: u32,
}

/// Fields for creating or replacing a flavor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlavorInput {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One configured LLM invocation within a flavor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlavorStep {
    pub id: i64,
    pub created_datetime_utc: DateTime<Utc>,
    pub humor_flavor_id: i64,
    pub llm_temperature: Option<f64>,
    pub order_by: Option<i64>,
    pub llm_input_type_id: Option<i64>,
    pub llm_output_type_id: Option<i64>,
    pub llm_model_id: Option<i64>,
    pub humor_flavor_step_type_id: Option<i64>,
    pub llm_system_prompt: Option<String>,
    pub llm_user_prompt: Option<String>,
    pub description: Option<String>,
}

/// Editable fields of a flavor step.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StepInput {
    #[serde(default)]
    pub llm_temperature: Option<f64>,
    #[serde(default)]
    pub order_by: Option<i64>,
    #[serde(default)]
    pub llm_input_type_id: Option<i64>,
    #[serde(default)]
    pub llm_output_type_id: Option<i64>,
    #[serde(default)]
    pub llm_model_id: Option<i64>,
    #[serde(default)]
    pub humor_flavor_step_type_id: Option<i64>,
    #[serde(default)]
    pub llm_system_prompt: Option<String>,
    #[serde(default)]
    pub llm_user_prompt: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl StepInput {
    /// Blank strings are stored as NULL.
    pub fn normalized(mut self) -> Self {
        self.llm_system_prompt = non_blank(self.llm_system_prompt);
        self.llm_user_prompt = non_blank(self.llm_user_prompt);
        self.description = non_blank(self.description);
        self
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Reference tables used to fill in step foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    LlmModels,
    StepTypes,
    InputTypes,
    OutputTypes,
}

impl LookupKind {
    pub const ALL: [LookupKind; 4] = [
        LookupKind::LlmModels,
        LookupKind::StepTypes,
        LookupKind::InputTypes,
        LookupKind::OutputTypes,
    ];

    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::LlmModels => "llm_models",
            Self::StepTypes => "humor_flavor_step_types",
            Self::InputTypes => "llm_input_types",
            Self::OutputTypes => "llm_output_types",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LlmModels => "llm_models",
            Self::StepTypes => "step_types",
            Self::InputTypes => "input_types",
            Self::OutputTypes => "output_types",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown lookup kind: {}", s))
    }
}

/// Row of a lookup table. Models carry a name, the other kinds a slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupItem {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
