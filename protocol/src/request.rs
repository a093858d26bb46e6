use serde::Deserialize;
use serde::Serialize;
use serde::de::Error as _;
use serde_json::Map;
use serde_json::Value;

use crate::item::Item;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// A tool entry in `tools[]`. The built-in variants are expanded into real
/// function definitions by the provider layer (§4.2), not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    Function { function: FunctionDef },
    CodeInterpreter,
    FileSearch,
    WebSearchPreview,
}

impl Tool {
    pub fn name(&self) -> &str {
        match self {
            Tool::Function { function } => function.name.as_str(),
            Tool::CodeInterpreter => "code_interpreter",
            Tool::FileSearch => "file_search",
            Tool::WebSearchPreview => "web_search_preview",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolChoice {
    Auto,
    Required,
    None,
    Function { name: String },
}

impl Default for ToolChoice {
    fn default() -> Self {
        ToolChoice::Auto
    }
}

impl Serialize for ToolChoice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ToolChoice::Auto => serializer.serialize_str("auto"),
            ToolChoice::Required => serializer.serialize_str("required"),
            ToolChoice::None => serializer.serialize_str("none"),
            ToolChoice::Function { name } => {
                let mut map = Map::new();
                map.insert("type".into(), Value::String("function".into()));
                map.insert("name".into(), Value::String(name.clone()));
                map.serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for ToolChoice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(s) => match s.as_str() {
                "auto" => Ok(ToolChoice::Auto),
                "required" => Ok(ToolChoice::Required),
                "none" => Ok(ToolChoice::None),
                other => Err(D::Error::custom(format!("unknown tool_choice `{other}`"))),
            },
            Value::Object(mut map) => {
                let name = map
                    .remove("name")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .ok_or_else(|| D::Error::missing_field("name"))?;
                Ok(ToolChoice::Function { name })
            }
            other => Err(D::Error::custom(format!(
                "tool_choice must be a string or object, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    Auto,
    Disabled,
}

impl Default for Truncation {
    fn default() -> Self {
        Truncation::Auto
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponseRequest {
    pub model: String,
    #[serde(default)]
    pub input: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub tool_choice: ToolChoice,
    #[serde(default = "default_true")]
    pub store: bool,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    #[serde(default)]
    pub truncation: Truncation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub parallel_tool_calls: bool,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Configurable ceilings the validator enforces (spec §4.1 edge cases).
/// Lives here rather than in `antwort-engine` so the validator itself stays
/// free of engine-level config plumbing.
#[derive(Debug, Clone, Copy)]
pub struct ValidationLimits {
    pub max_input_items: usize,
    pub max_content_bytes: usize,
    pub max_tools: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_input_items: 500,
            max_content_bytes: 10 * 1024 * 1024,
            max_tools: 128,
        }
    }
}
