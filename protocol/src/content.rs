use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Developer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogProb {
    pub token: String,
    pub logprob: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_logprobs: Vec<TopLogProb>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopLogProb {
    pub token: String,
    pub logprob: f64,
}

/// Annotation shape varies by kind (`file_citation`, `url_citation`, ...);
/// kept as an opaque flattened object rather than an enum until a consumer
/// needs typed access to a specific annotation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(flatten)]
    pub value: serde_json::Map<String, serde_json::Value>,
}

/// A single part of an item's multimodal content array. Covers both input
/// parts (what a caller sends) and output parts (what a model produces),
/// since both share the same wire slot on `Item`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText {
        text: String,
    },
    InputImage {
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        #[serde(default, rename = "detail", skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    InputAudio {
        data: String,
        format: String,
    },
    InputVideo {
        #[serde(skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
    },
    OutputText {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<Annotation>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        logprobs: Vec<LogProb>,
    },
    SummaryText {
        text: String,
    },
    Refusal {
        refusal: String,
    },
}

impl ContentPart {
    pub fn text(&self) -> Option<&str> {
        match self {
            ContentPart::InputText { text }
            | ContentPart::OutputText { text, .. }
            | ContentPart::SummaryText { text } => Some(text),
            _ => None,
        }
    }
}
