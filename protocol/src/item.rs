use serde::Deserialize;
use serde::Serialize;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde_json::Map;
use serde_json::Value;

use crate::content::ContentPart;
use crate::content::Role;
use crate::ids::new_item_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    InProgress,
    Completed,
    Incomplete,
    Failed,
}

impl ItemStatus {
    /// `in_progress -> {completed, incomplete, failed}`; every other state is
    /// terminal and has no outgoing edges.
    pub fn can_transition_to(self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (
                ItemStatus::InProgress,
                ItemStatus::Completed | ItemStatus::Incomplete | ItemStatus::Failed
            )
        )
    }
}

/// The per-variant payload of an item. Modeled as a Rust sum type for
/// ergonomic construction and matching on this side of the wire; `Item`'s
/// (de)serialization flattens it back onto the envelope so the JSON has no
/// nested wrapper, matching the rest of the wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemPayload {
    Message {
        role: Role,
        content: Vec<ContentPart>,
    },
    FunctionCall {
        name: String,
        call_id: String,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
    Reasoning {
        content: Option<Vec<ContentPart>>,
        encrypted_content: Option<String>,
        summary: Option<Vec<ContentPart>>,
    },
    /// A `provider:subtype`-tagged extension item not otherwise modeled.
    /// `type_tag` is the raw, unvalidated string from the wire; validity
    /// against the `provider:subtype` pattern is checked by `validate_item`,
    /// not at parse time.
    Extension {
        type_tag: String,
        fields: Map<String, Value>,
    },
}

impl ItemPayload {
    pub fn type_tag(&self) -> &str {
        match self {
            ItemPayload::Message { .. } => "message",
            ItemPayload::FunctionCall { .. } => "function_call",
            ItemPayload::FunctionCallOutput { .. } => "function_call_output",
            ItemPayload::Reasoning { .. } => "reasoning",
            ItemPayload::Extension { type_tag, .. } => type_tag,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub status: ItemStatus,
    pub payload: ItemPayload,
}

impl Item {
    pub fn new(id: impl Into<String>, status: ItemStatus, payload: ItemPayload) -> Self {
        Self {
            id: id.into(),
            status,
            payload,
        }
    }

    pub fn kind(&self) -> &str {
        self.payload.type_tag()
    }
}

impl Serialize for Item {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = Map::new();
        map.insert("id".into(), Value::String(self.id.clone()));
        map.insert(
            "type".into(),
            Value::String(self.payload.type_tag().to_string()),
        );
        map.insert(
            "status".into(),
            serde_json::to_value(self.status).map_err(serde::ser::Error::custom)?,
        );
        match &self.payload {
            ItemPayload::Message { role, content } => {
                map.insert("role".into(), serde_json::to_value(role).map_err(S::Error::custom)?);
                map.insert(
                    "content".into(),
                    serde_json::to_value(content).map_err(S::Error::custom)?,
                );
            }
            ItemPayload::FunctionCall {
                name,
                call_id,
                arguments,
            } => {
                map.insert("name".into(), Value::String(name.clone()));
                map.insert("call_id".into(), Value::String(call_id.clone()));
                map.insert("arguments".into(), Value::String(arguments.clone()));
            }
            ItemPayload::FunctionCallOutput { call_id, output } => {
                map.insert("call_id".into(), Value::String(call_id.clone()));
                map.insert("output".into(), Value::String(output.clone()));
            }
            ItemPayload::Reasoning {
                content,
                encrypted_content,
                summary,
            } => {
                map.insert(
                    "content".into(),
                    match content {
                        Some(parts) => serde_json::to_value(parts).map_err(S::Error::custom)?,
                        None => Value::Null,
                    },
                );
                map.insert(
                    "encrypted_content".into(),
                    encrypted_content
                        .clone()
                        .map(Value::String)
                        .unwrap_or(Value::Null),
                );
                map.insert(
                    "summary".into(),
                    match summary {
                        Some(parts) => serde_json::to_value(parts).map_err(S::Error::custom)?,
                        None => Value::Null,
                    },
                );
            }
            ItemPayload::Extension { fields, .. } => {
                for (k, v) in fields {
                    map.insert(k.clone(), v.clone());
                }
            }
        }
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut map = Map::deserialize(deserializer)?;
        // Input items in a `CreateResponseRequest` routinely omit both `id`
        // and `status` (the caller is describing new input, not echoing an
        // item the server already assigned state to) — default rather than
        // reject, and let an output item's own round trip always carry both.
        let id = map
            .remove("id")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(new_item_id);
        let type_tag = map
            .remove("type")
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| D::Error::missing_field("type"))?;
        let status = map
            .remove("status")
            .map(|v| serde_json::from_value(v).map_err(D::Error::custom))
            .transpose()?
            .unwrap_or(ItemStatus::InProgress);

        let payload = match type_tag.as_str() {
            "message" => {
                let role = map
                    .remove("role")
                    .ok_or_else(|| D::Error::missing_field("role"))
                    .and_then(|v| serde_json::from_value(v).map_err(D::Error::custom))?;
                let content = map
                    .remove("content")
                    .map(|v| serde_json::from_value(v).map_err(D::Error::custom))
                    .transpose()?
                    .unwrap_or_default();
                ItemPayload::Message { role, content }
            }
            "function_call" => {
                let name = take_string(&mut map, "name")?;
                let call_id = take_string(&mut map, "call_id")?;
                let arguments = take_string(&mut map, "arguments")?;
                ItemPayload::FunctionCall {
                    name,
                    call_id,
                    arguments,
                }
            }
            "function_call_output" => {
                let call_id = take_string(&mut map, "call_id")?;
                let output = take_string(&mut map, "output")?;
                ItemPayload::FunctionCallOutput { call_id, output }
            }
            "reasoning" => {
                let content = map
                    .remove("content")
                    .filter(|v| !v.is_null())
                    .map(|v| serde_json::from_value(v).map_err(D::Error::custom))
                    .transpose()?;
                let encrypted_content = map
                    .remove("encrypted_content")
                    .and_then(|v| v.as_str().map(str::to_string));
                let summary = map
                    .remove("summary")
                    .filter(|v| !v.is_null())
                    .map(|v| serde_json::from_value(v).map_err(D::Error::custom))
                    .transpose()?;
                ItemPayload::Reasoning {
                    content,
                    encrypted_content,
                    summary,
                }
            }
            other => ItemPayload::Extension {
                type_tag: other.to_string(),
                fields: map.clone(),
            },
        };

        Ok(Item {
            id,
            status,
            payload,
        })
    }
}

fn take_string<E: serde::de::Error>(map: &mut Map<String, Value>, key: &str) -> Result<String, E> {
    map.remove(key)
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| E::custom(format!("missing field `{key}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::is_item_id;

    #[test]
    fn message_item_round_trips_flat() {
        let item = Item::new(
            "item_abcdefghijklmnopqrstuvwx",
            ItemStatus::Completed,
            ItemPayload::Message {
                role: Role::Assistant,
                content: vec![ContentPart::OutputText {
                    text: "hi".into(),
                    annotations: vec![],
                    logprobs: vec![],
                }],
            },
        );
        let value = serde_json::to_value(&item).expect("serialize");
        assert_eq!(value["type"], "message");
        assert_eq!(value["role"], "assistant");
        assert!(value.get("call_id").is_none());

        let back: Item = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, item);
    }

    #[test]
    fn function_call_omits_message_fields() {
        let item = Item::new(
            "item_abcdefghijklmnopqrstuvwx",
            ItemStatus::Completed,
            ItemPayload::FunctionCall {
                name: "get_weather".into(),
                call_id: "call_1".into(),
                arguments: "{\"city\":\"nyc\"}".into(),
            },
        );
        let value = serde_json::to_value(&item).expect("serialize");
        assert!(value.get("role").is_none());
        assert!(value.get("content").is_none());
        assert_eq!(value["arguments"], "{\"city\":\"nyc\"}");
    }

    #[test]
    fn unrecognized_type_parses_as_extension() {
        let value = serde_json::json!({
            "id": "item_abcdefghijklmnopqrstuvwx",
            "type": "openai:web_search_call",
            "status": "completed",
            "query": "weather in nyc",
        });
        let item: Item = serde_json::from_value(value).expect("deserialize");
        match &item.payload {
            ItemPayload::Extension { type_tag, fields } => {
                assert_eq!(type_tag, "openai:web_search_call");
                assert_eq!(fields["query"], "weather in nyc");
            }
            other => panic!("expected extension payload, got {other:?}"),
        }
    }

    #[test]
    fn input_item_without_id_or_status_defaults_both() {
        let value = serde_json::json!({
            "type": "message",
            "role": "user",
            "content": [{"type": "input_text", "text": "hi"}],
        });
        let item: Item = serde_json::from_value(value).expect("deserialize");
        assert!(is_item_id(&item.id), "expected a generated item id, got {}", item.id);
        assert_eq!(item.status, ItemStatus::InProgress);
    }

    #[test]
    fn status_transitions() {
        assert!(ItemStatus::InProgress.can_transition_to(ItemStatus::Completed));
        assert!(ItemStatus::InProgress.can_transition_to(ItemStatus::Failed));
        assert!(!ItemStatus::Completed.can_transition_to(ItemStatus::InProgress));
        assert!(!ItemStatus::Failed.can_transition_to(ItemStatus::Completed));
    }
}
