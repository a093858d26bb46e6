use crate::error::ApiError;
use crate::item::Item;
use crate::item::ItemPayload;
use crate::item::ItemStatus;
use crate::request::CreateResponseRequest;
use crate::request::ToolChoice;
use crate::request::ValidationLimits;
use crate::response::ResponseStatus;

fn content_byte_len(item: &Item) -> usize {
    match &item.payload {
        ItemPayload::Message { content, .. } => content
            .iter()
            .filter_map(|part| part.text())
            .map(str::len)
            .sum(),
        ItemPayload::FunctionCall { arguments, .. } => arguments.len(),
        ItemPayload::FunctionCallOutput { output, .. } => output.len(),
        ItemPayload::Reasoning {
            content, summary, ..
        } => {
            let content_len: usize = content
                .iter()
                .flatten()
                .filter_map(|part| part.text())
                .map(str::len)
                .sum();
            let summary_len: usize = summary
                .iter()
                .flatten()
                .filter_map(|part| part.text())
                .map(str::len)
                .sum();
            content_len + summary_len
        }
        ItemPayload::Extension { fields, .. } => serde_json::to_string(fields)
            .map(|s| s.len())
            .unwrap_or(0),
    }
}

/// Standard item type or a syntactically valid `provider:subtype` extension
/// tag (non-empty prefix, non-empty suffix, exactly one colon).
pub fn is_valid_type_tag(tag: &str) -> bool {
    matches!(
        tag,
        "message" | "function_call" | "function_call_output" | "reasoning"
    ) || {
        let mut parts = tag.splitn(2, ':');
        match (parts.next(), parts.next()) {
            (Some(provider), Some(subtype)) => !provider.is_empty() && !subtype.is_empty(),
            _ => false,
        }
    }
}

pub fn validate_item(item: &Item, limits: &ValidationLimits) -> Result<(), ApiError> {
    if !is_valid_type_tag(item.payload.type_tag()) {
        return Err(ApiError::invalid_request(format!(
            "item type `{}` is not a standard type or a valid provider:subtype extension",
            item.payload.type_tag()
        ))
        .with_param("input"));
    }

    match &item.payload {
        ItemPayload::Message { content, .. } => {
            if content.is_empty() {
                return Err(
                    ApiError::invalid_request("message item must have non-empty content")
                        .with_param("input"),
                );
            }
        }
        ItemPayload::FunctionCall { call_id, name, .. } => {
            if call_id.is_empty() || name.is_empty() {
                return Err(ApiError::invalid_request(
                    "function_call item requires non-empty call_id and name",
                )
                .with_param("input"));
            }
        }
        ItemPayload::FunctionCallOutput { call_id, .. } => {
            if call_id.is_empty() {
                return Err(ApiError::invalid_request(
                    "function_call_output item requires a non-empty call_id",
                )
                .with_param("input"));
            }
        }
        ItemPayload::Reasoning {
            content,
            encrypted_content,
            summary,
        } => {
            if content.is_none() && encrypted_content.is_none() && summary.is_none() {
                return Err(ApiError::invalid_request(
                    "reasoning item must populate at least one of content, encrypted_content, summary",
                )
                .with_param("input"));
            }
        }
        ItemPayload::Extension { .. } => {}
    }

    if content_byte_len(item) > limits.max_content_bytes {
        return Err(ApiError::invalid_request(format!(
            "item content exceeds the {}-byte limit",
            limits.max_content_bytes
        ))
        .with_param("input"));
    }

    Ok(())
}

pub fn validate_request(
    request: &CreateResponseRequest,
    limits: &ValidationLimits,
) -> Result<(), ApiError> {
    if request.model.trim().is_empty() {
        return Err(ApiError::invalid_request("model must not be empty").with_param("model"));
    }

    if request.input.is_empty() && request.previous_response_id.is_none() {
        return Err(ApiError::invalid_request(
            "request must supply input or chain from previous_response_id",
        )
        .with_param("input"));
    }

    if request.input.len() > limits.max_input_items {
        return Err(ApiError::invalid_request(format!(
            "input has {} items, exceeding the limit of {}",
            request.input.len(),
            limits.max_input_items
        ))
        .with_param("input"));
    }

    for item in &request.input {
        validate_item(item, limits)?;
    }

    if request.tools.len() > limits.max_tools {
        return Err(ApiError::invalid_request(format!(
            "tools has {} entries, exceeding the limit of {}",
            request.tools.len(),
            limits.max_tools
        ))
        .with_param("tools"));
    }

    let mut seen_names = std::collections::HashSet::new();
    for tool in &request.tools {
        if !seen_names.insert(tool.name()) {
            return Err(ApiError::invalid_request(format!(
                "duplicate tool name `{}`",
                tool.name()
            ))
            .with_param("tools"));
        }
    }

    if !request.store && request.previous_response_id.is_some() {
        return Err(ApiError::invalid_request(
            "previous_response_id requires store:true; stateless requests cannot chain",
        )
        .with_param("previous_response_id"));
    }

    if let Some(temperature) = request.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(
                ApiError::invalid_request("temperature must be between 0.0 and 2.0")
                    .with_param("temperature"),
            );
        }
    }

    if let Some(top_p) = request.top_p {
        if !(0.0..=1.0).contains(&top_p) {
            return Err(ApiError::invalid_request("top_p must be between 0.0 and 1.0")
                .with_param("top_p"));
        }
    }

    if let Some(max_output_tokens) = request.max_output_tokens {
        if max_output_tokens == 0 {
            return Err(
                ApiError::invalid_request("max_output_tokens must be greater than 0")
                    .with_param("max_output_tokens"),
            );
        }
    }

    if let ToolChoice::Function { name } = &request.tool_choice {
        if !request.tools.iter().any(|tool| tool.name() == name.as_str()) {
            return Err(ApiError::invalid_request(format!(
                "tool_choice forces tool `{name}`, which is not in `tools`"
            ))
            .with_param("tool_choice"));
        }
    }

    Ok(())
}

pub fn validate_response_transition(
    from: ResponseStatus,
    to: ResponseStatus,
) -> Result<(), ApiError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ApiError::server_error(format!(
            "invalid response state transition from {from:?} to {to:?}"
        )))
    }
}

pub fn validate_item_transition(from: ItemStatus, to: ItemStatus) -> Result<(), ApiError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ApiError::server_error(format!(
            "invalid item state transition from {from:?} to {to:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentPart;
    use crate::content::Role;

    fn limits() -> ValidationLimits {
        ValidationLimits::default()
    }

    fn text_message(text: &str) -> Item {
        Item::new(
            "item_abcdefghijklmnopqrstuvwx",
            ItemStatus::Completed,
            ItemPayload::Message {
                role: Role::User,
                content: vec![ContentPart::InputText { text: text.into() }],
            },
        )
    }

    #[test]
    fn rejects_empty_model() {
        let request = CreateResponseRequest {
            model: "".into(),
            input: vec![text_message("hi")],
            instructions: None,
            tools: vec![],
            tool_choice: Default::default(),
            store: true,
            stream: false,
            previous_response_id: None,
            truncation: Default::default(),
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            metadata: Default::default(),
            include: None,
            parallel_tool_calls: true,
            extensions: Default::default(),
        };
        let err = validate_request(&request, &limits()).unwrap_err();
        assert_eq!(err.param.as_deref(), Some("model"));
    }

    #[test]
    fn rejects_stateless_chaining() {
        let request = CreateResponseRequest {
            model: "gpt-test".into(),
            input: vec![text_message("hi")],
            instructions: None,
            tools: vec![],
            tool_choice: Default::default(),
            store: false,
            stream: false,
            previous_response_id: Some("resp_abcdefghijklmnopqrstuvwx".into()),
            truncation: Default::default(),
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            metadata: Default::default(),
            include: None,
            parallel_tool_calls: true,
            extensions: Default::default(),
        };
        let err = validate_request(&request, &limits()).unwrap_err();
        assert_eq!(err.param.as_deref(), Some("previous_response_id"));
    }

    #[test]
    fn accepts_provider_subtype_extension_item() {
        let item = Item::new(
            "item_abcdefghijklmnopqrstuvwx",
            ItemStatus::Completed,
            ItemPayload::Extension {
                type_tag: "openai:web_search_call".into(),
                fields: Default::default(),
            },
        );
        assert!(validate_item(&item, &limits()).is_ok());
    }

    #[test]
    fn rejects_malformed_type_tag() {
        let item = Item::new(
            "item_abcdefghijklmnopqrstuvwx",
            ItemStatus::Completed,
            ItemPayload::Extension {
                type_tag: "not-a-valid-tag".into(),
                fields: Default::default(),
            },
        );
        assert!(validate_item(&item, &limits()).is_err());
    }

    #[test]
    fn rejects_zero_max_output_tokens() {
        let request = CreateResponseRequest {
            model: "gpt-test".into(),
            input: vec![text_message("hi")],
            instructions: None,
            tools: vec![],
            tool_choice: Default::default(),
            store: true,
            stream: false,
            previous_response_id: None,
            truncation: Default::default(),
            temperature: None,
            top_p: None,
            max_output_tokens: Some(0),
            metadata: Default::default(),
            include: None,
            parallel_tool_calls: true,
            extensions: Default::default(),
        };
        let err = validate_request(&request, &limits()).unwrap_err();
        assert_eq!(err.param.as_deref(), Some("max_output_tokens"));
    }

    #[test]
    fn rejects_forced_tool_choice_not_in_tools() {
        let request = CreateResponseRequest {
            model: "gpt-test".into(),
            input: vec![text_message("hi")],
            instructions: None,
            tools: vec![],
            tool_choice: crate::request::ToolChoice::Function {
                name: "get_weather".into(),
            },
            store: true,
            stream: false,
            previous_response_id: None,
            truncation: Default::default(),
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            metadata: Default::default(),
            include: None,
            parallel_tool_calls: true,
            extensions: Default::default(),
        };
        let err = validate_request(&request, &limits()).unwrap_err();
        assert_eq!(err.param.as_deref(), Some("tool_choice"));
    }

    #[test]
    fn empty_message_content_is_rejected() {
        let item = Item::new(
            "item_abcdefghijklmnopqrstuvwx",
            ItemStatus::Completed,
            ItemPayload::Message {
                role: Role::User,
                content: vec![],
            },
        );
        assert!(validate_item(&item, &limits()).is_err());
    }
}
