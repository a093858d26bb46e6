use antwort_protocol::FunctionDef;
use antwort_protocol::Tool;
use serde_json::json;

/// Expands the built-in tool stubs (`code_interpreter`, `file_search`,
/// `web_search_preview`) into real function definitions before a request is
/// sent to a backend that only understands function tools. `Tool::Function`
/// entries pass through untouched. This stays in the provider layer, not the
/// engine, because the expanded shape is a backend-wire concern: a native
/// Responses API backend may support these tools directly and not need the
/// expansion at all (see `ResponsesApiProvider`).
pub fn expand_builtin_tools(tools: &[Tool]) -> Vec<Tool> {
    tools.iter().map(expand_one).collect()
}

fn expand_one(tool: &Tool) -> Tool {
    match tool {
        Tool::Function { .. } => tool.clone(),
        Tool::CodeInterpreter => Tool::Function {
            function: FunctionDef {
                name: "code_interpreter".into(),
                description: Some(
                    "Executes Python code in a sandboxed interpreter and returns stdout, \
                     stderr, and any produced files."
                        .into(),
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "code": {
                            "type": "string",
                            "description": "Python source to execute.",
                        }
                    },
                    "required": ["code"],
                    "additionalProperties": false,
                }),
                strict: Some(true),
            },
        },
        Tool::FileSearch => Tool::Function {
            function: FunctionDef {
                name: "file_search".into(),
                description: Some(
                    "Searches the configured vector stores for passages relevant to a query."
                        .into(),
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Natural-language search query.",
                        },
                        "max_results": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": 50,
                        }
                    },
                    "required": ["query"],
                    "additionalProperties": false,
                }),
                strict: Some(true),
            },
        },
        Tool::WebSearchPreview => Tool::Function {
            function: FunctionDef {
                name: "web_search_preview".into(),
                description: Some(
                    "Runs a live web search and returns ranked results with titles, URLs, \
                     and snippets."
                        .into(),
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search engine query string.",
                        }
                    },
                    "required": ["query"],
                    "additionalProperties": false,
                }),
                strict: Some(true),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_tools_pass_through_unchanged() {
        let function = Tool::Function {
            function: FunctionDef {
                name: "get_weather".into(),
                description: None,
                parameters: json!({"type": "object"}),
                strict: None,
            },
        };
        let expanded = expand_builtin_tools(std::slice::from_ref(&function));
        assert_eq!(expanded, vec![function]);
    }

    #[test]
    fn code_interpreter_expands_to_a_function_with_code_parameter() {
        let expanded = expand_builtin_tools(&[Tool::CodeInterpreter]);
        match &expanded[0] {
            Tool::Function { function } => {
                assert_eq!(function.name, "code_interpreter");
                assert_eq!(function.parameters["required"][0], "code");
            }
            other => panic!("expected expanded function tool, got {other:?}"),
        }
    }

    #[test]
    fn all_builtins_expand_to_distinct_names() {
        let expanded =
            expand_builtin_tools(&[Tool::CodeInterpreter, Tool::FileSearch, Tool::WebSearchPreview]);
        let names: Vec<&str> = expanded.iter().map(Tool::name).collect();
        assert_eq!(names, vec!["code_interpreter", "file_search", "web_search_preview"]);
    }
}
