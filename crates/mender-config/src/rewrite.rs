use serde::Deserialize;

/// Text used when flattening tool-call history for backends without tool support
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewriteConfig {
    /// Content given to assistant turns that only carried `tool_calls`
    #[serde(default = "default_tool_placeholder")]
    pub tool_placeholder: String,
    /// Prefix of the synthetic assistant message holding the tool results
    #[serde(default = "default_tool_result_prefix")]
    pub tool_result_prefix: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            tool_placeholder: default_tool_placeholder(),
            tool_result_prefix: default_tool_result_prefix(),
        }
    }
}

fn default_tool_placeholder() -> String {
    "I will call an external tool to answer this question...".to_string()
}

fn default_tool_result_prefix() -> String {
    "External tool call results: ".to_string()
}
