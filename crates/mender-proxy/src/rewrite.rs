//! Flattens tool-call history for backends without tool support

use mender_config::RewriteConfig;

use crate::error::ProxyError;
use crate::protocol::openai::{ChatRequest, Content, Message, Role};

/// Whether the most recent message is the output of a named tool call
///
/// Any `name` member counts, even `null`.
pub fn is_tool_result_turn(request: &ChatRequest) -> bool {
    request
        .messages()
        .last()
        .is_some_and(|message| message.has_role(&Role::Tool) && message.extra.contains_key("name"))
}

/// Rewrite a tool-result turn into plain assistant prose
///
/// Assistant turns lose their `tool_calls` (empty ones get the configured
/// placeholder), `tools` and `tool_choice` are dropped, and the trailing
/// block of tool messages is folded into one synthetic assistant message.
/// Any other request is left exactly as received. Returns whether anything
/// was rewritten.
///
/// # Errors
///
/// Returns [`ProxyError::MalformedHistory`] if a tool message remains
/// outside the trailing block
pub fn rewrite_tool_history(request: &mut ChatRequest, config: &RewriteConfig) -> Result<bool, ProxyError> {
    if !is_tool_result_turn(request) {
        return Ok(false);
    }
    let Some(messages) = request.messages.as_mut() else {
        return Ok(false);
    };

    for message in messages.iter_mut().filter(|m| m.has_role(&Role::Assistant)) {
        message.extra.remove("tool_calls");
        if message.lacks_content() {
            message.content = Some(Content::Text(config.tool_placeholder.clone()));
        }
    }

    let block_start = messages
        .iter()
        .rposition(|m| !m.has_role(&Role::Tool))
        .map_or(0, |index| index + 1);
    let mut results = messages.split_off(block_start);
    results.reverse();

    if messages.iter().any(|m| m.has_role(&Role::Tool)) {
        return Err(ProxyError::MalformedHistory);
    }

    let serialized = serde_json::to_string(&results).map_err(|e| ProxyError::Internal(e.into()))?;
    messages.push(Message::assistant(format!("{}{serialized}", config.tool_result_prefix)));

    request.extra.remove("tools");
    request.extra.remove("tool_choice");

    tracing::info!(tool_results = results.len(), "rewrote tool call history");

    Ok(true)
}
