//! Repairs known content malformations in completed chat responses

use crate::protocol::openai::{ChatResponse, Content, ContentPart, PartKind};

/// Internal index prefix some backends leak into message content
pub const INDEX_PREFIX: &str = "0: ";

/// Content shapes the normalizer knows how to repair
#[derive(Debug, PartialEq, Eq)]
enum Malformation<'a> {
    /// String content carrying the index prefix; holds the remaining text
    IndexPrefix(&'a str),
    /// Parts made of exactly `text` and `tool` types; holds the text to keep
    ToolTextParts(&'a str),
    /// Anything else
    Untouched,
}

fn detect(content: &Content) -> Malformation<'_> {
    match content {
        Content::Text(text) => text
            .strip_prefix(INDEX_PREFIX)
            .map_or(Malformation::Untouched, Malformation::IndexPrefix),
        Content::Parts(parts) => detect_parts(parts),
        Content::Other(_) => Malformation::Untouched,
    }
}

/// Non-object items neither count toward the type set nor block a repair
fn detect_parts(parts: &[ContentPart]) -> Malformation<'_> {
    let has = |kind| parts.iter().any(|part| part.kind() == Some(kind));

    if has(PartKind::Other) || !has(PartKind::Text) || !has(PartKind::Tool) {
        return Malformation::Untouched;
    }

    // Last text part wins
    parts
        .iter()
        .rev()
        .find(|part| part.kind() == Some(PartKind::Text))
        .and_then(ContentPart::text_content)
        .map_or(Malformation::Untouched, |text| {
            Malformation::ToolTextParts(text.strip_prefix(INDEX_PREFIX).unwrap_or(text))
        })
}

/// Normalize the content of the first choice in place
///
/// Only `choices[0].message.content` is ever touched. Returns whether a
/// repair was applied.
pub fn normalize(response: &mut ChatResponse) -> bool {
    let Some(choice) = response.choices.first_mut() else {
        return false;
    };
    let Some(message) = choice.message.as_mut() else {
        return false;
    };
    let Some(content) = message.content.as_ref() else {
        return false;
    };

    let repaired = match detect(content) {
        Malformation::IndexPrefix(text) | Malformation::ToolTextParts(text) => text.to_owned(),
        Malformation::Untouched => return false,
    };

    tracing::debug!("normalized response content");
    message.content = Some(Content::Text(repaired));
    true
}
