//! Extraction of an action descriptor from free-form agent text

use crate::types::ActionRequest;
use serde::Serialize;
use tracing::debug;

/// An agent reply split into its action descriptor and conversational text
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AgentReply {
    pub request: Option<ActionRequest>,
    pub conversation: Option<String>,
}

impl AgentReply {
    pub fn has_action(&self) -> bool {
        self.request.is_some()
    }
}

/// Split agent text into an optional [`ActionRequest`] and conversation.
///
/// The candidate descriptor spans the first `{` to the last `}`. When that
/// span is missing or does not deserialize into an `ActionRequest`, the whole
/// text is conversation and no action is taken.
pub fn parse_agent_reply(text: &str) -> AgentReply {
    let Some((start, end)) = descriptor_span(text) else {
        return conversation_only(text);
    };

    match serde_json::from_str::<ActionRequest>(&text[start..=end]) {
        Ok(request) => {
            let around = format!("{} {}", text[..start].trim(), text[end + 1..].trim());
            AgentReply {
                request: Some(request),
                conversation: non_empty(&around),
            }
        }
        Err(e) => {
            debug!("No action descriptor in reply: {}", e);
            conversation_only(text)
        }
    }
}

fn descriptor_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then_some((start, end))
}

fn conversation_only(text: &str) -> AgentReply {
    AgentReply {
        request: None,
        conversation: non_empty(text),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
