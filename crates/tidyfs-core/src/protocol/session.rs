//! Agent turn handling

use super::dispatcher::ActionRequestProtocol;
use super::history::{ConversationHistory, HistoryEntry};
use super::parser::parse_agent_reply;
use crate::types::ActionResult;
use serde::Serialize;
use tracing::debug;

/// What one agent reply produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ActionResult>,
    /// Text shown to the user and recorded in the history
    pub response: String,
}

/// A protocol plus the bounded history of the conversation driving it
pub struct Session {
    protocol: ActionRequestProtocol,
    history: ConversationHistory,
}

impl Session {
    pub fn new(protocol: ActionRequestProtocol, history_capacity: usize) -> Self {
        Self {
            protocol,
            history: ConversationHistory::new(history_capacity),
        }
    }

    pub fn protocol(&self) -> &ActionRequestProtocol {
        &self.protocol
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Audit and record a user message
    pub fn record_user_input(&mut self, text: &str) {
        self.protocol.validator().validate_user_text(text);
        self.append(HistoryEntry::user(text));
    }

    /// Parse an agent reply, execute at most one action, and record the turn
    pub fn handle_reply(&mut self, text: &str) -> TurnOutcome {
        self.protocol.validator().validate_user_text(text);
        let reply = parse_agent_reply(text);

        let mut parts: Vec<String> = reply.conversation.iter().cloned().collect();
        let (action, result) = match reply.request {
            Some(request) => {
                let result = self.protocol.execute(&request);
                parts.push(render(&result));
                (Some(request.action), Some(result))
            }
            None => {
                debug!("Reply carried no action");
                (None, None)
            }
        };

        let response = parts.join("\n\n");
        self.append(HistoryEntry::assistant(response.clone()));

        TurnOutcome {
            conversation: reply.conversation,
            action,
            result,
            response,
        }
    }

    fn append(&mut self, entry: HistoryEntry) {
        self.history = std::mem::take(&mut self.history).push(entry);
    }
}

fn render(result: &ActionResult) -> String {
    match result {
        ActionResult::Error { message, .. } => format!("Error: {}", message),
        ActionResult::Success { message, details } => match details.get("items") {
            Some(serde_json::Value::Array(items)) => {
                let lines: Vec<String> = items
                    .iter()
                    .map(|item| {
                        let marker = if item["type"] == "directory" { "[dir]" } else { "[file]" };
                        format!("{} {}", marker, item["name"].as_str().unwrap_or_default())
                    })
                    .collect();
                format!("{}\n{}", message, lines.join("\n"))
            }
            _ => message.clone(),
        },
    }
}
