//! Action request protocol
//!
//! Turns agent replies into validated, dispatched actions with normalized
//! results, and keeps the bounded conversation history of a session.

mod dispatcher;
mod history;
mod parser;
mod session;

pub use dispatcher::ActionRequestProtocol;
pub use history::{ConversationHistory, HistoryEntry, Role};
pub use parser::{parse_agent_reply, AgentReply};
pub use session::{Session, TurnOutcome};
