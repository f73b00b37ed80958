pub mod agent;

pub use agent::{AnswerSource, ChatAgent, ChatReply, ReplyMode, StartedSession};
