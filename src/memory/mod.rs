//! 记忆层：单次 run 的对话历史（不做跨会话持久化）

pub mod conversation;

pub use conversation::{Conversation, ConversationItem, FunctionCall};
