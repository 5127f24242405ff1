//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：给定当前智能体的指令、工具 Schema
//! 与完整对话，返回最终回答或一组函数调用。失败直接上抛，重试由调用方负责。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::{ConversationItem, FunctionCall};
use crate::tools::ToolSchema;

/// 模型调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// 单次模型调用的输入
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    /// 当前智能体名（仅用于日志与 Mock）
    pub agent: &'a str,
    pub instructions: &'a str,
    pub tools: &'a [ToolSchema],
    pub conversation: &'a [ConversationItem],
}

/// 模型输出：最终回答，或按发出顺序排列的函数调用（可附带一段文本）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResponse {
    FinalAnswer(String),
    ToolCalls {
        text: Option<String>,
        calls: Vec<FunctionCall>,
    },
}

impl ModelResponse {
    /// 按是否含函数调用归类
    pub fn from_parts(text: Option<String>, calls: Vec<FunctionCall>) -> Self {
        if calls.is_empty() {
            ModelResponse::FinalAnswer(text.unwrap_or_default())
        } else {
            ModelResponse::ToolCalls {
                text: text.filter(|t| !t.is_empty()),
                calls,
            }
        }
    }

    pub fn tool_calls(calls: Vec<FunctionCall>) -> Self {
        ModelResponse::ToolCalls { text: None, calls }
    }

    /// 要追加到对话中的输出条目（保持顺序）
    pub fn output_items(&self) -> Vec<ConversationItem> {
        match self {
            ModelResponse::FinalAnswer(text) => vec![ConversationItem::assistant(text.clone())],
            ModelResponse::ToolCalls { text, calls } => text
                .iter()
                .map(|t| ConversationItem::assistant(t.clone()))
                .chain(calls.iter().cloned().map(ConversationItem::FunctionCall))
                .collect(),
        }
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelResponse, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        assert_eq!(
            ModelResponse::from_parts(Some("done".into()), vec![]),
            ModelResponse::FinalAnswer("done".into())
        );
        assert_eq!(
            ModelResponse::from_parts(None, vec![]),
            ModelResponse::FinalAnswer(String::new())
        );
        let call = FunctionCall::new("c1", "t", "{}");
        assert_eq!(
            ModelResponse::from_parts(Some(String::new()), vec![call.clone()]),
            ModelResponse::tool_calls(vec![call])
        );
    }

    #[test]
    fn test_output_items_order() {
        let response = ModelResponse::ToolCalls {
            text: Some("checking".into()),
            calls: vec![
                FunctionCall::new("c1", "a", "{}"),
                FunctionCall::new("c2", "b", "{}"),
            ],
        };
        let items = response.output_items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], ConversationItem::assistant("checking"));
        assert!(matches!(&items[2], ConversationItem::FunctionCall(c) if c.call_id == "c2"));
    }
}
