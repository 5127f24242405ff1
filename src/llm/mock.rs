//! Mock LLM 客户端（无需 API）
//!
//! - `ScriptedLlmClient`：按预设脚本依次返回响应，并记录每次请求，供测试断言；
//! - `MockLlmClient`：按关键词路由的离线演示模型，能跑通「交接 -> 调工具 -> 回答」的完整流程。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::llm::{LlmClient, LlmError, ModelRequest, ModelResponse};
use crate::memory::{ConversationItem, FunctionCall};
use crate::tools::{ParamType, ToolSchema, HANDOFF_PREFIX};

/// 一次被记录的模型请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub agent: String,
    pub instructions: String,
    pub tool_names: Vec<String>,
    pub conversation: Vec<ConversationItem>,
}

/// 脚本客户端：依次弹出预设响应；脚本耗尽后返回 fallback（未设置则报错）
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    script: Mutex<VecDeque<Result<ModelResponse, LlmError>>>,
    fallback: Option<ModelResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedLlmClient {
    pub fn new(script: impl IntoIterator<Item = ModelResponse>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// 每次都返回同一响应
    pub fn repeating(response: ModelResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::default()
        }
    }

    /// 在脚本末尾追加一个错误
    pub fn then_fail(self, error: LlmError) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(error));
        }
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                agent: request.agent.to_string(),
                instructions: request.instructions.to_string(),
                tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
                conversation: request.conversation.to_vec(),
            });
        }
        let next = self
            .script
            .lock()
            .map_err(|_| LlmError::Request("script lock poisoned".to_string()))?
            .pop_front();
        match (next, &self.fallback) {
            (Some(step), _) => step,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(LlmError::Request("script exhausted".to_string())),
        }
    }
}

/// 离线演示模型：
/// - 最后一条是工作工具的结果 -> 以该结果作答；
/// - 有交接工具 -> 选描述与问题关键词重合最多的目标交接；
/// - 有工作工具 -> 以问题文本填充参数调用第一个工具；
/// - 否则直接回显问题。
#[derive(Debug, Default)]
pub struct MockLlmClient;

/// 参与关键词匹配的最短词长
const MIN_KEYWORD_CHARS: usize = 4;

impl MockLlmClient {
    fn last_user_message<'a>(conversation: &'a [ConversationItem]) -> &'a str {
        conversation
            .iter()
            .rev()
            .find_map(|item| match item {
                ConversationItem::User { content } => Some(content.as_str()),
                _ => None,
            })
            .unwrap_or("(no input)")
    }

    /// 最后一条为工作工具结果时返回该结果
    fn last_work_result(conversation: &[ConversationItem]) -> Option<&str> {
        let ConversationItem::FunctionCallOutput { call_id, output } = conversation.last()? else {
            return None;
        };
        let is_handoff = conversation.iter().any(|item| {
            matches!(item, ConversationItem::FunctionCall(c)
                if &c.call_id == call_id && c.name.starts_with(HANDOFF_PREFIX))
        });
        (!is_handoff).then_some(output.as_str())
    }

    fn pick_handoff<'a>(query: &str, handoffs: &[&'a ToolSchema]) -> Option<&'a ToolSchema> {
        let keywords: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS)
            .map(str::to_lowercase)
            .collect();
        let mut best: Option<(&'a ToolSchema, usize)> = None;
        for &schema in handoffs {
            let description = schema.description.to_lowercase();
            let score = keywords.iter().filter(|k| description.contains(k.as_str())).count();
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((schema, score));
            }
        }
        best.map(|(schema, _)| schema)
    }

    fn fill_arguments(schema: &ToolSchema, query: &str) -> String {
        let mut args = Map::new();
        for param in &schema.parameters {
            if !schema.is_required(&param.name) {
                continue;
            }
            let value = match param.kind {
                ParamType::String => json!(query),
                ParamType::Integer => json!(0),
                ParamType::Number => json!(0.0),
                ParamType::Boolean => json!(false),
            };
            args.insert(param.name.clone(), value);
        }
        Value::Object(args).to_string()
    }

    fn call_id() -> String {
        format!("call_{}", uuid::Uuid::new_v4().simple())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelResponse, LlmError> {
        let query = Self::last_user_message(request.conversation);

        if let Some(output) = Self::last_work_result(request.conversation) {
            return Ok(ModelResponse::FinalAnswer(format!(
                "[{}] {}",
                request.agent, output
            )));
        }

        let handoffs: Vec<&ToolSchema> = request
            .tools
            .iter()
            .filter(|t| t.name.starts_with(HANDOFF_PREFIX))
            .collect();
        if let Some(target) = Self::pick_handoff(query, &handoffs) {
            let args = json!({ "reason": format!("keyword match for: {query}") });
            return Ok(ModelResponse::tool_calls(vec![FunctionCall::new(
                Self::call_id(),
                target.name.clone(),
                args.to_string(),
            )]));
        }

        if let Some(work) = request.tools.first() {
            return Ok(ModelResponse::tool_calls(vec![FunctionCall::new(
                Self::call_id(),
                work.name.clone(),
                Self::fill_arguments(work, query),
            )]));
        }

        Ok(ModelResponse::FinalAnswer(format!("(mock) {query}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(
        tools: &'a [ToolSchema],
        conversation: &'a [ConversationItem],
    ) -> ModelRequest<'a> {
        ModelRequest {
            agent: "supervisor",
            instructions: "route",
            tools,
            conversation,
        }
    }

    #[tokio::test]
    async fn test_scripted_pops_in_order_then_fails() {
        let llm = ScriptedLlmClient::new([
            ModelResponse::FinalAnswer("one".into()),
            ModelResponse::FinalAnswer("two".into()),
        ]);
        let conv = vec![ConversationItem::user("q")];
        assert_eq!(
            llm.respond(request(&[], &conv)).await.unwrap(),
            ModelResponse::FinalAnswer("one".into())
        );
        assert_eq!(
            llm.respond(request(&[], &conv)).await.unwrap(),
            ModelResponse::FinalAnswer("two".into())
        );
        assert!(llm.respond(request(&[], &conv)).await.is_err());
        assert_eq!(llm.requests().len(), 3);
        assert_eq!(llm.requests()[0].agent, "supervisor");
    }

    #[tokio::test]
    async fn test_scripted_then_fail() {
        let llm = ScriptedLlmClient::default().then_fail(LlmError::Timeout(5));
        let conv = vec![ConversationItem::user("q")];
        assert_eq!(
            llm.respond(request(&[], &conv)).await,
            Err(LlmError::Timeout(5))
        );
    }

    #[tokio::test]
    async fn test_mock_routes_by_keyword() {
        let tools = vec![
            ToolSchema::handoff("sales", "You answer sales questions."),
            ToolSchema::handoff("policy", "You answer policy questions."),
        ];
        let conv = vec![ConversationItem::user("What's our remote work policy?")];
        let response = MockLlmClient.respond(request(&tools, &conv)).await.unwrap();
        match response {
            ModelResponse::ToolCalls { calls, .. } => {
                assert_eq!(calls[0].name, "transfer_to_policy");
            }
            other => panic!("expected handoff, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mock_calls_work_tool_then_answers() {
        let tools = vec![ToolSchema::builder("search_policies", "Search.")
            .param("query", ParamType::String)
            .build()];
        let mut conv = vec![ConversationItem::user("expense policy")];
        let response = MockLlmClient.respond(request(&tools, &conv)).await.unwrap();
        let ModelResponse::ToolCalls { calls, .. } = response else {
            panic!("expected tool call");
        };
        assert_eq!(calls[0].arguments, r#"{"query":"expense policy"}"#);

        conv.push(ConversationItem::FunctionCall(calls[0].clone()));
        conv.push(ConversationItem::output(calls[0].call_id.clone(), r#"{"policies":[]}"#));
        let response = MockLlmClient.respond(request(&tools, &conv)).await.unwrap();
        assert_eq!(
            response,
            ModelResponse::FinalAnswer(r#"[supervisor] {"policies":[]}"#.into())
        );
    }
}
