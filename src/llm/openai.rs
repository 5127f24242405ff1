//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）的 Chat Completions 接口，
//! 以 function tools 暴露工作工具与交接工具；支持 DeepSeek、OpenAI、自建代理等。
//!
//! 对话中未获结果的调用（交接时被丢弃的那部分）不会发往端点。

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionResponseMessage, ChatCompletionTool,
    ChatCompletionTools, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    FunctionCall as ChatFunctionCall, FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, ModelRequest, ModelResponse};
use crate::memory::{ConversationItem, FunctionCall};
use crate::tools::ToolSchema;

/// 默认请求超时（秒）
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client、model 名与请求超时
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    request_timeout: Duration,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new()
                .with_api_base(url)
                .with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            usage: TokenUsage::new(),
        }
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// 组装 Chat Completions 请求；无工具时不带 tools 字段
    pub fn build_request(
        &self,
        request: &ModelRequest<'_>,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(to_chat_messages(request.instructions, request.conversation)?);
        if !request.tools.is_empty() {
            let tools = request
                .tools
                .iter()
                .map(to_chat_tool)
                .collect::<Result<Vec<_>, _>>()?;
            args.tools(tools);
        }
        Ok(args.build()?)
    }
}

impl From<OpenAIError> for LlmError {
    fn from(e: OpenAIError) -> Self {
        LlmError::Request(e.to_string())
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelResponse, LlmError> {
        let chat_request = self.build_request(&request)?;

        let response = tokio::time::timeout(
            self.request_timeout,
            self.client.chat().create(chat_request),
        )
        .await
        .map_err(|_| LlmError::Timeout(self.request_timeout.as_secs()))??;

        // 提取 token 使用统计
        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        let choice = response
            .choices
            .first()
            .ok_or_else(|| LlmError::MalformedResponse("response has no choices".to_string()))?;
        parse_chat_message(&choice.message)
    }
}

fn to_chat_tool(schema: &ToolSchema) -> Result<ChatCompletionTools, LlmError> {
    let function = FunctionObjectArgs::default()
        .name(schema.name.as_str())
        .description(schema.description.as_str())
        .parameters(schema.parameters_json())
        .build()?;
    Ok(ChatCompletionTools::Function(ChatCompletionTool { function }))
}

/// 对话条目 -> Chat Completions messages。
/// 连续的助手文本与函数调用合并为一条 assistant 消息；没有结果的调用被略去。
fn to_chat_messages(
    instructions: &str,
    items: &[ConversationItem],
) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
    let answered: HashSet<&str> = items
        .iter()
        .filter_map(|item| match item {
            ConversationItem::FunctionCallOutput { call_id, .. } => Some(call_id.as_str()),
            _ => None,
        })
        .collect();

    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(instructions)
            .build()?
            .into(),
    ];
    let mut pending = PendingAssistant::default();

    for item in items {
        match item {
            ConversationItem::User { content } => {
                pending.flush_into(&mut messages)?;
                messages.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(content.as_str())
                        .build()?
                        .into(),
                );
            }
            ConversationItem::Assistant { content } => {
                pending.flush_into(&mut messages)?;
                pending.content = Some(content.clone());
            }
            ConversationItem::FunctionCall(call) => {
                if answered.contains(call.call_id.as_str()) {
                    pending.tool_calls.push(ChatCompletionMessageToolCalls::Function(
                        ChatCompletionMessageToolCall {
                            id: call.call_id.clone(),
                            function: ChatFunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        },
                    ));
                }
            }
            ConversationItem::FunctionCallOutput { call_id, output } => {
                pending.flush_into(&mut messages)?;
                messages.push(
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(call_id.as_str())
                        .content(output.as_str())
                        .build()?
                        .into(),
                );
            }
        }
    }
    pending.flush_into(&mut messages)?;
    Ok(messages)
}

#[derive(Default)]
struct PendingAssistant {
    content: Option<String>,
    tool_calls: Vec<ChatCompletionMessageToolCalls>,
}

impl PendingAssistant {
    fn flush_into(
        &mut self,
        messages: &mut Vec<ChatCompletionRequestMessage>,
    ) -> Result<(), LlmError> {
        let content = self.content.take();
        let tool_calls = std::mem::take(&mut self.tool_calls);
        if content.is_none() && tool_calls.is_empty() {
            return Ok(());
        }
        let mut args = ChatCompletionRequestAssistantMessageArgs::default();
        if let Some(content) = content {
            args.content(content);
        }
        if !tool_calls.is_empty() {
            args.tool_calls(tool_calls);
        }
        messages.push(args.build()?.into());
        Ok(())
    }
}

/// 解析响应中的 assistant 消息：content + tool_calls
fn parse_chat_message(
    message: &ChatCompletionResponseMessage,
) -> Result<ModelResponse, LlmError> {
    let mut calls = Vec::new();
    for tool_call in message.tool_calls.iter().flatten() {
        match tool_call {
            ChatCompletionMessageToolCalls::Function(tc)
                if !tc.id.is_empty() && !tc.function.name.is_empty() =>
            {
                calls.push(FunctionCall::new(
                    tc.id.as_str(),
                    tc.function.name.as_str(),
                    tc.function.arguments.as_str(),
                ));
            }
            ChatCompletionMessageToolCalls::Function(tc) => {
                return Err(LlmError::MalformedResponse(format!(
                    "tool call without id or name: {tc:?}"
                )));
            }
            ChatCompletionMessageToolCalls::Custom(tc) => {
                return Err(LlmError::MalformedResponse(format!(
                    "unsupported custom tool call: {}",
                    tc.custom_tool.name
                )));
            }
        }
    }
    Ok(ModelResponse::from_parts(message.content.clone(), calls))
}
