//! 多智能体编排器：Handoff as Tool 主循环
//!
//! 每轮：以当前智能体的指令与工具 Schema + 完整对话调用模型 -> 追加模型输出 ->
//! 无函数调用则结束；否则按发出顺序处理调用：
//! - 工作工具：执行并回写结果（错误也以 `{"error": ...}` 回写），继续下一个调用；
//! - 交接工具：回写 `{"ok": true}`、切换当前智能体，并丢弃本批剩余调用（不执行、不回写）。
//!
//! 轮数用尽返回占位文本而不是错误；模型调用失败直接上抛。

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::core::{
    AgentId, AgentRoster, BuildError, OrchestratorEvent, Registry, RunError, RunOutcome, RunState,
    RunStatus,
};
use crate::llm::{LlmClient, ModelRequest, ModelResponse};
use crate::memory::{ConversationItem, FunctionCall};
use crate::tools::executor::preview;
use crate::tools::{tool_output, ToolExecutor};

/// 默认最大轮数
pub const DEFAULT_MAX_TURNS: usize = 10;
/// 轮数用尽时返回的占位文本
pub const MAX_TURNS_REACHED: &str = "(max turns reached)";
/// 模型给出空回答时返回的占位文本
pub const NO_OUTPUT: &str = "(no output)";

/// 日志中参数预览的最大字符数
const ARGS_LOG_CHARS: usize = 50;
/// 事件中工具结果预览的最大字符数
const RESULT_PREVIEW_CHARS: usize = 200;

type EventTx = mpsc::UnboundedSender<OrchestratorEvent>;

fn send_event(tx: Option<&EventTx>, ev: OrchestratorEvent) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}

/// 编排器：只读注册表 + 模型客户端 + 工具执行器；可在多个并发 run 间共享
#[derive(Clone)]
pub struct MultiAgent {
    registry: Arc<Registry>,
    llm: Arc<dyn LlmClient>,
    executor: ToolExecutor,
}

impl fmt::Debug for MultiAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiAgent")
            .field("agents", &self.registry.agent_names())
            .field(
                "supervisor",
                &self.registry.agent_name(self.registry.supervisor()),
            )
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl MultiAgent {
    /// 从名册构建注册表；装配错误在此处即失败
    pub fn new(
        roster: &AgentRoster,
        supervisor: &str,
        llm: Arc<dyn LlmClient>,
    ) -> Result<Self, BuildError> {
        let registry = Registry::build(roster, supervisor)?;
        Ok(Self::from_registry(Arc::new(registry), llm))
    }

    pub fn from_registry(registry: Arc<Registry>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            registry,
            llm,
            executor: ToolExecutor::default(),
        }
    }

    pub fn with_executor(mut self, executor: ToolExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// 运行一次请求，返回最终回答；轮数用尽时返回 `MAX_TURNS_REACHED`
    pub async fn run(&self, query: &str, max_turns: usize) -> Result<String, RunError> {
        Ok(self.run_impl(query, max_turns, None).await?.answer)
    }

    /// 同 run，但返回完整结果（终止方式、最终智能体、轮数、对话）
    pub async fn run_detailed(&self, query: &str, max_turns: usize) -> Result<RunOutcome, RunError> {
        self.run_impl(query, max_turns, None).await
    }

    /// 同 run_detailed，并把过程事件推送到 event_tx
    pub async fn run_with_events(
        &self,
        query: &str,
        max_turns: usize,
        event_tx: &EventTx,
    ) -> Result<RunOutcome, RunError> {
        self.run_impl(query, max_turns, Some(event_tx)).await
    }

    async fn run_impl(
        &self,
        query: &str,
        max_turns: usize,
        event_tx: Option<&EventTx>,
    ) -> Result<RunOutcome, RunError> {
        tracing::info!(query = %preview(query, RESULT_PREVIEW_CHARS), max_turns, "run started");
        let mut state = RunState::new(query, self.registry.supervisor());

        while state.turns_used < max_turns {
            let agent = state.active_agent;
            let agent_name = self.registry.agent_name(agent);
            let turn = state.turns_used + 1;
            tracing::info!(agent = %agent_name, turn, "thinking");
            send_event(
                event_tx,
                OrchestratorEvent::Turn {
                    turn,
                    max_turns,
                    agent: agent_name.to_string(),
                },
            );

            let response = self
                .llm
                .respond(ModelRequest {
                    agent: agent_name,
                    instructions: self.registry.instructions(agent),
                    tools: self.registry.tool_schemas(agent),
                    conversation: state.conversation.items(),
                })
                .await
                .map_err(|source| {
                    tracing::error!(agent = %agent_name, error = %source, "model invocation failed");
                    RunError::ModelInvocation {
                        agent: agent_name.to_string(),
                        source,
                    }
                })?;
            state.turns_used += 1;
            state.conversation.extend(response.output_items());

            match response {
                ModelResponse::FinalAnswer(text) => {
                    tracing::info!(agent = %agent_name, turn, "final answer");
                    let answer = if text.is_empty() {
                        NO_OUTPUT.to_string()
                    } else {
                        text
                    };
                    send_event(
                        event_tx,
                        OrchestratorEvent::FinalAnswer {
                            agent: agent_name.to_string(),
                            text: answer.clone(),
                        },
                    );
                    return Ok(self.finish(state, answer, RunStatus::Done));
                }
                ModelResponse::ToolCalls { calls, .. } => {
                    self.dispatch_calls(&mut state, &calls, event_tx).await;
                }
            }
        }

        tracing::warn!(max_turns, "turn budget exhausted without a final answer");
        send_event(event_tx, OrchestratorEvent::Exhausted { max_turns });
        Ok(self.finish(state, MAX_TURNS_REACHED.to_string(), RunStatus::Exhausted))
    }

    /// 按发出顺序处理一批调用；遇到第一个交接调用即切换智能体并丢弃其后的调用
    async fn dispatch_calls(
        &self,
        state: &mut RunState,
        calls: &[FunctionCall],
        event_tx: Option<&EventTx>,
    ) {
        let from = state.active_agent;
        let from_name = self.registry.agent_name(from);

        for (i, call) in calls.iter().enumerate() {
            tracing::info!(
                agent = %from_name,
                tool = %call.name,
                args = %preview(&call.arguments, ARGS_LOG_CHARS),
                "tool call"
            );

            if let Some(target) = self.registry.handoff_id(&call.name) {
                self.hand_off(state, call, target, event_tx);
                let dropped = calls.len() - i - 1;
                if dropped > 0 {
                    tracing::warn!(agent = %from_name, dropped, "calls after handoff abandoned");
                }
                return;
            }

            send_event(
                event_tx,
                OrchestratorEvent::ToolCall {
                    agent: from_name.to_string(),
                    tool: call.name.clone(),
                    arguments: call.arguments.clone(),
                },
            );
            let result = self
                .executor
                .execute(self.registry.callables(), &call.name, &call.arguments)
                .await;
            if let Err(e) = &result {
                tracing::warn!(agent = %from_name, tool = %call.name, error = %e, "tool call failed");
            }
            let output = tool_output(&result);
            send_event(
                event_tx,
                OrchestratorEvent::ToolResult {
                    tool: call.name.clone(),
                    ok: result.is_ok(),
                    preview: preview(&output, RESULT_PREVIEW_CHARS),
                },
            );
            state
                .conversation
                .push(ConversationItem::output(call.call_id.clone(), output));
        }
    }

    fn hand_off(
        &self,
        state: &mut RunState,
        call: &FunctionCall,
        target: AgentId,
        event_tx: Option<&EventTx>,
    ) {
        let from_name = self.registry.agent_name(state.active_agent);
        let to_name = self.registry.agent_name(target);
        let reason = handoff_reason(&call.arguments);
        tracing::info!(from = %from_name, to = %to_name, reason = ?reason, "handoff");
        send_event(
            event_tx,
            OrchestratorEvent::Handoff {
                from: from_name.to_string(),
                to: to_name.to_string(),
                reason,
            },
        );
        state.conversation.push(ConversationItem::output(
            call.call_id.clone(),
            json!({ "ok": true }).to_string(),
        ));
        state.active_agent = target;
    }

    fn finish(&self, state: RunState, answer: String, status: RunStatus) -> RunOutcome {
        RunOutcome {
            answer,
            status,
            active_agent: self.registry.agent_name(state.active_agent).to_string(),
            turns_used: state.turns_used,
            conversation: state.conversation,
        }
    }
}

/// 交接参数中的 reason（解析失败时为 None，不影响交接）
fn handoff_reason(arguments: &str) -> Option<String> {
    serde_json::from_str::<Value>(arguments)
        .ok()?
        .get("reason")?
        .as_str()
        .map(String::from)
}
