//! 编排过程事件：供调用方（CLI / 测试 / 前端）旁路观察每轮思考、工具调用、交接与结束

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// 新一轮模型调用开始
    Turn {
        turn: usize,
        max_turns: usize,
        agent: String,
    },
    /// 模型请求调用工作工具
    ToolCall {
        agent: String,
        tool: String,
        arguments: String,
    },
    /// 工具返回（预览，避免过长）
    ToolResult {
        tool: String,
        ok: bool,
        preview: String,
    },
    /// 控制权交接
    Handoff {
        from: String,
        to: String,
        reason: Option<String>,
    },
    FinalAnswer { agent: String, text: String },
    /// 轮数用尽仍无最终回答
    Exhausted { max_turns: usize },
}
