//! 单次 run 的状态与结果
//!
//! RunState 在 run 开始时创建、结束时转为 RunOutcome，不跨 run 保留。

use serde::Serialize;

use crate::core::AgentId;
use crate::memory::Conversation;

/// run 进行中的可变状态
#[derive(Debug, Clone)]
pub struct RunState {
    pub conversation: Conversation,
    pub active_agent: AgentId,
    pub turns_used: usize,
}

impl RunState {
    pub fn new(query: &str, supervisor: AgentId) -> Self {
        Self {
            conversation: Conversation::with_user(query),
            active_agent: supervisor,
            turns_used: 0,
        }
    }
}

/// 终止方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// 模型给出了文本回答
    Done,
    /// 轮数用尽（软失败，answer 为占位文本）
    Exhausted,
}

/// run 结果
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub answer: String,
    pub status: RunStatus,
    pub active_agent: String,
    pub turns_used: usize,
    pub conversation: Conversation,
}

impl RunOutcome {
    pub fn is_done(&self) -> bool {
        self.status == RunStatus::Done
    }

    pub fn is_exhausted(&self) -> bool {
        self.status == RunStatus::Exhausted
    }
}
