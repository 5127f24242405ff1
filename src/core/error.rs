//! 编排错误类型
//!
//! 按处理策略分三类：
//! - 装配期（BuildError）：注册表构建时即失败，run 之前暴露；
//! - 单轮工具错误（ToolError）：写回对话交给模型处理，run 继续；
//! - 模型调用错误（RunError::ModelInvocation）：直接返回调用方，不在内部重试。

use thiserror::Error;

use crate::llm::LlmError;

/// 参数类型无法映射到 string / integer / number / boolean 时产生；调用方记录后按 string 处理
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("parameter '{param}' has unsupported type '{found}', falling back to string")]
    UnsupportedType { param: String, found: String },

    #[error("argument type of tool '{tool}' is not an object schema")]
    NotAnObject { tool: String },
}

/// 注册表构建错误（均为致命错误）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("tool '{name}' is registered by both '{first}' and '{second}' with different callables")]
    DuplicateToolName {
        name: String,
        first: String,
        second: String,
    },

    #[error("agent '{agent}' hands off to unknown agent '{target}'")]
    UnknownAgentReference { agent: String, target: String },

    #[error("supervisor agent '{0}' is not defined")]
    UnknownSupervisor(String),
}

/// 工具执行错误：可恢复，以 `{"error": ...}` 形式回写给模型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    ArgumentDecode { tool: String, reason: String },

    #[error("Tool {tool} failed: {reason}")]
    Execution { tool: String, reason: String },
}

/// run 级错误：只有模型调用失败会中止一次 run
#[derive(Error, Debug)]
pub enum RunError {
    #[error("model invocation failed for agent '{agent}': {source}")]
    ModelInvocation {
        agent: String,
        #[source]
        source: LlmError,
    },
}
