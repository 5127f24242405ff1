//! Hive - Rust 多智能体编排（Handoff as Tool）
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 智能体名册、注册表、编排主循环、过程事件与错误类型
//! - **demo**: 企业知识助手演示（销售 / 制度 / 请假）
//! - **llm**: 模型客户端抽象与实现（OpenAI 兼容 / Mock / 脚本）
//! - **memory**: 对话历史
//! - **observability**: tracing 初始化
//! - **tools**: 工具 Schema、Tool trait、函数工具、注册表与执行器

pub mod config;
pub mod core;
pub mod demo;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;

pub use crate::core::{Agent, AgentRoster, MultiAgent, RunOutcome};
