//! 工具注册表
//!
//! 所有工具实现 Tool trait（schema / call），由 ToolRegistry 按名注册与查找，
//! ToolExecutor 在调用时解码参数、加超时并统一转 ToolError。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::ToolError;
use crate::tools::ToolSchema;

/// 工具 trait：Schema（注册时构建一次）与异步执行（args 为已解码的 JSON 对象）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 供模型使用的 Schema
    fn schema(&self) -> &ToolSchema;

    /// 工具名称（function call 中的 name 字段）
    fn name(&self) -> &str {
        &self.schema().name
    }

    /// 执行工具；返回值原样回写给模型
    async fn call(&self, args: Value) -> Result<Value, ToolError>;
}

/// 两个句柄是否指向同一个工具实例
pub fn same_callable(a: &Arc<dyn Tool>, b: &Arc<dyn Tool>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// 工具注册表：按名称存储 Arc<dyn Tool>
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具，返回被同名替换掉的旧工具（重名策略由调用方决定）
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let name = tool.name().to_string();
        self.tools.insert(name, tool)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// 工具名（排序后返回，便于日志与断言）
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}
