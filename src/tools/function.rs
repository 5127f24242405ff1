//! 类型化函数工具
//!
//! 把普通闭包包装成 Tool：参数类型 `A` 同时提供 Schema（schemars）与解码（serde），
//! 返回值经 serde 序列化后回写给模型。闭包在 blocking 线程池中执行，执行器的超时对其同样生效。

use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::ToolError;
use crate::tools::{Tool, ToolSchema};

/// 闭包工具：`Fn(A) -> Result<R, E>`，Schema 在构造时从 `A` 推导一次
pub struct FunctionTool<A, F> {
    schema: ToolSchema,
    func: Arc<F>,
    _args: PhantomData<fn(A)>,
}

impl<A, F> FunctionTool<A, F>
where
    A: DeserializeOwned + JsonSchema,
{
    pub fn new<R, E>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(A) -> Result<R, E>,
    {
        Self {
            schema: ToolSchema::infer::<A>(name, description),
            func: Arc::new(func),
            _args: PhantomData,
        }
    }

    /// 使用显式声明的 Schema（不做推导）
    pub fn with_schema<R, E>(schema: ToolSchema, func: F) -> Self
    where
        F: Fn(A) -> Result<R, E>,
    {
        Self {
            schema,
            func: Arc::new(func),
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<A, F, R, E> Tool for FunctionTool<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    R: Serialize + Send + 'static,
    E: Display + Send + 'static,
{
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let args: A = serde_json::from_value(args).map_err(|e| ToolError::ArgumentDecode {
            tool: self.schema.name.clone(),
            reason: e.to_string(),
        })?;
        let func = Arc::clone(&self.func);
        let output = tokio::task::spawn_blocking(move || func(args))
            .await
            .map_err(|e| ToolError::Execution {
                tool: self.schema.name.clone(),
                reason: format!("tool task aborted: {e}"),
            })?
            .map_err(|e| ToolError::Execution {
                tool: self.schema.name.clone(),
                reason: e.to_string(),
            })?;
        serde_json::to_value(output).map_err(|e| ToolError::Execution {
            tool: self.schema.name.clone(),
            reason: format!("result is not serializable: {e}"),
        })
    }
}

/// 便捷构造：返回可直接放入 Agent 的 `Arc<dyn Tool>`
pub fn tool<A, F, R, E>(
    name: impl Into<String>,
    description: impl Into<String>,
    func: F,
) -> Arc<dyn Tool>
where
    A: DeserializeOwned + JsonSchema + Send + 'static,
    F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    R: Serialize + Send + 'static,
    E: Display + Send + 'static,
{
    Arc::new(FunctionTool::new(name, description, func))
}
