//! 工具执行器
//!
//! execute(registry, tool_name, arguments)：按名查找工具、解码参数字符串、在超时内调用，
//! 失败统一转为 ToolError（UnknownTool / ArgumentDecode / Execution）；每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};
use tokio::time::timeout;

use crate::core::ToolError;
use crate::tools::ToolRegistry;

/// 审计日志中参数预览的最大字符数
const ARGS_PREVIEW_CHARS: usize = 200;

/// 工具执行器：对每次调用施加超时，并将结果映射为 ToolError
///
/// 超时只能在 await 点打断调用；同步闭包工具（`tool()`）在 blocking 线程池中运行，
/// 超时后执行器立即返回错误，闭包本身会继续跑完。
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 执行指定工具；arguments 为模型给出的 JSON 字符串（空串视为 `{}`）
    pub async fn execute(
        &self,
        registry: &ToolRegistry,
        tool_name: &str,
        arguments: &str,
    ) -> Result<Value, ToolError> {
        let start = Instant::now();
        let result = self.dispatch(registry, tool_name, arguments).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(ToolError::UnknownTool(_)) => "unknown_tool",
            Err(ToolError::ArgumentDecode { .. }) => "bad_arguments",
            Err(ToolError::Execution { .. }) => "error",
        };
        let audit = json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": preview(arguments, ARGS_PREVIEW_CHARS),
        });
        tracing::info!(audit = %audit, "tool");

        result
    }

    async fn dispatch(
        &self,
        registry: &ToolRegistry,
        tool_name: &str,
        arguments: &str,
    ) -> Result<Value, ToolError> {
        let tool = registry
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;
        let args = decode_arguments(tool_name, arguments)?;
        let output = timeout(self.timeout, tool.call(args))
            .await
            .map_err(|_| ToolError::Execution {
                tool: tool_name.to_string(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })??;
        Ok(wrap_scalar(output))
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new(30)
    }
}

/// 解码模型给出的参数字符串；必须是 JSON 对象
pub fn decode_arguments(tool_name: &str, arguments: &str) -> Result<Value, ToolError> {
    if arguments.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_json::from_str(arguments).map_err(|e| ToolError::ArgumentDecode {
        tool: tool_name.to_string(),
        reason: e.to_string(),
    })?;
    if !value.is_object() {
        return Err(ToolError::ArgumentDecode {
            tool: tool_name.to_string(),
            reason: "arguments must be a JSON object".to_string(),
        });
    }
    Ok(value)
}

/// 非对象/数组的结果包装为 `{"result": ...}`
fn wrap_scalar(output: Value) -> Value {
    if output.is_object() || output.is_array() {
        output
    } else {
        json!({ "result": output })
    }
}

/// 回写给模型的 tool-result 内容：成功为结果 JSON，失败为 `{"error": "..."}`
pub fn tool_output(result: &Result<Value, ToolError>) -> String {
    match result {
        Ok(value) => value.to_string(),
        Err(e) => json!({ "error": e.to_string() }).to_string(),
    }
}

/// 按字符截断（多字节安全）
pub(crate) fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde::Deserialize;

    use crate::tools::{tool, Tool, ToolSchema};

    #[derive(Deserialize, schemars::JsonSchema)]
    struct QueryArgs {
        query: String,
    }

    struct SlowTool {
        schema: ToolSchema,
    }

    #[async_trait]
    impl Tool for SlowTool {
        fn schema(&self) -> &ToolSchema {
            &self.schema
        }

        async fn call(&self, _args: Value) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!({}))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(tool("lookup", "Lookup.", |args: QueryArgs| {
            Ok::<_, String>(json!({ "query": args.query }))
        }));
        registry.register(tool("count", "Count.", |args: QueryArgs| {
            Ok::<_, String>(args.query.len())
        }));
        registry.register(tool("fail", "Always fails.", |_: QueryArgs| {
            Err::<Value, _>("backend unavailable")
        }));
        registry.register(Arc::new(SlowTool {
            schema: ToolSchema::builder("slow", "Sleeps.").build(),
        }));
        registry
    }

    #[tokio::test]
    async fn test_execute_ok() {
        let out = ToolExecutor::default()
            .execute(&registry(), "lookup", r#"{"query": "north"}"#)
            .await
            .unwrap();
        assert_eq!(out, json!({"query": "north"}));
    }

    #[tokio::test]
    async fn test_scalar_result_is_wrapped() {
        let out = ToolExecutor::default()
            .execute(&registry(), "count", r#"{"query": "abc"}"#)
            .await
            .unwrap();
        assert_eq!(out, json!({"result": 3}));
    }

    #[tokio::test]
    async fn test_blocking_closure_times_out() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("sleepy", "Blocks the calling thread.", |_: QueryArgs| {
            std::thread::sleep(Duration::from_secs(2));
            Ok::<_, String>(json!({}))
        }));
        let start = Instant::now();
        let err = ToolExecutor::new(1)
            .execute(&registry, "sleepy", r#"{"query": "x"}"#)
            .await
            .unwrap_err();
        assert!(start.elapsed() < Duration::from_millis(1900));
        assert_eq!(
            err,
            ToolError::Execution {
                tool: "sleepy".to_string(),
                reason: "timed out after 1s".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let result = ToolExecutor::default()
            .execute(&registry(), "nope", "{}")
            .await;
        assert_eq!(result, Err(ToolError::UnknownTool("nope".to_string())));
        assert_eq!(tool_output(&result), r#"{"error":"Unknown tool: nope"}"#);
    }

    #[tokio::test]
    async fn test_invalid_json_arguments() {
        let err = ToolExecutor::default()
            .execute(&registry(), "lookup", "{not json")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ArgumentDecode { .. }));
    }

    #[tokio::test]
    async fn test_tool_failure_is_captured() {
        let result = ToolExecutor::default()
            .execute(&registry(), "fail", r#"{"query": "x"}"#)
            .await;
        let output: Value = serde_json::from_str(&tool_output(&result)).unwrap();
        assert_eq!(output["error"], "Tool fail failed: backend unavailable");
    }

    #[tokio::test]
    async fn test_timeout_is_execution_error() {
        let err = ToolExecutor::new(0)
            .execute(&registry(), "slow", "")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution { ref reason, .. } if reason.contains("timed out")));
    }

    #[test]
    fn test_decode_arguments() {
        assert_eq!(decode_arguments("t", "").unwrap(), json!({}));
        assert_eq!(decode_arguments("t", "  ").unwrap(), json!({}));
        assert!(decode_arguments("t", "[1, 2]").is_err());
        assert!(decode_arguments("t", "42").is_err());
        assert_eq!(decode_arguments("t", r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_preview_truncates_by_chars() {
        assert_eq!(preview("abc", 5), "abc");
        assert_eq!(preview("你好世界", 2), "你好...");
    }
}
