//! 构建器：按配置选择 LLM 后端并装配编排器
//!
//! 接入方式（CLI、测试、嵌入调用方）共享同一套初始化逻辑。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AgentRoster, BuildError, MultiAgent};
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
use crate::tools::ToolExecutor;

/// DeepSeek 的 OpenAI 兼容端点
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
/// provider = deepseek 且未显式配置模型时使用
pub const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";

/// 根据配置创建 LLM 客户端：
/// - provider = openai 且有 OPENAI_API_KEY -> OpenAI（base_url 可覆盖）；
/// - provider = deepseek 且有 DEEPSEEK_API_KEY -> DeepSeek 兼容端点；
/// - 其余情况（含 provider = mock）-> 离线 Mock。
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let request_timeout = cfg.llm.timeouts.request;

    match provider.as_str() {
        "openai" => {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
                return Arc::new(
                    OpenAiClient::new(cfg.llm.base_url.as_deref(), &cfg.llm.model, Some(&key))
                        .with_request_timeout(request_timeout),
                );
            }
        }
        "deepseek" => {
            if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
                let model = deepseek_model(&cfg.llm.model);
                let base = cfg.llm.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);
                tracing::info!("Using DeepSeek LLM ({})", model);
                return Arc::new(
                    OpenAiClient::new(Some(base), model, Some(&key))
                        .with_request_timeout(request_timeout),
                );
            }
        }
        "mock" => {
            tracing::info!("Using Mock LLM");
            return Arc::new(MockLlmClient);
        }
        other => tracing::warn!(provider = %other, "unknown LLM provider"),
    }

    tracing::warn!("No API key set or provider unknown, using Mock LLM");
    Arc::new(MockLlmClient)
}

/// 配置里的模型是 OpenAI 默认值时换成 DeepSeek 的默认模型
fn deepseek_model(configured: &str) -> &str {
    if configured.starts_with("deepseek") {
        configured
    } else {
        DEEPSEEK_DEFAULT_MODEL
    }
}

/// 用配置（起始智能体、工具超时、LLM 后端）装配编排器
pub fn create_multi_agent(cfg: &AppConfig, roster: &AgentRoster) -> Result<MultiAgent, BuildError> {
    let llm = create_llm_from_config(cfg);
    build_with_llm(cfg, roster, llm)
}

/// 同 create_multi_agent，但由调用方指定 LLM（测试中注入脚本客户端）
pub fn build_with_llm(
    cfg: &AppConfig,
    roster: &AgentRoster,
    llm: Arc<dyn LlmClient>,
) -> Result<MultiAgent, BuildError> {
    let orchestrator = MultiAgent::new(roster, &cfg.orchestrator.supervisor, llm)?
        .with_executor(ToolExecutor::new(cfg.tools.tool_timeout_secs));
    tracing::info!(
        agents = roster.len(),
        supervisor = %cfg.orchestrator.supervisor,
        tool_timeout_secs = cfg.tools.tool_timeout_secs,
        "multi-agent orchestrator ready"
    );
    Ok(orchestrator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Agent;
    use crate::llm::{ModelResponse, ScriptedLlmClient};

    #[test]
    fn test_deepseek_model_preset() {
        assert_eq!(deepseek_model("gpt-5.2"), "deepseek-chat");
        assert_eq!(deepseek_model("deepseek-reasoner"), "deepseek-reasoner");
    }

    #[test]
    fn test_build_uses_configured_supervisor_and_timeout() {
        let mut cfg = AppConfig::default();
        cfg.orchestrator.supervisor = "router".to_string();
        cfg.tools.tool_timeout_secs = 7;
        let roster = AgentRoster::new()
            .with("router", Agent::new("Route.").with_handoff("sales"))
            .with("sales", Agent::new("Sales."));
        let llm = Arc::new(ScriptedLlmClient::repeating(ModelResponse::FinalAnswer(
            "ok".into(),
        )));
        let orchestrator = build_with_llm(&cfg, &roster, llm).unwrap();
        let registry = orchestrator.registry();
        assert_eq!(registry.agent_name(registry.supervisor()), "router");
    }

    #[test]
    fn test_build_rejects_missing_supervisor() {
        let cfg = AppConfig::default();
        let roster = AgentRoster::new().with("sales", Agent::new("Sales."));
        let llm = Arc::new(ScriptedLlmClient::default());
        let err = build_with_llm(&cfg, &roster, llm).unwrap_err();
        assert_eq!(err, BuildError::UnknownSupervisor("supervisor".to_string()));
    }
}
