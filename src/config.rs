//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__LLM__PROVIDER=deepseek`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub orchestrator: OrchestratorSection,
    pub tools: ToolsSection,
}

/// [llm] 段：后端选择、模型与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock；缺少对应 API Key 时回退到 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI 兼容端点；未设置时用各后端的默认地址
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-5.2".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次模型请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [orchestrator] 段：起始智能体与轮数上限
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSection {
    #[serde(default = "default_supervisor")]
    pub supervisor: String,
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            supervisor: default_supervisor(),
            max_turns: default_max_turns(),
        }
    }
}

fn default_supervisor() -> String {
    "supervisor".to_string()
}

fn default_max_turns() -> usize {
    crate::core::DEFAULT_MAX_TURNS
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.model, "gpt-5.2");
        assert_eq!(cfg.llm.timeouts.request, 60);
        assert_eq!(cfg.orchestrator.supervisor, "supervisor");
        assert_eq!(cfg.orchestrator.max_turns, 10);
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
    }

    #[test]
    fn test_load_explicit_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[llm]\nprovider = \"mock\"\n\n[orchestrator]\nmax_turns = 4\n\n[tools]\ntool_timeout_secs = 5"
        )
        .unwrap();
        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.orchestrator.max_turns, 4);
        assert_eq!(cfg.orchestrator.supervisor, "supervisor");
        assert_eq!(cfg.tools.tool_timeout_secs, 5);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[llm]\nmodel = \"file-model\"").unwrap();

        std::env::set_var("HIVE__LLM__MODEL", "env-model");
        let loaded = load_config(Some(file.path().to_path_buf()));
        std::env::remove_var("HIVE__LLM__MODEL");

        assert_eq!(loaded.unwrap().llm.model, "env-model");
        let reloaded = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(reloaded.llm.model, "file-model");
    }

    #[test]
    fn test_missing_file_is_ignored() {
        let cfg = load_config(Some(PathBuf::from("/nonexistent/hive.toml"))).unwrap();
        assert!(cfg.orchestrator.max_turns > 0);
    }
}
