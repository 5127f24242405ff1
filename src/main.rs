//! Hive - 多智能体编排演示
//!
//! 入口：初始化日志、加载配置、装配企业助手名册并运行。
//! 带参数时把参数拼成一条问题运行；否则依次运行内置的演示问题。

use std::sync::Arc;

use anyhow::Context;
use hive::config::{load_config, AppConfig};
use hive::core::create_multi_agent;
use hive::demo::{enterprise_roster, LeaveStore, DEMO_QUERIES};

fn separator() -> String {
    "─".repeat(60)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    hive::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let roster = enterprise_roster(Arc::new(LeaveStore::new()));
    let app = create_multi_agent(&cfg, &roster).context("Failed to build agents")?;
    let max_turns = cfg.orchestrator.max_turns;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        let query = args.join(" ");
        let answer = app.run(&query, max_turns).await.context("Run failed")?;
        println!("\n{}\nAnswer:\n{}", separator(), answer);
    } else {
        for query in DEMO_QUERIES {
            let answer = app.run(query, max_turns).await.context("Run failed")?;
            println!("\n{}\nAnswer:\n{}\n", separator(), answer);
        }
    }

    Ok(())
}
