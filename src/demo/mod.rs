//! 企业知识助手演示：销售查询、制度检索、请假提交
//!
//! 数据为内存中的模拟后端；`enterprise_roster` 给出 supervisor + 三个专职智能体的名册。

use std::sync::{Arc, Mutex};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{Agent, AgentRoster};
use crate::tools::{tool, Tool};

/// 演示用问题（无命令行参数时依次运行）
pub const DEMO_QUERIES: [&str; 3] = [
    "What's our remote work policy?",
    "Show me North region sales",
    "I want to take leave Dec 23-27 for vacation",
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SalesRow {
    pub month: &'static str,
    pub region: &'static str,
    pub revenue: u64,
}

static SALES_DATA: [SalesRow; 6] = [
    SalesRow { month: "2025-10", region: "North", revenue: 120_000 },
    SalesRow { month: "2025-11", region: "North", revenue: 135_000 },
    SalesRow { month: "2025-12", region: "North", revenue: 140_000 },
    SalesRow { month: "2025-10", region: "South", revenue: 95_000 },
    SalesRow { month: "2025-11", region: "South", revenue: 102_000 },
    SalesRow { month: "2025-12", region: "South", revenue: 110_000 },
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Policy {
    pub id: &'static str,
    pub title: &'static str,
    pub text: &'static str,
}

static POLICIES: [Policy; 4] = [
    Policy {
        id: "P001",
        title: "Remote Work",
        text: "Up to 3 days/week with manager approval.",
    },
    Policy {
        id: "P002",
        title: "Annual Leave",
        text: "15 days/year. Request 5 days in advance.",
    },
    Policy {
        id: "P003",
        title: "Expenses",
        text: "Under $500: manager approval. Over: finance approval.",
    },
    Policy {
        id: "P004",
        title: "Sick Leave",
        text: "10 days/year. Certificate needed after 2 days.",
    },
];

/// 请假单编号起点：第一张为 LR-1001
const LEAVE_ID_BASE: usize = 1001;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LeaveRequest {
    pub id: String,
    pub start: String,
    pub end: String,
    pub reason: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryArgs {
    pub query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LeaveArgs {
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
}

/// 按区域过滤销售数据（查询中出现 north / south 时）
pub fn query_sales(query: &str) -> Vec<SalesRow> {
    let q = query.to_lowercase();
    SALES_DATA
        .iter()
        .filter(|r| !q.contains("north") || r.region == "North")
        .filter(|r| !q.contains("south") || r.region == "South")
        .cloned()
        .collect()
}

/// 任一查询词出现在标题或正文中即命中（不区分大小写）；无命中时返回全部制度
pub fn search_policies(query: &str) -> Vec<Policy> {
    let q = query.to_lowercase();
    let words: Vec<&str> = q.split_whitespace().collect();
    let matches: Vec<Policy> = POLICIES
        .iter()
        .filter(|p| {
            let haystack = format!("{}{}", p.title, p.text).to_lowercase();
            words.iter().any(|w| haystack.contains(*w))
        })
        .cloned()
        .collect();
    if matches.is_empty() {
        POLICIES.to_vec()
    } else {
        matches
    }
}

/// 请假单存储（进程内）；编号按提交顺序递增
#[derive(Debug, Default)]
pub struct LeaveStore {
    requests: Mutex<Vec<LeaveRequest>>,
}

impl LeaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&self, start: &str, end: &str, reason: &str) -> Result<LeaveRequest, String> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|_| "leave store unavailable".to_string())?;
        let request = LeaveRequest {
            id: format!("LR-{}", LEAVE_ID_BASE + requests.len()),
            start: start.to_string(),
            end: end.to_string(),
            reason: reason.to_string(),
        };
        requests.push(request.clone());
        tracing::info!(id = %request.id, "leave request submitted");
        Ok(request)
    }

    pub fn requests(&self) -> Vec<LeaveRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

pub fn query_sales_tool() -> Arc<dyn Tool> {
    tool(
        "query_sales",
        "Query sales database. Use SQL-like filters in the query.",
        |args: QueryArgs| Ok::<_, String>(json!({ "rows": query_sales(&args.query) })),
    )
}

pub fn search_policies_tool() -> Arc<dyn Tool> {
    tool(
        "search_policies",
        "Search company policies by keyword.",
        |args: QueryArgs| Ok::<_, String>(json!({ "policies": search_policies(&args.query) })),
    )
}

pub fn submit_leave_tool(store: Arc<LeaveStore>) -> Arc<dyn Tool> {
    tool(
        "submit_leave",
        "Submit a leave request.",
        move |args: LeaveArgs| -> Result<Value, String> {
            let request = store.submit(&args.start_date, &args.end_date, &args.reason)?;
            Ok(json!({ "request_id": request.id, "status": "pending_approval" }))
        },
    )
}

/// 企业助手名册：supervisor 只负责交接，三个专职智能体各持一个工具
pub fn enterprise_roster(leave_store: Arc<LeaveStore>) -> AgentRoster {
    AgentRoster::new()
        .with(
            "supervisor",
            Agent::new(
                "You route requests. Transfer to: sales (data/charts), policy (company rules), \
                 leave (time off requests). Always transfer, don't answer directly.",
            )
            .with_handoffs(["sales", "policy", "leave"]),
        )
        .with(
            "sales",
            Agent::new("You answer sales questions. Use query_sales to get data, then summarize.")
                .with_tool(query_sales_tool()),
        )
        .with(
            "policy",
            Agent::new("You answer policy questions. Use search_policies, then cite the policy.")
                .with_tool(search_policies_tool()),
        )
        .with(
            "leave",
            Agent::new("You handle leave requests. Use submit_leave and confirm the request ID.")
                .with_tool(submit_leave_tool(leave_store)),
        )
}
