//! 编排注册表：由 AgentRoster 一次性构建，之后只读、跨 run 共享
//!
//! 构建内容：
//! - 全局工具表（工具名 -> 工具实例）；
//! - 每个智能体的工具 Schema 列表（工作工具在前，`transfer_to_<target>` 交接工具在后，均按声明顺序）；
//! - 交接表（交接工具名 -> 目标智能体）。
//!
//! 重名策略：同一个工具实例被多个智能体引用是允许的；不同实例同名则构建失败。

use std::collections::{BTreeMap, HashMap};

use crate::core::{AgentRoster, BuildError};
use crate::tools::{same_callable, ToolRegistry, ToolSchema};

/// 注册表内的智能体句柄（下标）；只由 Registry 产生
///
/// 句柄只对签发它的那个 Registry 有效：拿到别的注册表上查询会越界 panic。
/// 需要跨注册表传递时请用智能体名称，再经 `agent_id` 换取句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(usize);

#[derive(Debug, Clone)]
struct AgentEntry {
    name: String,
    instructions: String,
    tools: Vec<ToolSchema>,
}

/// 只读注册表
#[derive(Debug, Clone)]
pub struct Registry {
    agents: Vec<AgentEntry>,
    index: HashMap<String, AgentId>,
    handoffs: HashMap<String, AgentId>,
    tools: ToolRegistry,
    supervisor: AgentId,
}

impl Registry {
    /// 从名册构建；`supervisor` 为每次 run 的起始智能体
    pub fn build(roster: &AgentRoster, supervisor: &str) -> Result<Self, BuildError> {
        let index: HashMap<String, AgentId> = roster
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.to_string(), AgentId(i)))
            .collect();
        let supervisor_id = index
            .get(supervisor)
            .copied()
            .ok_or_else(|| BuildError::UnknownSupervisor(supervisor.to_string()))?;

        let mut tools = ToolRegistry::new();
        let mut owners: HashMap<String, String> = HashMap::new();
        let mut handoffs: HashMap<String, AgentId> = HashMap::new();
        let mut handoff_owners: Vec<(String, String)> = Vec::new();
        let mut agents = Vec::with_capacity(roster.len());

        for (name, agent) in roster.iter() {
            let mut schemas = Vec::with_capacity(agent.tools().len() + agent.handoffs().len());

            for tool in agent.tools() {
                let tool_name = tool.name();
                match tools.get(tool_name) {
                    Some(existing) if !same_callable(&existing, tool) => {
                        return Err(BuildError::DuplicateToolName {
                            name: tool_name.to_string(),
                            first: owners.get(tool_name).cloned().unwrap_or_default(),
                            second: name.to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        tools.register(tool.clone());
                        owners.insert(tool_name.to_string(), name.to_string());
                    }
                }
                schemas.push(tool.schema().clone());
            }

            for target in agent.handoffs() {
                let target_id = index.get(target.as_str()).copied().ok_or_else(|| {
                    BuildError::UnknownAgentReference {
                        agent: name.to_string(),
                        target: target.clone(),
                    }
                })?;
                let target_instructions = roster
                    .get(target)
                    .map(|a| a.instructions())
                    .unwrap_or_default();
                let schema = ToolSchema::handoff(target, target_instructions);
                handoffs.insert(schema.name.clone(), target_id);
                handoff_owners.push((schema.name.clone(), name.to_string()));
                schemas.push(schema);
            }

            tracing::debug!(agent = %name, tools = schemas.len(), "agent registered");
            agents.push(AgentEntry {
                name: name.to_string(),
                instructions: agent.instructions().to_string(),
                tools: schemas,
            });
        }

        // 工作工具不得与交接工具同名
        for (handoff_name, declared_by) in handoff_owners {
            if tools.contains(&handoff_name) {
                return Err(BuildError::DuplicateToolName {
                    first: owners.get(&handoff_name).cloned().unwrap_or_default(),
                    name: handoff_name,
                    second: declared_by,
                });
            }
        }

        tracing::info!(
            agents = agents.len(),
            tools = tools.len(),
            handoffs = handoffs.len(),
            supervisor = %supervisor,
            "registry built"
        );

        Ok(Self {
            agents,
            index,
            handoffs,
            tools,
            supervisor: supervisor_id,
        })
    }

    pub fn supervisor(&self) -> AgentId {
        self.supervisor
    }

    /// 按名称取句柄；这是在注册表之外获得 AgentId 的唯一方式
    pub fn agent_id(&self, name: &str) -> Option<AgentId> {
        self.index.get(name).copied()
    }

    pub fn agent_name(&self, id: AgentId) -> &str {
        &self.agents[id.0].name
    }

    pub fn instructions(&self, id: AgentId) -> &str {
        &self.agents[id.0].instructions
    }

    /// 该智能体可见的工具 Schema（工作工具 + 交接工具）
    pub fn tool_schemas(&self, id: AgentId) -> &[ToolSchema] {
        &self.agents[id.0].tools
    }

    pub fn tools_for(&self, agent: &str) -> Option<&[ToolSchema]> {
        self.agent_id(agent).map(|id| self.tool_schemas(id))
    }

    /// 交接工具对应的目标智能体
    pub fn handoff_id(&self, tool_name: &str) -> Option<AgentId> {
        self.handoffs.get(tool_name).copied()
    }

    pub fn handoff_target(&self, tool_name: &str) -> Option<&str> {
        self.handoff_id(tool_name).map(|id| self.agent_name(id))
    }

    /// 交接表快照（有序，便于比较）
    pub fn handoff_map(&self) -> BTreeMap<String, String> {
        self.handoffs
            .iter()
            .map(|(tool, id)| (tool.clone(), self.agent_name(*id).to_string()))
            .collect()
    }

    /// 全局工作工具表
    pub fn callables(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde::Deserialize;

    use crate::core::Agent;
    use crate::tools::{tool, Tool};

    #[derive(Deserialize, schemars::JsonSchema)]
    struct QueryArgs {
        query: String,
    }

    fn search() -> Arc<dyn Tool> {
        tool("search_policies", "Search company policies by keyword.", |a: QueryArgs| {
            Ok::<_, String>(a.query)
        })
    }

    fn roster_with(search: Arc<dyn Tool>) -> AgentRoster {
        AgentRoster::new()
            .with(
                "supervisor",
                Agent::new("You route requests.").with_handoffs(["sales", "policy"]),
            )
            .with("sales", Agent::new("You answer sales questions."))
            .with(
                "policy",
                Agent::new("You answer policy questions.").with_tool(search),
            )
    }

    fn names(schemas: &[ToolSchema]) -> Vec<&str> {
        schemas.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_build_tool_lists_and_handoffs() {
        let registry = Registry::build(&roster_with(search()), "supervisor").unwrap();
        assert_eq!(registry.agent_name(registry.supervisor()), "supervisor");
        assert_eq!(
            names(registry.tools_for("supervisor").unwrap()),
            vec!["transfer_to_sales", "transfer_to_policy"]
        );
        assert_eq!(
            names(registry.tools_for("policy").unwrap()),
            vec!["search_policies"]
        );
        assert!(registry.tools_for("sales").unwrap().is_empty());
        assert_eq!(registry.handoff_target("transfer_to_policy"), Some("policy"));
        assert_eq!(registry.handoff_target("search_policies"), None);
        assert!(registry.callables().contains("search_policies"));
    }

    #[test]
    fn test_handoff_schemas_have_single_reason() {
        let registry = Registry::build(&roster_with(search()), "supervisor").unwrap();
        let schemas = registry.tools_for("supervisor").unwrap();
        for target in ["sales", "policy"] {
            let matching: Vec<&ToolSchema> = schemas
                .iter()
                .filter(|s| s.name == format!("transfer_to_{target}"))
                .collect();
            assert_eq!(matching.len(), 1);
            assert_eq!(matching[0].parameters.len(), 1);
            assert_eq!(matching[0].required, vec!["reason"]);
        }
    }

    #[test]
    fn test_build_is_idempotent() {
        let roster = roster_with(search());
        let a = Registry::build(&roster, "supervisor").unwrap();
        let b = Registry::build(&roster, "supervisor").unwrap();
        for name in roster.names() {
            assert_eq!(a.tools_for(name), b.tools_for(name));
        }
        assert_eq!(a.handoff_map(), b.handoff_map());
    }

    #[test]
    fn test_agent_ids_resolve_by_name_across_builds() {
        let roster = roster_with(search());
        let a = Registry::build(&roster, "supervisor").unwrap();
        let b = Registry::build(&roster, "policy").unwrap();
        for name in a.agent_names() {
            let id = a.agent_id(name).unwrap();
            assert_eq!(a.agent_name(id), name);
            let other = b.agent_id(name).unwrap();
            assert_eq!(b.instructions(other), a.instructions(id));
        }
        assert_eq!(a.agent_id("payroll"), None);
        assert_eq!(b.agent_name(b.supervisor()), "policy");
    }

    #[test]
    fn test_unknown_supervisor() {
        let err = Registry::build(&roster_with(search()), "root").unwrap_err();
        assert_eq!(err, BuildError::UnknownSupervisor("root".to_string()));
    }

    #[test]
    fn test_unknown_handoff_target() {
        let roster = roster_with(search())
            .with("leave", Agent::new("Leave.").with_handoff("payroll"));
        let err = Registry::build(&roster, "supervisor").unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownAgentReference {
                agent: "leave".to_string(),
                target: "payroll".to_string(),
            }
        );
    }

    #[test]
    fn test_shared_tool_instance_is_allowed() {
        let shared = search();
        let roster = roster_with(shared.clone())
            .with("helpdesk", Agent::new("Helpdesk.").with_tool(shared));
        let registry = Registry::build(&roster, "supervisor").unwrap();
        assert_eq!(registry.callables().len(), 1);
        assert_eq!(
            names(registry.tools_for("helpdesk").unwrap()),
            vec!["search_policies"]
        );
    }

    #[test]
    fn test_duplicate_tool_name_rejected() {
        let roster = roster_with(search())
            .with("helpdesk", Agent::new("Helpdesk.").with_tool(search()));
        let err = Registry::build(&roster, "supervisor").unwrap_err();
        assert_eq!(
            err,
            BuildError::DuplicateToolName {
                name: "search_policies".to_string(),
                first: "policy".to_string(),
                second: "helpdesk".to_string(),
            }
        );
    }

    #[test]
    fn test_work_tool_shadowing_handoff_rejected() {
        let shadow = tool("transfer_to_sales", "Not a handoff.", |a: QueryArgs| {
            Ok::<_, String>(a.query)
        });
        let roster = roster_with(search()).with("sales", Agent::new("Sales.").with_tool(shadow));
        let err = Registry::build(&roster, "supervisor").unwrap_err();
        assert!(matches!(err, BuildError::DuplicateToolName { ref name, .. } if name == "transfer_to_sales"));
    }
}
