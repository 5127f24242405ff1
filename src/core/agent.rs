//! 智能体定义与名册
//!
//! Agent 在装配期创建后不再修改：指令、工作工具、可交接的目标名。
//! AgentRoster 保持插入顺序，决定注册表构建与工具注册的顺序。

use std::fmt;
use std::sync::Arc;

use crate::tools::Tool;

/// 智能体：指令 + 工作工具 + 交接目标
#[derive(Clone, Default)]
pub struct Agent {
    instructions: String,
    tools: Vec<Arc<dyn Tool>>,
    handoffs: Vec<String>,
}

impl Agent {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            ..Self::default()
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn with_handoff(mut self, target: impl Into<String>) -> Self {
        self.handoffs.push(target.into());
        self
    }

    pub fn with_handoffs<S: Into<String>>(mut self, targets: impl IntoIterator<Item = S>) -> Self {
        self.handoffs.extend(targets.into_iter().map(Into::into));
        self
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn handoffs(&self) -> &[String] {
        &self.handoffs
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tools: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
        f.debug_struct("Agent")
            .field("instructions", &self.instructions)
            .field("tools", &tools)
            .field("handoffs", &self.handoffs)
            .finish()
    }
}

/// 名称 -> Agent，保持插入顺序；同名再次插入时原位替换
#[derive(Clone, Debug, Default)]
pub struct AgentRoster {
    entries: Vec<(String, Agent)>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, agent: Agent) -> Self {
        self.insert(name, agent);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, agent: Agent) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = agent,
            None => self.entries.push((name, agent)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Agent> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, agent)| agent)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Agent)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Agent)> for AgentRoster {
    fn from_iter<T: IntoIterator<Item = (S, Agent)>>(iter: T) -> Self {
        let mut roster = AgentRoster::new();
        for (name, agent) in iter {
            roster.insert(name, agent);
        }
        roster
    }
}
