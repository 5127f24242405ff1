//! 工具 Schema：名称、描述、参数类型与必填项
//!
//! 两种构造方式：
//! - `ToolSchema::builder` 显式声明参数；
//! - `ToolSchema::infer::<Args>` 从参数结构体的 schemars Schema 推导
//!   （`Option<_>` 或 `#[serde(default)]` 字段为可选，其余必填）。
//!
//! Schema 在注册时构建一次，之后只读。

use schemars::schema::{InstanceType, Schema, SingleOrVec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::core::SchemaError;

/// 交接工具名前缀
pub const HANDOFF_PREFIX: &str = "transfer_to_";
/// 交接工具描述中截取目标指令的最大字符数
const HANDOFF_INSTRUCTIONS_CHARS: usize = 100;

/// 参数基础类型；未声明时为 String
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }

    fn from_instance(param: &str, instance: &InstanceType) -> Result<Self, SchemaError> {
        match instance {
            InstanceType::String => Ok(ParamType::String),
            InstanceType::Integer => Ok(ParamType::Integer),
            InstanceType::Number => Ok(ParamType::Number),
            InstanceType::Boolean => Ok(ParamType::Boolean),
            other => Err(SchemaError::UnsupportedType {
                param: param.to_string(),
                found: format!("{other:?}").to_lowercase(),
            }),
        }
    }

    /// 从单个属性的 Schema 推导类型；可空类型（如 `Option<String>`）取非 null 的那一项
    fn from_schema(param: &str, schema: &Schema) -> Result<Self, SchemaError> {
        let unsupported = |found: &str| SchemaError::UnsupportedType {
            param: param.to_string(),
            found: found.to_string(),
        };
        let Schema::Object(object) = schema else {
            return Err(unsupported("any"));
        };
        match &object.instance_type {
            Some(SingleOrVec::Single(instance)) => Self::from_instance(param, instance),
            Some(SingleOrVec::Vec(instances)) => {
                let mut concrete = instances.iter().filter(|t| **t != InstanceType::Null);
                match (concrete.next(), concrete.next()) {
                    (Some(instance), None) => Self::from_instance(param, instance),
                    _ => Err(unsupported("union")),
                }
            }
            None if object.reference.is_some() => Err(unsupported("reference")),
            None => Err(unsupported("composite")),
        }
    }
}

/// 单个参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 工具 Schema。不变式：`required` 中的名字都在 `parameters` 中，且按参数声明顺序排列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
    pub required: Vec<String>,
}

impl ToolSchema {
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> ToolSchemaBuilder {
        ToolSchemaBuilder {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            required: Vec::new(),
        }
    }

    /// 从参数结构体推导 Schema。无法识别的字段类型记 warn 并按 string 处理，不会失败
    pub fn infer<A: JsonSchema>(name: impl Into<String>, description: impl Into<String>) -> Self {
        let mut builder = Self::builder(name, description);
        let root = schemars::schema_for!(A);
        let Some(object) = root.schema.object.as_ref() else {
            let err = SchemaError::NotAnObject {
                tool: builder.name.clone(),
            };
            tracing::warn!("{}", err);
            return builder.build();
        };

        for (param, schema) in &object.properties {
            let kind = ParamType::from_schema(param, schema).unwrap_or_else(|err| {
                tracing::warn!(tool = %builder.name, "{}", err);
                ParamType::String
            });
            let description = match schema {
                Schema::Object(o) => o.metadata.as_ref().and_then(|m| m.description.clone()),
                Schema::Bool(_) => None,
            };
            builder.push(param, kind, description, object.required.contains(param));
        }
        builder.build()
    }

    /// 交接工具：`transfer_to_<target>`，唯一必填参数 `reason`
    pub fn handoff(target: &str, target_instructions: &str) -> Self {
        let preview: String = target_instructions
            .chars()
            .take(HANDOFF_INSTRUCTIONS_CHARS)
            .collect();
        Self::builder(
            handoff_tool_name(target),
            format!("Transfer to {target} agent. {preview}"),
        )
        .param("reason", ParamType::String)
        .describe("Why transfer")
        .build()
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// 参数的 JSON Schema（object 形式，禁止额外字段）
    pub fn parameters_json(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.parameters {
            let mut prop = json!({ "type": p.kind.as_str() });
            if let Some(desc) = &p.description {
                prop["description"] = Value::String(desc.clone());
            }
            properties.insert(p.name.clone(), prop);
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
            "additionalProperties": false,
        })
    }

    /// 完整的 function 工具描述
    pub fn to_function_json(&self) -> Value {
        json!({
            "type": "function",
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters_json(),
        })
    }
}

/// 交接工具名：`transfer_to_<agent>`
pub fn handoff_tool_name(target: &str) -> String {
    format!("{HANDOFF_PREFIX}{target}")
}

/// 显式声明参数；`param` 为必填，`optional` 为可选，`describe` 作用于最近添加的参数
#[derive(Debug, Clone)]
pub struct ToolSchemaBuilder {
    name: String,
    description: String,
    parameters: Vec<Parameter>,
    required: Vec<String>,
}

impl ToolSchemaBuilder {
    pub fn param(mut self, name: impl Into<String>, kind: ParamType) -> Self {
        self.push(&name.into(), kind, None, true);
        self
    }

    pub fn optional(mut self, name: impl Into<String>, kind: ParamType) -> Self {
        self.push(&name.into(), kind, None, false);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        if let Some(last) = self.parameters.last_mut() {
            last.description = Some(description.into());
        }
        self
    }

    /// 同名参数覆盖旧定义
    fn push(&mut self, name: &str, kind: ParamType, description: Option<String>, required: bool) {
        self.parameters.retain(|p| p.name != name);
        self.required.retain(|r| r != name);
        self.parameters.push(Parameter {
            name: name.to_string(),
            kind,
            description,
        });
        if required {
            self.required.push(name.to_string());
        }
    }

    pub fn build(self) -> ToolSchema {
        let ToolSchemaBuilder {
            name,
            description,
            parameters,
            required,
        } = self;
        // 必填项按参数声明顺序排列
        let required = parameters
            .iter()
            .filter(|p| required.contains(&p.name))
            .map(|p| p.name.clone())
            .collect();
        ToolSchema {
            name,
            description,
            parameters,
            required,
        }
    }
}
