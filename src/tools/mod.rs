//! 工具层：Schema、Tool trait、类型化函数工具、注册表与执行器

pub mod executor;
pub mod function;
pub mod registry;
pub mod schema;

pub use executor::{decode_arguments, tool_output, ToolExecutor};
pub use function::{tool, FunctionTool};
pub use registry::{same_callable, Tool, ToolRegistry};
pub use schema::{
    handoff_tool_name, ParamType, Parameter, ToolSchema, ToolSchemaBuilder, HANDOFF_PREFIX,
};
