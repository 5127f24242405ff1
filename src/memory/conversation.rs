//! 对话历史：单次 run 内只追加、不剪枝
//!
//! 条目形状与模型端一致：用户消息、助手文本、函数调用、函数调用结果（按 call_id 对应）。

use serde::{Deserialize, Serialize};

/// 模型发出的一次函数调用
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub call_id: String,
    pub name: String,
    /// JSON 编码的参数字符串（原样保留，执行时再解码）
    pub arguments: String,
}

impl FunctionCall {
    pub fn new(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// 单条对话条目
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    User { content: String },
    Assistant { content: String },
    FunctionCall(FunctionCall),
    FunctionCallOutput { call_id: String, output: String },
}

impl ConversationItem {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
        }
    }

    pub fn output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::FunctionCallOutput {
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

/// 追加式对话历史；每轮完整传给模型
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    items: Vec<ConversationItem>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(content: impl Into<String>) -> Self {
        Self {
            items: vec![ConversationItem::user(content)],
        }
    }

    pub fn push(&mut self, item: ConversationItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[ConversationItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationItem> {
        self.items.last()
    }

    /// 所有函数调用（按出现顺序）
    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.items.iter().filter_map(|item| match item {
            ConversationItem::FunctionCall(call) => Some(call),
            _ => None,
        })
    }

    /// 某次调用的结果；未回写（如交接后被丢弃的调用）时为 None
    pub fn output_for(&self, call_id: &str) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            ConversationItem::FunctionCallOutput { call_id: id, output } if id == call_id => {
                Some(output.as_str())
            }
            _ => None,
        })
    }

    pub fn into_items(self) -> Vec<ConversationItem> {
        self.items
    }
}

impl Extend<ConversationItem> for Conversation {
    fn extend<T: IntoIterator<Item = ConversationItem>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_for_and_calls() {
        let mut conv = Conversation::with_user("hi");
        conv.extend([
            ConversationItem::FunctionCall(FunctionCall::new("c1", "search_policies", "{}")),
            ConversationItem::FunctionCall(FunctionCall::new("c2", "query_sales", "{}")),
            ConversationItem::output("c1", r#"{"ok":true}"#),
        ]);
        assert_eq!(conv.len(), 4);
        assert_eq!(conv.function_calls().count(), 2);
        assert_eq!(conv.output_for("c1"), Some(r#"{"ok":true}"#));
        assert_eq!(conv.output_for("c2"), None);
    }

    #[test]
    fn test_item_serialization_is_tagged() {
        let item = ConversationItem::output("c1", "{}");
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["type"], "function_call_output");
        assert_eq!(v["call_id"], "c1");

        let call = ConversationItem::FunctionCall(FunctionCall::new("c9", "t", "{}"));
        let v = serde_json::to_value(&call).unwrap();
        assert_eq!(v["type"], "function_call");
        assert_eq!(v["name"], "t");
    }
}
