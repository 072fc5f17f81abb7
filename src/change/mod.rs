//! Content Patcher 的 Change 条目
//!
//! 以强类型描述 Change 及其 Entries 的各种形态，未知字段原样保留在 `extra` 中：
//!
//! - **walker**: 遍历文本叶子、生成标识符
//! - **visitor**: 叶子访问策略（提取 / 替换）
//! - **entries**: Entries 的源码反编译与编译

mod entries;
mod visitor;
mod walker;

pub use visitor::{Collector, LeafVisitor, SubstituteMode, Substitutor, WalkOptions};

use crate::utils::CpError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Change 动作
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Load,
    EditImage,
    EditData,
    EditMap,
    Include,
    /// 其它动作，原样保留
    Other(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::Load => "Load",
            Action::EditImage => "EditImage",
            Action::EditData => "EditData",
            Action::EditMap => "EditMap",
            Action::Include => "Include",
            Action::Other(name) => name,
        }
    }
}

impl From<String> for Action {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Load" => Action::Load,
            "EditImage" => Action::EditImage,
            "EditData" => Action::EditData,
            "EditMap" => Action::EditMap,
            "Include" => Action::Include,
            _ => Action::Other(name),
        }
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

/// 一个 Change 条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    #[serde(rename = "Action")]
    pub action: Action,
    #[serde(rename = "Target", default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    /// 条件
    #[serde(rename = "When", default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Map<String, Value>>,
    /// Load / Include 的文件引用
    #[serde(rename = "FromFile", default, skip_serializing_if = "Option::is_none")]
    pub from_file: Option<String>,
    #[serde(rename = "Entries", default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Entries>,
    /// 字段编辑表：条目键 → 字段索引 → 值
    #[serde(rename = "Fields", default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IndexMap<String, IndexMap<String, Value>>>,
    /// 其余字段
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// EditData 的 Entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entries {
    /// 条目键 → 值（null 为 None）
    Map(IndexMap<String, Option<EntryValue>>),
    /// 源码文件引用
    File(String),
    /// 多个源码文件引用
    Files(Vec<String>),
}

/// Entries 中单个条目的值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryValue {
    /// 文本（Dialogue、Events 或普通字符串）
    Text(String),
    /// 带 Reactions 的记录（MoveReactions）
    Reactions(ReactionRecord),
    /// 其它结构，不含可翻译文本
    Other(Value),
}

/// MoveReactions 记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRecord {
    #[serde(rename = "Reactions")]
    pub reactions: Vec<Reaction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 单个 Reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(rename = "SpecialResponses", default, skip_serializing_if = "Option::is_none")]
    pub special_responses: Option<IndexMap<String, Option<SpecialResponse>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 特殊回应，`Text` 需要翻译
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialResponse {
    #[serde(rename = "Text", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChangeEntry {
    /// 从通用 JSON 树解析，结构不符时返回 `CpError::InvalidChange`
    pub fn from_value(value: Value) -> Result<Self, CpError> {
        serde_json::from_value(value).map_err(|e| CpError::InvalidChange(e.to_string()))
    }

    /// 转换回通用 JSON 树
    pub fn to_value(&self) -> Result<Value, CpError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// 按 JavaScript 的字符串拼接习惯渲染 JSON 值（用于标识符）
pub(crate) fn js_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(js_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_edit_data() {
        let change = ChangeEntry::from_value(json!({
            "Action": "EditData",
            "Target": "Characters/Dialogue/Abigail",
            "When": { "Language": "en", "Season": "spring" },
            "Entries": {
                "Mon": "Hi#$b#Bye",
                "set-up": null,
                "Move": { "NPCName": "Abigail", "Reactions": [
                    { "ID": "r1", "SpecialResponses": { "BeforeMove": { "Text": "Hey!", "Script": "" } } }
                ] },
                "Numbers": [1, 2, 3]
            },
            "LogName": "abigail"
        }))
        .unwrap();

        assert_eq!(change.action, Action::EditData);
        assert_eq!(change.extra.get("LogName"), Some(&json!("abigail")));

        let Some(Entries::Map(entries)) = &change.entries else {
            panic!("entries should be a map");
        };
        assert!(matches!(entries["Mon"], Some(EntryValue::Text(_))));
        assert!(entries["set-up"].is_none());
        assert!(matches!(entries["Move"], Some(EntryValue::Reactions(_))));
        assert!(matches!(entries["Numbers"], Some(EntryValue::Other(_))));
    }

    #[test]
    fn test_entries_file_forms() {
        let single: ChangeEntry = ChangeEntry::from_value(json!({
            "Action": "EditData", "Target": "Data/Events/Town", "Entries": "1.json"
        }))
        .unwrap();
        assert_eq!(single.entries, Some(Entries::File("1.json".to_string())));

        let list = ChangeEntry::from_value(json!({
            "Action": "EditData", "Target": "Data/Events/Town", "Entries": ["1.json", "2.json"]
        }))
        .unwrap();
        assert!(matches!(list.entries, Some(Entries::Files(ref f)) if f.len() == 2));
    }

    #[test]
    fn test_invalid_change() {
        assert!(matches!(
            ChangeEntry::from_value(json!({ "Target": "Data/Mail" })),
            Err(CpError::InvalidChange(_))
        ));
        assert!(matches!(
            ChangeEntry::from_value(json!({ "Action": "EditData", "Target": "Data/Mail", "Fields": { "a": "b" } })),
            Err(CpError::InvalidChange(_))
        ));
    }

    #[test]
    fn test_unknown_action_roundtrip() {
        let value = json!({ "Action": "EditSomething", "Target": "X", "Custom": 1 });
        let change = ChangeEntry::from_value(value.clone()).unwrap();
        assert_eq!(change.action, Action::Other("EditSomething".to_string()));
        assert_eq!(change.to_value().unwrap(), value);
    }

    #[test]
    fn test_missing_target_not_added() {
        let value = json!({ "Action": "Include", "FromFile": "assets/more.json" });
        let change = ChangeEntry::from_value(value.clone()).unwrap();
        assert_eq!(change.target, "");
        assert_eq!(change.to_value().unwrap(), value);
    }

    #[test]
    fn test_js_string() {
        assert_eq!(js_string(&json!("spring")), "spring");
        assert_eq!(js_string(&json!(true)), "true");
        assert_eq!(js_string(&json!(["a", "b"])), "a,b");
        assert_eq!(js_string(&json!(3)), "3");
    }
}
