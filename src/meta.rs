//! 源码文档中的 Meta 声明
//!
//! 构建时每个 Meta 展开为若干 Change，追加到 `Changes` 末尾：
//! - `Character`：按角色 ID 生成立绘、行走图、对话、事件与邮件的 Change
//! - `Folder`：以 `Prototype` 为模板，逐个补全 `Changes` 中的条目

use crate::change::{Action, ChangeEntry, Entries};
use crate::utils::{join_for_smapi, CpError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Meta 声明，按 `Type` 区分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum Meta {
    Character(CharacterMeta),
    Folder(FolderMeta),
}

/// 角色声明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterMeta {
    #[serde(rename = "ID")]
    pub id: String,
    /// 立绘文件
    #[serde(rename = "Portrait", default, skip_serializing_if = "Option::is_none")]
    pub portrait: Option<String>,
    /// 行走图文件
    #[serde(rename = "Sprite", default, skip_serializing_if = "Option::is_none")]
    pub sprite: Option<String>,
    #[serde(rename = "Dialogue", default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<Entries>,
    #[serde(rename = "EngagementDialogue", default, skip_serializing_if = "Option::is_none")]
    pub engagement_dialogue: Option<Entries>,
    #[serde(rename = "MarriageDialogue", default, skip_serializing_if = "Option::is_none")]
    pub marriage_dialogue: Option<Entries>,
    /// 地点 → 事件表
    #[serde(rename = "Events", default, skip_serializing_if = "Option::is_none")]
    pub events: Option<IndexMap<String, Entries>>,
    #[serde(rename = "Mail", default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<Entries>,
}

/// 文件夹声明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderMeta {
    /// 每个 Change 共用的字段
    #[serde(rename = "Prototype", default, skip_serializing_if = "Option::is_none")]
    pub prototype: Option<Map<String, Value>>,
    #[serde(rename = "Changes", default)]
    pub changes: Vec<Map<String, Value>>,
}

impl Meta {
    /// 展开为 Change 列表
    pub fn expand(&self) -> Result<Vec<ChangeEntry>, CpError> {
        match self {
            Meta::Character(character) => Ok(character.expand()),
            Meta::Folder(folder) => folder.expand(),
        }
    }
}

impl CharacterMeta {
    pub fn expand(&self) -> Vec<ChangeEntry> {
        let mut changes = Vec::new();

        if let Some(portrait) = &self.portrait {
            changes.push(load(join_for_smapi(&["Portraits", self.id.as_str()]), portrait));
        }
        if let Some(sprite) = &self.sprite {
            changes.push(load(join_for_smapi(&["Characters", self.id.as_str()]), sprite));
        }

        let dialogues = [
            ("Dialogue", &self.dialogue),
            ("EngagementDialogue", &self.engagement_dialogue),
            ("MarriageDialogue", &self.marriage_dialogue),
        ];
        for (kind, entries) in dialogues {
            let Some(entries) = entries else {
                continue;
            };
            let target = join_for_smapi(&["Characters", kind, self.id.as_str()]);
            changes.push(match entries {
                // 指向 JSON 文件时直接加载整张表
                Entries::File(file) if file.to_lowercase().ends_with(".json") => load(target, file),
                other => edit_data(target, other.clone()),
            });
        }

        for (location, entries) in self.events.iter().flatten() {
            changes.push(edit_data(join_for_smapi(&["Data", "Events", location.as_str()]), entries.clone()));
        }

        if let Some(mail) = &self.mail {
            changes.push(edit_data(join_for_smapi(&["Data", "Mail"]), mail.clone()));
        }

        tracing::debug!("Character {} expanded into {} changes", self.id, changes.len());
        changes
    }
}

impl FolderMeta {
    /// 模板字段在前，条目自身的字段覆盖模板
    pub fn expand(&self) -> Result<Vec<ChangeEntry>, CpError> {
        self.changes
            .iter()
            .map(|own| {
                let mut merged = self.prototype.clone().unwrap_or_default();
                for (key, value) in own {
                    merged.insert(key.clone(), value.clone());
                }
                ChangeEntry::from_value(Value::Object(merged))
            })
            .collect()
    }
}

fn load(target: String, from_file: &str) -> ChangeEntry {
    ChangeEntry {
        action: Action::Load,
        target,
        when: None,
        from_file: Some(from_file.to_string()),
        entries: None,
        fields: None,
        extra: Map::new(),
    }
}

fn edit_data(target: String, entries: Entries) -> ChangeEntry {
    ChangeEntry {
        action: Action::EditData,
        target,
        when: None,
        from_file: None,
        entries: Some(entries),
        fields: None,
        extra: Map::new(),
    }
}
