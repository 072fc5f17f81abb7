use super::visitor::{Collector, LeafVisitor, Substitutor, WalkOptions};
use super::{js_string, Action, ChangeEntry, Entries, EntryValue};
use crate::dictionary::{read_string_map, write_string_map, Dictionary};
use crate::str_format::event::{check_quotes, split_quoted, Segment};
use crate::str_format::StrFormat;
use crate::utils::{preview, translated_file_name, CpError};
use crate::{LANGUAGE_CONDITION, NON_TEXT_TARGETS, RESERVED_ENTRY_KEY};
use serde_json::Value;
use std::path::Path;

impl ChangeEntry {
    /// 由 Target 推导的字符串类型
    pub fn str_format(&self) -> StrFormat {
        StrFormat::from_target(&self.target)
    }

    /// 标识符前缀：Action + Target + "[When]" + 条件（忽略语言条件）
    ///
    /// 同一文档的不同语言版本因此共享标识符
    pub fn base_id(&self) -> String {
        let mut id = format!("{}{}[When]", self.action.as_str(), self.target);
        if let Some(when) = &self.when {
            for (key, value) in when {
                if !key.eq_ignore_ascii_case(LANGUAGE_CONDITION) {
                    id.push_str(key);
                    id.push_str(&js_string(value));
                }
            }
        }
        id
    }

    /// 检查 Target 是否属于不含文本的资源
    pub fn targets_non_text(&self) -> bool {
        let target = self.target.to_lowercase();
        NON_TEXT_TARGETS
            .iter()
            .any(|name| target.contains(&name.to_lowercase()))
    }

    /// 遍历所有文本叶子
    ///
    /// # 参数
    /// * `env` - 外部文件的根目录
    /// * `visitor` - 叶子访问器，返回值决定是否替换
    ///
    /// # 错误
    /// - Events 文本引号数量为奇数
    /// - Load 引用的文件缺失或无法解析
    /// - 结构不符（如 Reactions 不是列表）
    pub fn walk(&mut self, env: &Path, visitor: &mut dyn LeafVisitor) -> Result<(), CpError> {
        match self.action {
            Action::EditData => {
                if self.targets_non_text() {
                    tracing::debug!("Skipping non-text target {}", self.target);
                    return Ok(());
                }
                self.walk_entries(visitor)?;
                self.walk_fields(visitor);
            }
            Action::Load if self.str_format() == StrFormat::Dialogue => {
                self.walk_load(env, visitor)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// 提取模式：每个叶子调用一次回调，不写入任何文件
    pub fn collect<F>(&self, env: &Path, callback: F) -> Result<(), CpError>
    where
        F: FnMut(&str, &str),
    {
        let mut scratch = self.clone();
        let mut collector = Collector::new(callback);
        scratch.walk(env, &mut collector)
    }

    /// 提取为 标识符 → 文本 字典
    pub fn extract(&self, env: &Path) -> Result<Dictionary, CpError> {
        let mut dictionary = Dictionary::new();
        self.collect(env, |id, text| {
            dictionary.insert(id.to_string(), text.to_string());
        })?;
        Ok(dictionary)
    }

    /// 替换模式：原地替换叶子文本，返回替换的叶子数量
    pub fn substitute(&mut self, dictionary: &Dictionary, options: &WalkOptions) -> Result<usize, CpError> {
        let mut substitutor = Substitutor::new(dictionary, options.mode);
        self.walk(&options.env, &mut substitutor)?;
        Ok(substitutor.replaced())
    }

    /// 替换模式，返回翻译后的副本
    pub fn translated(&self, dictionary: &Dictionary, options: &WalkOptions) -> Result<ChangeEntry, CpError> {
        let mut result = self.clone();
        result.substitute(dictionary, options)?;
        Ok(result)
    }

    fn walk_entries(&mut self, visitor: &mut dyn LeafVisitor) -> Result<(), CpError> {
        let base = self.base_id();
        let is_events = self.str_format() == StrFormat::Events;
        let Some(Entries::Map(entries)) = self.entries.as_mut() else {
            return Ok(());
        };

        for (key, value) in entries.iter_mut() {
            // set-up 不包含文本
            if key == RESERVED_ENTRY_KEY {
                continue;
            }
            let id = format!("{}Entries{}", base, key);

            match value {
                None => {}
                Some(EntryValue::Text(text)) => {
                    if text.is_empty() {
                        continue;
                    }
                    let looks_like_event = text.contains('/') && text.contains('"');
                    if is_events {
                        check_quotes(text)?;
                    }
                    // 事件脚本只处理引号内的文本，奇数引号的非事件文本按整体处理
                    let replaced = if is_events || (looks_like_event && check_quotes(text).is_ok()) {
                        visit_quoted(&id, text, visitor)
                    } else {
                        visitor.visit(&id, text)
                    };
                    if let Some(replaced) = replaced {
                        *text = replaced;
                    }
                }
                Some(EntryValue::Reactions(record)) => {
                    for reaction in record.reactions.iter_mut() {
                        let reaction_id = reaction.id.as_ref().map(js_string).unwrap_or_default();
                        let Some(special) = reaction.special_responses.as_mut() else {
                            continue;
                        };
                        for (response_key, response) in special.iter_mut() {
                            let Some(text) = response.as_mut().and_then(|r| r.text.as_mut()) else {
                                continue;
                            };
                            if text.is_empty() {
                                continue;
                            }
                            let id = format!("{}{}{}", id, response_key, reaction_id);
                            if let Some(replaced) = visitor.visit(&id, text) {
                                *text = replaced;
                            }
                        }
                    }
                }
                Some(EntryValue::Other(Value::Object(map))) if map.contains_key("Reactions") => {
                    return Err(CpError::InvalidChange(format!(
                        "Reactions of entry '{}' in {} must be a list of reaction records",
                        key, self.target
                    )));
                }
                Some(EntryValue::Other(_)) => {}
            }
        }
        Ok(())
    }

    fn walk_fields(&mut self, visitor: &mut dyn LeafVisitor) {
        let base = self.base_id();
        let Some(fields) = self.fields.as_mut() else {
            return;
        };

        for (entry_key, field) in fields.iter_mut() {
            for (field_key, cell) in field.iter_mut() {
                let Value::String(text) = cell else {
                    continue;
                };
                if text.is_empty() {
                    continue;
                }
                let id = format!("{}Fields{}{}", base, entry_key, field_key);
                if let Some(replaced) = visitor.visit(&id, text) {
                    *text = replaced;
                }
            }
        }
    }

    /// Load 的 Dialogue 文件：每个值都是叶子；替换模式下写入 `-translated` 文件并重定向
    fn walk_load(&mut self, env: &Path, visitor: &mut dyn LeafVisitor) -> Result<(), CpError> {
        let base = self.base_id();
        let Some(from_file) = self.from_file.clone() else {
            return Err(CpError::InvalidChange(format!(
                "Load change for {} has no FromFile",
                self.target
            )));
        };

        let path = env.join(&from_file);
        let mut mapping = read_string_map(&path, None).map_err(|e| e.in_file(&path))?;
        tracing::debug!("Loaded {} entries from {:?}", mapping.len(), path);

        for (key, value) in mapping.iter_mut() {
            if value.is_empty() {
                continue;
            }
            let id = format!("{}{}", base, key);
            if let Some(replaced) = visitor.visit(&id, value) {
                *value = replaced;
            }
        }

        if visitor.writes_files() {
            let sibling = translated_file_name(&from_file);
            let sibling_path = env.join(&sibling);
            write_string_map(&sibling_path, &mapping, false).map_err(|e| e.in_file(&sibling_path))?;
            tracing::debug!("Redirected FromFile {} -> {}", from_file, sibling);
            self.from_file = Some(sibling);
        }
        Ok(())
    }
}

/// 逐个访问引号内的文本（不含引号），标识符为 id + 序号；引号外的内容保持不变
fn visit_quoted(id: &str, text: &str, visitor: &mut dyn LeafVisitor) -> Option<String> {
    let segments = split_quoted(text);
    let mut result = String::with_capacity(text.len());
    let mut changed = false;
    let mut index = 0;

    for segment in segments {
        match segment {
            Segment::Plain(plain) => result.push_str(plain),
            Segment::Quoted(inner) => {
                result.push('"');
                let replaced = if inner.is_empty() {
                    None
                } else {
                    visitor.visit(&format!("{}{}", id, index), inner)
                };
                match replaced {
                    Some(replaced) => {
                        result.push_str(&replaced);
                        changed = true;
                    }
                    None => result.push_str(inner),
                }
                result.push('"');
                index += 1;
            }
        }
    }

    if changed {
        tracing::debug!("Rewrote quoted segments of {}: {}", id, preview(text));
    }
    changed.then_some(result)
}
