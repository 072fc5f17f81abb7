//! Entries 的源码形式
//!
//! 反编译把 Dialogue / Events 表的每个值转成可编辑的源码形式，
//! 编译则读取 `Entries` 引用的源码文件并压缩回紧凑形式。

use super::{Action, ChangeEntry, Entries, EntryValue};
use crate::dictionary::{read_entries_file, Dictionary};
use crate::str_format::{FormatOptions, StrFormat};
use crate::utils::CpError;
use indexmap::IndexMap;
use std::path::Path;

impl ChangeEntry {
    /// 生成 Entries 的源码表
    ///
    /// 仅当动作是 EditData、Target 为 Dialogue / Events，且表中每个值都是字符串（或 null）时返回 `Some`。
    /// null 值在源码表中为空字符串。
    pub fn source_entries(&self, options: &FormatOptions) -> Result<Option<Dictionary>, CpError> {
        let format = self.str_format();
        if self.action != Action::EditData || format == StrFormat::Plain {
            return Ok(None);
        }
        let Some(Entries::Map(entries)) = &self.entries else {
            return Ok(None);
        };

        let mut table = Dictionary::with_capacity(entries.len());
        for (key, value) in entries {
            let source = match value {
                None => String::new(),
                Some(EntryValue::Text(text)) => format.to_source(text, options)?,
                Some(_) => return Ok(None),
            };
            table.insert(key.clone(), source);
        }
        Ok(Some(table))
    }

    /// 编译 `Entries` 引用的源码文件
    ///
    /// 文件路径相对于 `env`，`.xml` 文件按 XML 条目表读取，其余按 JSON 读取。
    /// 多个文件按顺序合并（后者覆盖同名键）。
    /// 每个值用 Target 对应的格式压缩。
    ///
    /// # 返回
    /// Entries 是否被替换为内联表
    pub fn compile_entries(&mut self, env: &Path, encoding: Option<&str>) -> Result<bool, CpError> {
        let files = match &self.entries {
            Some(Entries::File(file)) => vec![file.clone()],
            Some(Entries::Files(files)) => files.clone(),
            _ => return Ok(false),
        };

        let format = self.str_format();
        let mut compiled = IndexMap::new();
        for file in &files {
            let path = env.join(file);
            let table = read_entries_file(&path, encoding).map_err(|e| e.in_file(&path))?;
            for (key, source) in table {
                let text = format.to_compact(&source).map_err(|e| e.in_file(&path))?;
                let value = (!text.is_empty()).then_some(EntryValue::Text(text));
                compiled.insert(key, value);
            }
        }

        tracing::debug!("Compiled {} entries for {} from {:?}", compiled.len(), self.target, files);
        self.entries = Some(Entries::Map(compiled));
        Ok(true)
    }
}
