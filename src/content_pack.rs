//! Content Patcher 文档
//!
//! 以文档为单位组合 Change 的遍历：提取字典、翻译、反编译为源码表、从源码表构建。

use crate::change::{ChangeEntry, Entries, SubstituteMode, WalkOptions};
use crate::dictionary::{read_document, read_string_map, write_document, write_entries_file, Dictionary};
use crate::meta::Meta;
use crate::str_format::FormatOptions;
use crate::utils::{contains_cjk, CpError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 提取时的语言过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageFilter {
    /// 只保留包含中文字符的文本
    #[serde(rename = "zh")]
    Chinese,
}

impl LanguageFilter {
    /// 由语言代码创建，未知代码返回 None
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "zh" | "zh-cn" | "chinese" => Some(LanguageFilter::Chinese),
            _ => None,
        }
    }

    pub fn accepts(&self, text: &str) -> bool {
        match self {
            LanguageFilter::Chinese => contains_cjk(text),
        }
    }
}

/// 反编译出的一张源码表
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    /// 表编号，从 1 开始
    pub number: usize,
    /// 对应 Change 在文档中的下标
    pub change_index: usize,
    pub entries: Dictionary,
}

impl SourceTable {
    /// 源码表文件名：`<n>.xml`
    pub fn file_name(&self) -> String {
        format!("{}.xml", self.number)
    }
}

/// 源码文档中指向替换字典的字段
const REPLACE_KEY: &str = "Replace";

/// Content Patcher 文档
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPack {
    #[serde(rename = "Format", default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "Changes", default)]
    pub changes: Vec<ChangeEntry>,
    /// 源码文档的 Meta 声明，构建时展开
    #[serde(rename = "Meta", default, skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<Meta>,
    /// 其余字段（ConfigSchema、CustomLocations 等）
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// 解析时的原始 JSON 树，输出时按其键顺序排列
    #[serde(skip)]
    layout: Option<Value>,
}

impl PartialEq for ContentPack {
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format
            && self.changes == other.changes
            && self.meta == other.meta
            && self.extra == other.extra
    }
}

impl ContentPack {
    /// 从通用 JSON 树解析
    pub fn from_value(value: Value) -> Result<Self, CpError> {
        let mut pack: Self =
            serde_json::from_value(value.clone()).map_err(|e| CpError::InvalidChange(e.to_string()))?;
        pack.layout = Some(value);
        Ok(pack)
    }

    /// 转换回通用 JSON 树
    ///
    /// 已有的键保持解析时的顺序，新增的键排在其后
    pub fn to_value(&self) -> Result<Value, CpError> {
        let value = serde_json::to_value(self)?;
        Ok(match &self.layout {
            Some(layout) => align_order(value, layout),
            None => value,
        })
    }

    /// 读取文档文件
    ///
    /// # 参数
    /// * `path` - content.json 路径
    /// * `encoding` - 编码标签，默认 utf-8
    pub fn load(path: &Path, encoding: Option<&str>) -> Result<Self, CpError> {
        let value = read_document(path, encoding).map_err(|e| e.in_file(path))?;
        let pack = Self::from_value(value).map_err(|e| e.in_file(path))?;
        tracing::debug!("Loaded {} changes from {:?}", pack.changes.len(), path);
        Ok(pack)
    }

    /// 以制表符缩进写入文档
    pub fn save(&self, path: &Path) -> Result<(), CpError> {
        write_document(path, &self.to_value()?)
    }

    /// 提取整个文档的字典：标识符 → 文本
    ///
    /// 同一标识符出现多次时后者覆盖前者
    pub fn extract_dict(&self, env: &Path, filter: Option<LanguageFilter>) -> Result<Dictionary, CpError> {
        let mut dictionary = Dictionary::new();
        for change in &self.changes {
            change.collect(env, |id, text| {
                if filter.map_or(true, |f| f.accepts(text)) {
                    dictionary.insert(id.to_string(), text.to_string());
                }
            })?;
        }
        tracing::info!("Extracted {} strings from {} changes", dictionary.len(), self.changes.len());
        Ok(dictionary)
    }

    /// 翻译整个文档，返回翻译后的副本
    ///
    /// Load 引用的文件会在 `options.env` 下写入 `-translated` 副本
    pub fn translate(&self, dictionary: &Dictionary, options: &WalkOptions) -> Result<ContentPack, CpError> {
        let mut translated = self.clone();
        let mut replaced = 0;
        for change in translated.changes.iter_mut() {
            replaced += change.substitute(dictionary, options)?;
        }
        tracing::info!("Translated {} strings ({:?} mode)", replaced, options.mode);
        Ok(translated)
    }

    /// 反编译：为每个 Dialogue / Events 文本表生成源码表
    pub fn decompile(&self, options: &FormatOptions) -> Result<Vec<SourceTable>, CpError> {
        let mut tables = Vec::new();
        for (change_index, change) in self.changes.iter().enumerate() {
            if let Some(entries) = change.source_entries(options)? {
                tables.push(SourceTable {
                    number: tables.len() + 1,
                    change_index,
                    entries,
                });
            }
        }
        Ok(tables)
    }

    /// 反编译并写入 `src_dir/<n>.xml`，返回 Entries 指向源码表的文档
    pub fn decompile_to(&self, src_dir: &Path, options: &FormatOptions) -> Result<ContentPack, CpError> {
        let tables = self.decompile(options)?;
        let mut redirected = self.clone();

        for table in &tables {
            let file_name = table.file_name();
            let path: PathBuf = src_dir.join(&file_name);
            write_entries_file(&path, &table.entries).map_err(|e| e.in_file(&path))?;
            if let Some(change) = redirected.changes.get_mut(table.change_index) {
                change.entries = Some(Entries::File(file_name));
            }
        }

        tracing::info!("Decompiled {} entry tables into {:?}", tables.len(), src_dir);
        Ok(redirected)
    }

    /// 从源码构建文档
    ///
    /// 先把 Meta 声明展开追加到 Changes 末尾，再编译所有引用源码文件的 Entries（相对于 `env`）。
    /// 提供 `replace`（或文档的 `Replace` 字段指向字典文件）时，再以替换模式把字典应用到每个 Change。
    pub fn build(&self, env: &Path, replace: Option<&Dictionary>) -> Result<ContentPack, CpError> {
        let mut built = self.clone();
        for meta in std::mem::take(&mut built.meta) {
            built.changes.extend(meta.expand()?);
        }

        let mut compiled = 0;
        for change in built.changes.iter_mut() {
            if change.compile_entries(env, None)? {
                compiled += 1;
            }
        }

        let replace_file = match built.extra.remove(REPLACE_KEY) {
            Some(Value::String(file)) => {
                let path = env.join(file);
                Some(read_string_map(&path, None).map_err(|e| e.in_file(&path))?)
            }
            Some(other) => {
                return Err(CpError::InvalidChange(format!("{} must be a file path: {}", REPLACE_KEY, other)));
            }
            None => None,
        };

        if let Some(dictionary) = replace.or(replace_file.as_ref()) {
            let options = WalkOptions::new(env).with_mode(SubstituteMode::Replace);
            for change in built.changes.iter_mut() {
                change.substitute(dictionary, &options)?;
            }
        }

        tracing::info!("Built {} changes, {} compiled from source", built.changes.len(), compiled);
        Ok(built)
    }
}

/// 按模板的键顺序重排对象，模板中没有的键保持原有相对顺序并排在最后
fn align_order(value: Value, template: &Value) -> Value {
    match (value, template) {
        (Value::Object(map), Value::Object(template_map)) => {
            let order: HashMap<&str, usize> = template_map.keys().enumerate().map(|(i, k)| (k.as_str(), i)).collect();
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by_cached_key(|(key, _)| order.get(key.as_str()).copied().unwrap_or(usize::MAX));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, child)| {
                        let child = match template_map.get(&key) {
                            Some(child_template) => align_order(child, child_template),
                            None => child,
                        };
                        (key, child)
                    })
                    .collect(),
            )
        }
        (Value::Array(items), Value::Array(template_items)) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match template_items.get(i) {
                    Some(item_template) => align_order(item, item_template),
                    None => item,
                })
                .collect(),
        ),
        (value, _) => value,
    }
}
