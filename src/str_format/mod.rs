//! CP 字符串格式化模块
//!
//! 负责紧凑的运行时字符串与便于编辑的源码字符串之间的双向转换：
//!
//! - **base**: 通用缩进与空白规则
//! - **dialogue**: Dialogue 控制符的换行与缩进
//! - **event**: Events 脚本（`/` 分隔，引号内为 Dialogue）

pub mod base;
pub mod dialogue;
pub mod event;

#[cfg(test)]
mod tests;

pub use base::{FormatOptions, Indent};

use crate::utils::CpError;
use serde::{Deserialize, Serialize};

/// CP 字符串类型
///
/// 由 Change 的 Target 推导（不区分大小写的子串匹配），不单独存储
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrFormat {
    /// 普通字符串
    #[default]
    Plain,
    /// 对话字符串
    Dialogue,
    /// 事件脚本
    Events,
}

impl StrFormat {
    /// 从 Target 推导字符串类型
    pub fn from_target(target: &str) -> Self {
        let target = target.to_lowercase();
        if target.contains("dialogue") {
            StrFormat::Dialogue
        } else if target.contains("events") {
            StrFormat::Events
        } else {
            StrFormat::Plain
        }
    }

    /// 从名称获取字符串类型，无法识别时为 Plain
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "dialogue" => StrFormat::Dialogue,
            "events" | "event" => StrFormat::Events,
            _ => StrFormat::Plain,
        }
    }

    /// 赋值时的规范化（只有 Dialogue 会清除多余空白）
    pub fn normalize(&self, raw: &str) -> String {
        match self {
            StrFormat::Dialogue => dialogue::to_compact(raw),
            StrFormat::Plain | StrFormat::Events => raw.to_string(),
        }
    }

    /// 紧凑字符串 → 源码字符串
    pub fn to_source(&self, raw: &str, options: &FormatOptions) -> Result<String, CpError> {
        match self {
            StrFormat::Plain => Ok(base::to_source(raw, options)),
            StrFormat::Dialogue => Ok(dialogue::to_source(raw, options)),
            StrFormat::Events => event::to_source(raw, options),
        }
    }

    /// 源码字符串 → 紧凑字符串
    pub fn to_compact(&self, source: &str) -> Result<String, CpError> {
        match self {
            StrFormat::Plain => Ok(base::to_compact(source)),
            StrFormat::Dialogue => Ok(dialogue::to_compact(source)),
            StrFormat::Events => event::to_compact(source),
        }
    }
}

/// 带格式化参数的 CP 字符串
///
/// - `as_str` / `set_str`: CP 兼容的紧凑字符串
/// - `to_source` / `set_source`: 源码视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedString {
    format: StrFormat,
    text: String,
    options: FormatOptions,
}

impl FormattedString {
    /// 按字符串类型创建（Dialogue 会立即规范化）
    pub fn new(format: StrFormat, text: &str) -> Self {
        Self {
            format,
            text: format.normalize(text),
            options: FormatOptions::default(),
        }
    }

    /// 根据可选的类型与初始文本创建，类型缺省时为 Plain
    pub fn for_format(format: Option<StrFormat>, seed: Option<&str>) -> Self {
        Self::new(format.unwrap_or_default(), seed.unwrap_or(""))
    }

    /// 从源码创建
    pub fn from_source(format: StrFormat, source: &str, options: FormatOptions) -> Result<Self, CpError> {
        let mut result = Self::new(format, "").with_options(options);
        result.set_source(source)?;
        Ok(result)
    }

    /// 替换格式化参数
    pub fn with_options(mut self, options: FormatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn format(&self) -> StrFormat {
        self.format
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut FormatOptions {
        &mut self.options
    }

    /// CP 兼容的字符串
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// 赋值 CP 字符串
    pub fn set_str(&mut self, text: &str) {
        self.text = self.format.normalize(text);
    }

    /// 源码视图
    pub fn to_source(&self) -> Result<String, CpError> {
        self.format.to_source(&self.text, &self.options)
    }

    /// 从源码赋值
    pub fn set_source(&mut self, source: &str) -> Result<(), CpError> {
        self.text = self.format.to_compact(source)?;
        Ok(())
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
