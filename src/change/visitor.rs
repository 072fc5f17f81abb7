//! 叶子访问策略
//!
//! 同一套遍历逻辑通过不同的访问器实现两种模式：
//! - [`Collector`]: 提取模式，每个叶子回调一次 (标识符, 文本)
//! - [`Substitutor`]: 替换模式，按字典替换叶子文本

use crate::dictionary::{replace_all, Dictionary};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 叶子访问器 trait
pub trait LeafVisitor {
    /// 访问一个文本叶子
    ///
    /// # 返回
    /// - `Some(text)`: 用 `text` 替换该叶子
    /// - `None`: 保持不变
    fn visit(&mut self, id: &str, text: &str) -> Option<String>;

    /// 是否允许写入外部文件（Load 的 FromFile 重定向）
    fn writes_files(&self) -> bool {
        false
    }
}

/// 提取模式访问器，包装一个回调
pub struct Collector<F>
where
    F: FnMut(&str, &str),
{
    callback: F,
}

impl<F> Collector<F>
where
    F: FnMut(&str, &str),
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> LeafVisitor for Collector<F>
where
    F: FnMut(&str, &str),
{
    fn visit(&mut self, id: &str, text: &str) -> Option<String> {
        (self.callback)(id, text);
        None
    }
}

/// 替换模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstituteMode {
    /// 只替换与字典键完全相同的文本
    #[default]
    Exact,
    /// 未完全匹配时，替换文本中出现的每个字典键
    Replace,
}

/// 遍历参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkOptions {
    /// 外部文件的根目录
    pub env: PathBuf,
    #[serde(default)]
    pub mode: SubstituteMode,
}

impl WalkOptions {
    pub fn new(env: impl Into<PathBuf>) -> Self {
        Self {
            env: env.into(),
            mode: SubstituteMode::Exact,
        }
    }

    pub fn with_mode(mut self, mode: SubstituteMode) -> Self {
        self.mode = mode;
        self
    }
}

/// 替换模式访问器
#[derive(Debug)]
pub struct Substitutor<'a> {
    dictionary: &'a Dictionary,
    mode: SubstituteMode,
    replaced: usize,
}

impl<'a> Substitutor<'a> {
    pub fn new(dictionary: &'a Dictionary, mode: SubstituteMode) -> Self {
        if mode == SubstituteMode::Replace && dictionary.contains_key("") {
            tracing::warn!("Dictionary contains an empty key, it is skipped in replace mode");
        }
        Self {
            dictionary,
            mode,
            replaced: 0,
        }
    }

    /// 已替换的叶子数量
    pub fn replaced(&self) -> usize {
        self.replaced
    }
}

impl LeafVisitor for Substitutor<'_> {
    fn visit(&mut self, id: &str, text: &str) -> Option<String> {
        // 空译文视为缺失
        let result = match self.dictionary.get(text).filter(|t| !t.is_empty()) {
            Some(translated) => Some(translated.clone()),
            None if self.mode == SubstituteMode::Replace => {
                Some(replace_all(text, self.dictionary)).filter(|replaced| replaced != text)
            }
            None => None,
        };

        if result.is_some() {
            tracing::debug!("Substituted {}: {}", id, crate::utils::preview(text));
            self.replaced += 1;
        }
        result
    }

    fn writes_files(&self) -> bool {
        true
    }
}
