//! 通用格式化规则
//!
//! 所有字符串类型共享的缩进与空白处理：
//! - 源码视图：首尾补换行与缩进，折叠空行
//! - 压缩：删除换行与制表符，合并连续空白，去除 `#`、`^` 两侧空白

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// 缩进单位：字面空白字符串，或若干个空格
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Indent {
    /// 重复次数（每级缩进的空格数）
    Spaces(usize),
    /// 字面空白，如 `"\t"`
    Literal(String),
}

impl Indent {
    /// 获取单级缩进字符串
    pub fn unit(&self) -> Cow<'_, str> {
        match self {
            Indent::Spaces(n) => Cow::Owned(" ".repeat(*n)),
            Indent::Literal(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

impl Default for Indent {
    fn default() -> Self {
        Indent::Literal("\t".to_string())
    }
}

/// 格式化参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// 缩进单位
    #[serde(default)]
    pub indent: Indent,
    /// 嵌套深度
    #[serde(default = "default_depth")]
    pub depth: usize,
}

fn default_depth() -> usize {
    2
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: Indent::default(),
            depth: default_depth(),
        }
    }
}

impl FormatOptions {
    /// 创建格式化参数
    pub fn new(indent: Indent, depth: usize) -> Self {
        Self { indent, depth }
    }

    /// 深一级的格式化参数
    pub fn deeper(&self) -> Self {
        Self {
            indent: self.indent.clone(),
            depth: self.depth + 1,
        }
    }

    /// 根据 alter 计算换行+缩进
    ///
    /// 返回 `"\n" + 缩进单位 × max(0, depth + alter)`，深度为负时只保留换行
    pub fn compute_indent(&self, alter: isize) -> String {
        let depth = self.depth as isize + alter;
        let repeat = usize::try_from(depth).unwrap_or(0);
        let mut result = String::from("\n");
        result.push_str(&self.indent.unit().repeat(repeat));
        result
    }
}

/// 删除多余空白（CP 字符串的规范化）
///
/// 依次：删除全部换行与制表符、去除首尾空白、连续空白替换为单个空格、
/// 删除 `#` 与 `^` 两侧的空白
pub(crate) fn drop_blank(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| *c != '\n' && *c != '\t').collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    tighten_around(&collapsed, &['#', '^'])
}

/// 删除紧邻指定符号的空格（输入须已合并连续空白）
fn tighten_around(text: &str, symbols: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' {
            let before = out.ends_with(|p: char| symbols.contains(&p));
            let after = chars.peek().is_some_and(|n| symbols.contains(n));
            if before || after {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// 删除空行与行尾空白
///
/// 每段包含换行的连续空白，替换为单个换行加最后一个换行之后的缩进。
/// 多次调用结果不变。
pub(crate) fn drop_blank_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    for c in text.chars() {
        if c.is_whitespace() {
            run.push(c);
        } else {
            flush_blank_run(&mut out, &run);
            run.clear();
            out.push(c);
        }
    }
    flush_blank_run(&mut out, &run);
    out
}

fn flush_blank_run(out: &mut String, run: &str) {
    match run.rfind('\n') {
        Some(pos) => {
            out.push('\n');
            out.push_str(&run[pos + 1..]);
        }
        None => out.push_str(run),
    }
}

/// 源码视图：增加首尾换行与缩进
pub fn to_source(raw: &str, options: &FormatOptions) -> String {
    let mut wrapped = options.compute_indent(0);
    wrapped.push_str(raw);
    wrapped.push_str(&options.compute_indent(-1));
    drop_blank_line(&wrapped)
}

/// 从源码还原：去除首尾空白和全部空行
pub fn to_compact(source: &str) -> String {
    drop_blank_line(source.trim())
}
