//! Events 字符串格式化
//!
//! 紧凑形式以 `/` 分隔命令，引号内为 Dialogue 文本。
//! 源码中引号数量必须为偶数，并支持语法糖 `{{BODY}*N}`：BODY 重复 N 次（N 为 1~3 位数字）。

use super::base::{self, drop_blank, drop_blank_line, FormatOptions};
use super::dialogue;
use crate::utils::CpError;

/// 引号切分后的片段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    /// 引号外的命令文本
    Plain(&'a str),
    /// 引号内的文本（不含引号）
    Quoted(&'a str),
}

/// 统计双引号数量
pub fn count_quotes(text: &str) -> usize {
    text.matches('"').count()
}

/// 校验引号数量为偶数
pub fn check_quotes(text: &str) -> Result<(), CpError> {
    if count_quotes(text) % 2 == 1 {
        return Err(CpError::OddQuotes(text.to_string()));
    }
    Ok(())
}

/// 按双引号切分字符串，多余的未闭合引号归入引号外文本
pub(crate) fn split_quoted(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('"') {
        let Some(close) = rest[open + 1..].find('"').map(|p| open + 1 + p) else {
            break;
        };
        if open > 0 {
            segments.push(Segment::Plain(&rest[..open]));
        }
        segments.push(Segment::Quoted(&rest[open + 1..close]));
        rest = &rest[close + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Plain(rest));
    }
    segments
}

/// 展开所有 `{{BODY}*N}` 重复宏
pub fn expand_repeats(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match parse_repeat(candidate) {
            Some((body, count, consumed)) => {
                out.push_str(&body.repeat(count));
                rest = &candidate[consumed..];
            }
            None => {
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// 解析以 `{` 开头的重复宏，返回 (BODY, N, 消耗的字节数)
fn parse_repeat(text: &str) -> Option<(&str, usize, usize)> {
    let inner = text.strip_prefix('{')?.trim_start().strip_prefix('{')?;
    let close = inner.find('}')?;
    let body = &inner[..close];
    if body.contains('{') {
        return None;
    }

    let tail = inner[close + 1..].trim_start().strip_prefix('*')?.trim_start();
    let digits = tail.len() - tail.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if !(1..=3).contains(&digits) {
        return None;
    }
    let count: usize = tail[..digits].parse().ok()?;
    let tail = tail[digits..].trim_start().strip_prefix('}')?;

    Some((body, count, text.len() - tail.len()))
}

/// 引号外：换行还原为 `/`，删除 `/` 周围的空白，合并连续的 `/`
fn normalize_commands(text: &str) -> String {
    let replaced = text.replace('\n', "/");
    let pieces: Vec<&str> = replaced.split('/').collect();
    let last = pieces.len() - 1;

    let joined = pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            let mut piece = *piece;
            if i > 0 {
                piece = piece.trim_start();
            }
            if i < last {
                piece = piece.trim_end();
            }
            piece
        })
        .collect::<Vec<_>>()
        .join("/");

    let mut out = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

/// 从源码编译为紧凑形式
///
/// 处理顺序：校验引号 → 展开重复宏 → 引号前空白替换为单个空格 →
/// 引号外换行转 `/` 并整理 → 去除首尾 `/` → 删除多余空白
pub fn to_compact(source: &str) -> Result<String, CpError> {
    check_quotes(source)?;
    let expanded = expand_repeats(source);
    check_quotes(&expanded)?;

    let segments = split_quoted(&expanded);
    let mut out = String::with_capacity(expanded.len());

    for (i, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Plain(text) => {
                let before_quote = matches!(segments.get(i + 1), Some(Segment::Quoted(_)));
                if before_quote {
                    let commands = normalize_commands(text.trim_end());
                    out.push_str(&commands);
                    if !commands.ends_with('/') {
                        out.push(' ');
                    }
                } else {
                    out.push_str(&normalize_commands(text));
                }
            }
            Segment::Quoted(inner) => {
                out.push('"');
                out.push_str(inner);
                out.push('"');
            }
        }
    }

    let trimmed = out.trim_matches(|c: char| c == '/' || c.is_whitespace());
    Ok(drop_blank(trimmed))
}

/// 生成源码视图
///
/// 引号外的 `/` 替换为换行，引号内按 Dialogue 格式化（深度+1）。
/// 引号后紧跟的参数留在引号所在行；以引号开头的命令前单独保留一行 `/`。
pub fn to_source(raw: &str, options: &FormatOptions) -> Result<String, CpError> {
    check_quotes(raw)?;

    let wrapped = base::to_source(raw, options);
    let line_break = options.compute_indent(0);
    let dialogue_options = options.deeper();
    let segments = split_quoted(&wrapped);
    let mut out = String::with_capacity(wrapped.len() * 2);

    for (i, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Plain(text) => {
                let commands = tighten_slashes(text);
                let before_quote = matches!(segments.get(i + 1), Some(Segment::Quoted(_)));
                match commands.trim_end().strip_suffix('/') {
                    Some(head) if before_quote => {
                        out.push_str(&head.replace('/', &line_break));
                        out.push_str(&line_break);
                        out.push('/');
                    }
                    _ => out.push_str(&commands.replace('/', &line_break)),
                }
            }
            Segment::Quoted(inner) => {
                let quoted = format!("\"{}\"", inner);
                let mut source = dialogue::to_source(&quoted, &dialogue_options);
                if quote_joins_previous(&segments, i) {
                    source = source.trim_start().to_string();
                }
                if quote_keeps_arguments(&segments, i) {
                    source.truncate(source.trim_end().len());
                }
                out.push_str(&source);
            }
        }
    }

    Ok(drop_blank_line(&out))
}

/// 引号紧跟在另一段引号之后
fn quote_joins_previous(segments: &[Segment<'_>], i: usize) -> bool {
    i > 0 && matches!(segments.get(i - 1), Some(Segment::Quoted(_)))
}

/// 引号之后在同一命令内还有参数（或紧跟另一段引号）
fn quote_keeps_arguments(segments: &[Segment<'_>], i: usize) -> bool {
    match segments.get(i + 1) {
        Some(Segment::Quoted(_)) => true,
        Some(Segment::Plain(text)) => {
            let rest = text.trim_start();
            !rest.is_empty() && !rest.starts_with('/')
        }
        None => false,
    }
}

/// 删除 `/` 周围的空白
fn tighten_slashes(text: &str) -> String {
    let pieces: Vec<&str> = text.split('/').collect();
    let last = pieces.len() - 1;
    pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| match (i > 0, i < last) {
            (true, true) => piece.trim(),
            (true, false) => piece.trim_start(),
            (false, true) => piece.trim_end(),
            (false, false) => piece,
        })
        .collect::<Vec<_>>()
        .join("/")
}
