//! Dialogue 字符串格式化
//!
//! 紧凑形式中的控制符：
//! - 普通中断符：`#$e#`、`#$b#`
//! - 概率分支：`#$c .5#`（0~1 的小数）
//! - 疑问分支：`#$q ...#`
//! - 回答分支：`#$r ...#`
//! - 性别分支：`#男性文本^女性文本`
//!
//! 先把紧凑字符串切分为记号流，再按记号类型插入换行与缩进。

use super::base::{drop_blank, drop_blank_line, FormatOptions};

/// Dialogue 记号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// 普通文本
    Text(&'a str),
    /// 普通中断符 `#$e#` / `#$b#`
    Break(&'a str),
    /// 概率分支 `#$c .5#`
    Chance(&'a str),
    /// 疑问分支 `#$q ...#`
    Question(&'a str),
    /// 回答分支 `#$r ...#`
    Answer(&'a str),
    /// 其它 `#`（性别分支的引导符即属此类）
    Hash,
    /// 性别分隔符 `^`
    GenderSep,
}

impl Token<'_> {
    /// 是否以 `#` 开头（会终止概率分支和性别分支）
    fn starts_with_hash(&self) -> bool {
        !matches!(self, Token::Text(_) | Token::GenderSep)
    }
}

/// 将紧凑字符串切分为记号流
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        let matched = match rest.as_bytes()[0] {
            b'#' => Some(match_control(rest)),
            b'^' => Some((Token::GenderSep, 1)),
            _ => None,
        };

        match matched {
            Some((token, len)) => {
                if text_start < pos {
                    tokens.push(Token::Text(&text[text_start..pos]));
                }
                tokens.push(token);
                pos += len;
                text_start = pos;
            }
            None => {
                // 跳过一个完整字符
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    if text_start < text.len() {
        tokens.push(Token::Text(&text[text_start..]));
    }
    tokens
}

/// 识别以 `#` 开头的控制符，返回记号与其字节长度
fn match_control(rest: &str) -> (Token<'_>, usize) {
    if rest.starts_with("#$e#") || rest.starts_with("#$b#") {
        return (Token::Break(&rest[..4]), 4);
    }
    if let Some(len) = match_chance(rest) {
        return (Token::Chance(&rest[..len]), len);
    }
    for (prefix, is_question) in [("#$q", true), ("#$r", false)] {
        if rest.starts_with(prefix) {
            if let Some(end) = rest[prefix.len()..].find(|c: char| c == '#' || c == '\n') {
                let end = prefix.len() + end;
                if rest.as_bytes()[end] == b'#' {
                    let marker = &rest[..=end];
                    let token = if is_question {
                        Token::Question(marker)
                    } else {
                        Token::Answer(marker)
                    };
                    return (token, end + 1);
                }
            }
        }
    }
    (Token::Hash, 1)
}

/// 匹配 `#$c 0?\.\d+#`
fn match_chance(rest: &str) -> Option<usize> {
    let tail = rest.strip_prefix("#$c ")?;
    let tail_no_zero = tail.strip_prefix('0').unwrap_or(tail);
    let digits_part = tail_no_zero.strip_prefix('.')?;
    let digits = digits_part.len() - digits_part.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 || !digits_part[digits..].starts_with('#') {
        return None;
    }
    Some(rest.len() - digits_part.len() + digits + 1)
}

/// 规范化紧凑字符串（赋值时清除多余空白）
pub fn to_compact(source: &str) -> String {
    drop_blank(source)
}

/// 生成源码视图
pub fn to_source(raw: &str, options: &FormatOptions) -> String {
    let text = drop_blank(raw);
    let tokens = tokenize(&text);

    let mut body = String::with_capacity(text.len() * 2);
    let mut in_chance = false;
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            Token::Text(s) => body.push_str(s),
            Token::Break(s) => {
                // 概率分支控制的范围到下一个普通中断符为止（含），整体缩进+1
                let alter = if in_chance { 1 } else { 0 };
                body.push_str(&options.compute_indent(alter));
                body.push_str(s);
                in_chance = false;
            }
            Token::Chance(s) => {
                body.push_str(&options.compute_indent(0));
                body.push_str(s);
                body.push_str(&options.compute_indent(1));
                in_chance = true;
            }
            Token::Question(s) => {
                body.push_str(&options.compute_indent(0));
                body.push_str(s);
                in_chance = false;
            }
            Token::Answer(s) => {
                body.push_str(&options.compute_indent(1));
                body.push_str(s);
                in_chance = false;
            }
            Token::Hash => {
                in_chance = false;
                let end = tokens[i + 1..]
                    .iter()
                    .position(Token::starts_with_hash)
                    .map_or(tokens.len(), |p| i + 1 + p);
                let span = &tokens[i + 1..end];

                if span.contains(&Token::GenderSep) {
                    write_gender_span(&mut body, span, options);
                    i = end;
                    continue;
                }
                body.push('#');
            }
            Token::GenderSep => body.push('^'),
        }
        i += 1;
    }

    let mut wrapped = options.compute_indent(0);
    wrapped.push_str(&body);
    wrapped.push_str(&options.compute_indent(-1));
    drop_blank_line(&wrapped)
}

/// 性别分支：引导符与分隔符各自换行，缩进+1
fn write_gender_span(body: &mut String, span: &[Token<'_>], options: &FormatOptions) {
    let branch_indent = options.compute_indent(1);
    body.push_str(&branch_indent);
    body.push('#');
    for token in span {
        match token {
            Token::Text(s) => body.push_str(s),
            Token::GenderSep => {
                body.push_str(&branch_indent);
                body.push('^');
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_controls() {
        let tokens = tokenize("Hi#$b#A#$c .5#B#$e#C");
        assert_eq!(
            tokens,
            vec![
                Token::Text("Hi"),
                Token::Break("#$b#"),
                Token::Text("A"),
                Token::Chance("#$c .5#"),
                Token::Text("B"),
                Token::Break("#$e#"),
                Token::Text("C"),
            ]
        );
    }

    #[test]
    fn test_tokenize_question_and_gender() {
        let tokens = tokenize("#$q 101 null#Why?#$r 101 0 a#Yes^Oui");
        assert_eq!(
            tokens,
            vec![
                Token::Question("#$q 101 null#"),
                Token::Text("Why?"),
                Token::Answer("#$r 101 0 a#"),
                Token::Text("Yes"),
                Token::GenderSep,
                Token::Text("Oui"),
            ]
        );
    }

    #[test]
    fn test_tokenize_unknown_hash() {
        assert_eq!(
            tokenize("a#$c abc#b"),
            vec![Token::Text("a"), Token::Hash, Token::Text("$c abc"), Token::Hash, Token::Text("b")]
        );
        assert_eq!(tokenize("#$c 0.25#"), vec![Token::Chance("#$c 0.25#")]);
    }

    #[test]
    fn test_tokenize_multibyte() {
        assert_eq!(
            tokenize("你好#$b#再见"),
            vec![Token::Text("你好"), Token::Break("#$b#"), Token::Text("再见")]
        );
    }

    #[test]
    fn test_break_source() {
        let options = FormatOptions::default();
        assert_eq!(
            to_source("Hello.#$b#How are you?#$e#Bye.", &options),
            "\n\t\tHello.\n\t\t#$b#How are you?\n\t\t#$e#Bye.\n\t"
        );
    }

    #[test]
    fn test_chance_source() {
        let options = FormatOptions::default();
        let source = to_source("A#$c .5#B#$e#C", &options);
        assert_eq!(source, "\n\t\tA\n\t\t#$c .5#\n\t\t\tB\n\t\t\t#$e#C\n\t");
        assert_eq!(to_compact(&source), "A#$c .5#B#$e#C");
    }

    #[test]
    fn test_question_source() {
        let options = FormatOptions::default();
        let raw = "#$q 101 null#Q?#$r 101 0 a1#Ans1#$r 101 0 a2#Ans2";
        let source = to_source(raw, &options);
        assert_eq!(
            source,
            "\n\t\t#$q 101 null#Q?\n\t\t\t#$r 101 0 a1#Ans1\n\t\t\t#$r 101 0 a2#Ans2\n\t"
        );
        assert_eq!(to_compact(&source), raw);
    }

    #[test]
    fn test_gender_source() {
        let options = FormatOptions::default();
        let source = to_source("Hi#there^friend", &options);
        assert_eq!(source, "\n\t\tHi\n\t\t\t#there\n\t\t\t^friend\n\t");
        assert_eq!(to_compact(&source), "Hi#there^friend");
    }

    #[test]
    fn test_gender_span_ends_at_break() {
        let options = FormatOptions::default();
        let source = to_source("Hi#Sir^Madam#$b#Bye", &options);
        assert_eq!(source, "\n\t\tHi\n\t\t\t#Sir\n\t\t\t^Madam\n\t\t#$b#Bye\n\t");
        assert_eq!(to_compact(&source), "Hi#Sir^Madam#$b#Bye");
    }

    #[test]
    fn test_normalize_whitespace_around_tokens() {
        assert_eq!(to_compact("Hi # there ^ friend"), to_compact("Hi#there  ^friend"));
        assert_eq!(to_compact("  Hello   world #$b# Bye "), "Hello world#$b#Bye");
    }
}
