use thiserror::Error;
use std::path::PathBuf;

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum CpError {
    #[error("Odd number of quotes in event script: {0}")]
    OddQuotes(String),

    #[error("Invalid change entry: {0}")]
    InvalidChange(String),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Failed to process external file {path:?}: {source}")]
    ExternalFile {
        path: PathBuf,
        #[source]
        source: Box<CpError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("JSON syntax error: {0}")]
    Json5Error(#[from] json5::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Malformed entries file: {0}")]
    MalformedEntries(String),
}

impl CpError {
    /// 为外部文件错误附加路径信息
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        CpError::ExternalFile {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

/// 返回无BOM头的字符串
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// 按编码标签解码字节（默认 utf-8），并去除BOM
///
/// 标签遵循 WHATWG 规范，如 "utf-8"、"gbk"、"shift_jis"
pub fn decode_bytes(bytes: &[u8], encoding: Option<&str>) -> Result<String, CpError> {
    let label = encoding.unwrap_or("utf-8");
    let encoding = encoding_rs::Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| CpError::UnsupportedEncoding(label.to_string()))?;

    let (text, _, _) = encoding.decode(bytes);
    Ok(strip_bom(&text).to_string())
}

/// 以SMAPI风格（"/"分隔）拼接资源路径，忽略空段
pub fn join_for_smapi(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// 生成翻译后的兄弟文件名：`dir/name.ext` → `dir/name-translated.ext`
///
/// 目录部分保持 SMAPI 风格的 "/" 分隔
pub fn translated_file_name(file: &str) -> String {
    let (dir, name) = match file.rfind(|c: char| c == '/' || c == '\\') {
        Some(pos) => (&file[..pos], &file[pos + 1..]),
        None => ("", file),
    };
    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };
    let renamed = format!("{}{}{}", stem, crate::TRANSLATED_SUFFIX, ext);
    join_for_smapi(&[dir, &renamed])
}

/// 检查文本是否包含中日韩统一表意文字
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4E00}'..='\u{9FFF}').contains(&c))
}

/// 截断长文本，用于日志输出
pub fn preview(text: &str) -> String {
    if text.chars().count() > 50 {
        format!("{}...", text.chars().take(50).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom("\u{feff}{\"key\":\"value\"}"), "{\"key\":\"value\"}");
        assert_eq!(strip_bom("plain"), "plain");
    }

    #[test]
    fn test_decode_bytes() {
        let bytes = b"\xEF\xBB\xBFhello";
        assert_eq!(decode_bytes(bytes, None).unwrap(), "hello");

        // GBK 编码的 "你好"
        let gbk = [0xC4, 0xE3, 0xBA, 0xC3];
        assert_eq!(decode_bytes(&gbk, Some("gbk")).unwrap(), "你好");

        assert!(matches!(
            decode_bytes(b"x", Some("no-such-encoding")),
            Err(CpError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_join_for_smapi() {
        assert_eq!(join_for_smapi(&["Characters", "Dialogue", "Abigail"]), "Characters/Dialogue/Abigail");
        assert_eq!(join_for_smapi(&["", "dialogue.json"]), "dialogue.json");
    }

    #[test]
    fn test_translated_file_name() {
        assert_eq!(translated_file_name("assets/dialogue.json"), "assets/dialogue-translated.json");
        assert_eq!(translated_file_name("dialogue.json"), "dialogue-translated.json");
        assert_eq!(translated_file_name("assets\\lines"), "assets/lines-translated");
        assert_eq!(translated_file_name(".hidden"), ".hidden-translated");
    }

    #[test]
    fn test_contains_cjk() {
        assert!(contains_cjk("你好，Abigail"));
        assert!(!contains_cjk("Hello there"));
        assert!(!contains_cjk("こんにちは"));
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short"), "short");
        let long = "字".repeat(60);
        assert_eq!(preview(&long), format!("{}...", "字".repeat(50)));
    }
}
