//! 字典与字符串映射文件
//!
//! 字典为 键 → 文本 的有序映射。提取时键为标识符，翻译时键为原文。
//! 文件格式为扁平 JSON 对象，读取时支持指定编码并去除BOM，允许注释与尾随逗号。
//! 源码表另有 XML 形式：`<entries><entry id="键">值</entry></entries>`。

use crate::utils::{decode_bytes, CpError};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::path::Path;

/// 字典：标识符（或原文）→ 文本
pub type Dictionary = IndexMap<String, String>;

/// 解析扁平的字符串映射
pub fn parse_string_map(text: &str) -> Result<Dictionary, CpError> {
    Ok(json5::from_str(text)?)
}

/// 解析 JSON 文档（允许注释与尾随逗号，保持键顺序）
pub fn parse_document(text: &str) -> Result<Value, CpError> {
    Ok(json5::from_str(text)?)
}

/// 读取扁平的字符串映射文件
///
/// # 参数
/// * `path` - 文件路径
/// * `encoding` - 编码标签，默认 utf-8
pub fn read_string_map(path: &Path, encoding: Option<&str>) -> Result<Dictionary, CpError> {
    let bytes = std::fs::read(path)?;
    let text = decode_bytes(&bytes, encoding)?;
    parse_string_map(&text)
}

/// 写入扁平的字符串映射文件
pub fn write_string_map(path: &Path, map: &Dictionary, pretty: bool) -> Result<(), CpError> {
    write_json(path, map, pretty)
}

/// 读取 JSON 文档
pub fn read_document(path: &Path, encoding: Option<&str>) -> Result<Value, CpError> {
    let bytes = std::fs::read(path)?;
    let text = decode_bytes(&bytes, encoding)?;
    parse_document(&text)
}

/// 以制表符缩进写入 JSON 文档
pub fn write_document(path: &Path, document: &Value) -> Result<(), CpError> {
    write_json(path, document, true)
}

/// 写入 JSON 文件（确保父目录存在）
///
/// `pretty` 为真时以制表符缩进
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<(), CpError> {
    ensure_parent(path)?;

    let data = if pretty {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        value.serialize(&mut serializer)?;
        buffer
    } else {
        serde_json::to_vec(value)?
    };

    std::fs::write(path, data)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), CpError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// 解析 XML 条目表
///
/// 忽略注释，条目文本保留原有的换行与缩进
pub fn parse_entries_xml(text: &str) -> Result<Dictionary, CpError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(false);

    let mut entries = Dictionary::new();
    let mut current: Option<(String, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"entry" => {
                current = Some((entry_id(&e)?, String::new()));
            }
            Event::Empty(e) if e.name().as_ref() == b"entry" => {
                entries.insert(entry_id(&e)?, String::new());
            }
            Event::Text(e) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) if e.name().as_ref() == b"entry" => {
                if let Some((id, value)) = current.take() {
                    entries.insert(id, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

fn entry_id(start: &BytesStart<'_>) -> Result<String, CpError> {
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"id" {
            return Ok(attr.unescape_value()?.into_owned());
        }
    }
    Err(CpError::MalformedEntries(format!(
        "<entry> without id: {}",
        String::from_utf8_lossy(start.name().as_ref())
    )))
}

/// 文本内容只需转义 `&` 与 `<`，引号保持原样
fn escape_text(text: &str) -> Cow<'_, str> {
    if text.contains('&') || text.contains('<') {
        Cow::Owned(text.replace('&', "&amp;").replace('<', "&lt;"))
    } else {
        Cow::Borrowed(text)
    }
}

/// 生成 XML 条目表（制表符缩进，空值写为自闭合标签）
pub fn entries_to_xml(map: &Dictionary) -> Result<String, CpError> {
    let mut output = Vec::new();
    let mut writer = Writer::new_with_indent(&mut output, b'\t', 1);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("entries")))?;

    for (key, value) in map {
        let mut entry = BytesStart::new("entry");
        entry.push_attribute(("id", key.as_str()));
        if value.is_empty() {
            writer.write_event(Event::Empty(entry))?;
        } else {
            writer.write_event(Event::Start(entry))?;
            writer.write_event(Event::Text(BytesText::from_escaped(escape_text(value))))?;
            writer.write_event(Event::End(BytesEnd::new("entry")))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("entries")))?;

    let mut xml = String::from_utf8(output).map_err(|e| CpError::MalformedEntries(e.to_string()))?;
    xml.push('\n');
    Ok(xml)
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// 读取源码表文件，`.xml` 按 XML 条目表解析，其余按字符串映射解析
pub fn read_entries_file(path: &Path, encoding: Option<&str>) -> Result<Dictionary, CpError> {
    if !is_xml(path) {
        return read_string_map(path, encoding);
    }
    let bytes = std::fs::read(path)?;
    let text = decode_bytes(&bytes, encoding)?;
    parse_entries_xml(&text)
}

/// 写入源码表文件，格式由扩展名决定
pub fn write_entries_file(path: &Path, map: &Dictionary) -> Result<(), CpError> {
    if !is_xml(path) {
        return write_string_map(path, map, true);
    }
    ensure_parent(path)?;
    std::fs::write(path, entries_to_xml(map)?)?;
    Ok(())
}

/// 按字典顺序替换文本中出现的每个键（纯子串替换），空键跳过
pub fn replace_all(text: &str, dictionary: &Dictionary) -> String {
    let mut result = text.to_string();
    for (origin, translated) in dictionary {
        if origin.is_empty() {
            continue;
        }
        if result.contains(origin.as_str()) {
            result = result.replace(origin.as_str(), translated);
        }
    }
    result
}

/// 配对两个语言版本提取出的字典，生成 原文 → 译文 的翻译字典
///
/// 只保留两侧都存在且非空的标识符
pub fn pair_dictionaries(source: &Dictionary, target: &Dictionary) -> Dictionary {
    let mut paired = Dictionary::new();
    for (id, original) in source {
        if original.is_empty() {
            continue;
        }
        if let Some(translated) = target.get(id).filter(|t| !t.is_empty()) {
            paired.insert(original.clone(), translated.clone());
        }
    }
    paired
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dict(pairs: &[(&str, &str)]) -> Dictionary {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_read_string_map_with_bom() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dialogue.json");
        std::fs::write(&path, "\u{feff}{\"key\":\"value\",\"b\":\"2\"}").unwrap();

        let map = read_string_map(&path, None).unwrap();
        assert_eq!(map, dict(&[("key", "value"), ("b", "2")]));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["key", "b"]);
    }

    #[test]
    fn test_read_string_map_rejects_nested_values() {
        assert!(parse_string_map("{\"key\":{\"nested\":1}}").is_err());
    }

    #[test]
    fn test_write_and_read_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("dict.json");
        let map = dict(&[("Hello", "你好"), ("Bye", "再见")]);

        write_string_map(&path, &map, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"Hello\":\"你好\",\"Bye\":\"再见\"}");

        write_string_map(&path, &map, true).unwrap();
        assert_eq!(read_string_map(&path, None).unwrap(), map);
    }

    #[test]
    fn test_parse_with_comments_and_trailing_commas() {
        let text = "{\n  // 注释\n  \"b\": \"2\", /* 块注释 */\n  \"a\": \"1\",\n}";
        let map = parse_string_map(text).unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);

        let document = parse_document("{\"Format\": \"1.19.0\", // 版本\n \"Changes\": [{\"Action\": \"Load\", \"Day\": 3,},],}")
            .unwrap();
        assert_eq!(
            serde_json::to_string(&document).unwrap(),
            "{\"Format\":\"1.19.0\",\"Changes\":[{\"Action\":\"Load\",\"Day\":3}]}"
        );
    }

    #[test]
    fn test_parse_entries_xml() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- 源码表 -->
<entries>
    <entry id="Mon">Hi &amp; bye</entry>
    <!-- <entry id="Skipped">x</entry> -->
    <entry id="Tue"/>
    <entry id="100/f Abigail 500">speak Abigail "Hi"</entry>
</entries>"#;
        let map = parse_entries_xml(xml).unwrap();
        assert_eq!(
            map,
            dict(&[("Mon", "Hi & bye"), ("Tue", ""), ("100/f Abigail 500", "speak Abigail \"Hi\"")])
        );

        assert!(matches!(
            parse_entries_xml("<entries><entry>x</entry></entries>"),
            Err(CpError::MalformedEntries(_))
        ));
    }

    #[test]
    fn test_entries_file_keeps_source_layout() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("src").join("1.xml");
        let map = dict(&[
            ("Mon", "\n\t\tHi\n\t\t#$b#Bye <3\n\t"),
            ("Tue", ""),
            ("Wed", "speak \"a & b\""),
        ]);

        write_entries_file(&path, &map).unwrap();
        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains("<entry id=\"Tue\"/>"));
        assert!(xml.contains("speak \"a &amp; b\""));
        assert_eq!(read_entries_file(&path, None).unwrap(), map);

        let json_path = temp_dir.path().join("src").join("1.json");
        write_entries_file(&json_path, &map).unwrap();
        assert_eq!(read_entries_file(&json_path, None).unwrap(), map);
    }

    #[test]
    fn test_replace_all() {
        let d = dict(&[("Abigail", "阿比盖尔"), ("", "x"), ("Sam", "山姆")]);
        assert_eq!(replace_all("Abigail and Sam, Abigail", &d), "阿比盖尔 and 山姆, 阿比盖尔");
        assert_eq!(replace_all("nobody", &d), "nobody");
    }

    #[test]
    fn test_pair_dictionaries() {
        let en = dict(&[("id1", "Hello"), ("id2", "Bye"), ("id3", "Only english")]);
        let zh = dict(&[("id1", "你好"), ("id2", ""), ("id4", "多余")]);
        assert_eq!(pair_dictionaries(&en, &zh), dict(&[("Hello", "你好")]));
    }
}
