use super::*;
use pretty_assertions::assert_eq;

/// 覆盖各类控制符的规范紧凑字符串
fn canonical_samples() -> Vec<(StrFormat, &'static str)> {
    vec![
        (StrFormat::Plain, "Iron Sword"),
        (StrFormat::Plain, "line one\nline two"),
        (StrFormat::Dialogue, "Hello.#$b#How are you?#$e#Bye."),
        (StrFormat::Dialogue, "A#$c .5#B#$e#C"),
        (StrFormat::Dialogue, "#$q 101 null#Q?#$r 101 0 a1#Ans1#$r 101 0 a2#Ans2"),
        (StrFormat::Dialogue, "Hi#there^friend"),
        (StrFormat::Dialogue, "你好$h#$b#再见$s"),
        (StrFormat::Events, r#"none/-1000 -1000/farmer 5 7 0 Abigail 6 7 2/speak Abigail "Hi#$b#Bye"/pause 500/end"#),
        (StrFormat::Events, r#"speak Abigail "Hi"/speak Sam "Yo^Hey""#),
        (StrFormat::Events, r#"speak Abigail "Hi" true/end"#),
        (StrFormat::Events, r#"a/"x""#),
    ]
}

#[test]
fn test_from_target() {
    assert_eq!(StrFormat::from_target("Characters/Dialogue/Abigail"), StrFormat::Dialogue);
    assert_eq!(StrFormat::from_target("data/EVENTS/Town"), StrFormat::Events);
    assert_eq!(StrFormat::from_target("Data/ObjectInformation"), StrFormat::Plain);
}

#[test]
fn test_factory_defaults_to_plain() {
    assert_eq!(StrFormat::from_name("dialogue"), StrFormat::Dialogue);
    assert_eq!(StrFormat::from_name("Events"), StrFormat::Events);
    assert_eq!(StrFormat::from_name("mail"), StrFormat::Plain);

    let s = FormattedString::for_format(None, Some("  keep   spaces "));
    assert_eq!(s.format(), StrFormat::Plain);
    assert_eq!(s.as_str(), "  keep   spaces ");

    let d = FormattedString::for_format(Some(StrFormat::Dialogue), Some("  a   #$b#  b "));
    assert_eq!(d.as_str(), "a#$b#b");
}

#[test]
fn test_compact_is_idempotent_over_source() {
    let options = FormatOptions::default();
    for (format, text) in canonical_samples() {
        let source = format.to_source(text, &options).unwrap();
        assert_eq!(format.to_compact(&source).unwrap(), text, "{:?}", format);
    }
}

#[test]
fn test_source_is_stable() {
    let options = FormatOptions::new(Indent::Spaces(4), 1);
    for (format, text) in canonical_samples() {
        let source = format.to_source(text, &options).unwrap();
        let again = format.to_source(&format.to_compact(&source).unwrap(), &options).unwrap();
        assert_eq!(again, source, "{:?}", format);
    }
}

#[test]
fn test_gender_branch_lines() {
    let s = FormattedString::new(StrFormat::Dialogue, "Hi#there^friend");
    let source = s.to_source().unwrap();
    let lines: Vec<&str> = source.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines, vec!["\t\tHi", "\t\t\t#there", "\t\t\t^friend"]);

    let back = FormattedString::from_source(StrFormat::Dialogue, &source, FormatOptions::default()).unwrap();
    assert_eq!(back.as_str(), "Hi#there^friend");
}

#[test]
fn test_repeat_macro_in_source() {
    let s = FormattedString::from_source(StrFormat::Events, "{{ab}*3}", FormatOptions::default()).unwrap();
    assert_eq!(s.as_str(), "ababab");
}

#[test]
fn test_odd_quotes_fail_before_output() {
    let mut s = FormattedString::new(StrFormat::Events, "speak Abigail \"Hi\"");
    assert!(matches!(s.set_source("speak Abigail \"Hi"), Err(CpError::OddQuotes(_))));
    assert_eq!(s.as_str(), "speak Abigail \"Hi\"");

    s.set_str("speak Abigail \"Hi");
    assert!(s.to_source().is_err());
}

#[test]
fn test_edit_source_then_compact() {
    let source = "
        speak Abigail
            \"Hello   there!
            #$b#How are you?\"
        {{move farmer 0 1 0
        }*2}
        end
    ";
    let s = FormattedString::from_source(StrFormat::Events, source, FormatOptions::default()).unwrap();
    assert_eq!(
        s.as_str(),
        "speak Abigail \"Hello there!#$b#How are you?\"/move farmer 0 1 0/move farmer 0 1 0/end"
    );
}
