//! Line-oriented INI loader.
//!
//! Each non-empty line is either a section header (`[name]`) or a key/value
//! pair (`key=value`, `key = value`). Values are coerced bool → integer →
//! string. Key/value pairs before the first header land at the root of the
//! returned table; every section becomes a nested table under its name.
//!
//! ```text
//! a=1            {a = 1,
//! [sec]    →      sec = {b = "two"}}
//! b = two
//! ```

use std::io::Read;
use std::path::Path;

use toml::{Table, Value};
use tracing::warn;

use crate::error::InifigError;

const UTF8_BOM: &str = "\u{feff}";

/// One classified line of input.
#[derive(Debug, PartialEq)]
enum Line<'a> {
    Section(&'a str),
    KeyValue { key: &'a str, value: &'a str },
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `name` can be written as a section or key name.
pub(crate) fn is_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_word)
}

/// Strip at most one leading whitespace character.
fn strip_one_space(s: &str) -> &str {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() => chars.as_str(),
        _ => s,
    }
}

/// Classify a line as a section header or key/value pair.
///
/// Both forms are anchored to the start of the line: a header must begin
/// with `[`, a pair with its key. Anything after a header's `]` is ignored.
fn classify(line: &str) -> Option<Line<'_>> {
    if let Some(rest) = line.strip_prefix('[') {
        let end = rest.find(|c: char| !is_word(c)).unwrap_or(rest.len());
        return rest[end..]
            .starts_with(']')
            .then(|| Line::Section(&rest[..end]));
    }

    let key_end = line.find(|c: char| !is_word(c)).unwrap_or(line.len());
    if key_end == 0 {
        return None;
    }
    let (key, rest) = line.split_at(key_end);
    let rest = strip_one_space(rest).strip_prefix('=')?;
    Some(Line::KeyValue {
        key,
        value: strip_one_space(rest),
    })
}

/// Coerce a raw value: bool (case-insensitive) → integer → string.
fn coerce(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(i) = raw.trim().parse::<i64>() {
        return Value::Integer(i);
    }
    Value::String(raw.to_string())
}

/// Move the accumulated pairs into `target`, later keys overwriting earlier ones.
fn drain_into(pending: &mut Vec<(String, Value)>, target: &mut Table) {
    for (key, value) in pending.drain(..) {
        target.insert(key, value);
    }
}

/// Parse a sequence of lines into a nested table.
///
/// Fails on the first line that is neither a header nor a key/value pair,
/// reporting its 1-based line number. Empty lines are skipped but still
/// counted.
pub fn parse_lines<I, S>(lines: I) -> Result<Table, InifigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut root = Table::new();
    let mut sections: Vec<(String, Table)> = Vec::new();
    let mut pending: Vec<(String, Value)> = Vec::new();
    let mut current: Option<String> = None;

    for (i, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        if line.is_empty() {
            continue;
        }

        match classify(line) {
            Some(Line::KeyValue { key, value }) => {
                pending.push((key.to_string(), coerce(value)));
            }
            Some(Line::Section(name)) => {
                match current.take() {
                    Some(previous) => {
                        let mut table = Table::new();
                        drain_into(&mut pending, &mut table);
                        sections.push((previous, table));
                    }
                    None => drain_into(&mut pending, &mut root),
                }
                current = Some(name.to_string());
            }
            None => {
                return Err(InifigError::IniParse {
                    line: i + 1,
                    content: line.to_string(),
                });
            }
        }
    }

    match current {
        Some(last) => {
            let mut table = Table::new();
            drain_into(&mut pending, &mut table);
            sections.push((last, table));
        }
        None => drain_into(&mut pending, &mut root),
    }

    for (name, table) in sections {
        if matches!(root.get(&name), Some(Value::Table(_))) {
            warn!(section = %name, "section declared more than once; keeping the last one");
        }
        root.insert(name, Value::Table(table));
    }

    Ok(root)
}

/// Parse INI text. Line terminators (`\n`, `\r\n`) are removed.
pub fn parse_str(content: &str) -> Result<Table, InifigError> {
    parse_lines(content.lines())
}

/// Decode raw input bytes as UTF-8, dropping a leading byte-order mark.
pub fn decode_input(bytes: Vec<u8>) -> Result<String, InifigError> {
    let text = String::from_utf8(bytes)?;
    Ok(match text.strip_prefix(UTF8_BOM) {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// Read an entire source up front, decode it, and parse it.
pub fn load<R: Read>(mut reader: R) -> Result<Table, InifigError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| InifigError::Io {
            path: "<reader>".into(),
            source: e,
        })?;
    parse_str(&decode_input(bytes)?)
}

/// Load and parse the INI file at `path`.
pub fn load_file(path: &Path) -> Result<Table, InifigError> {
    let bytes = std::fs::read(path).map_err(|e| InifigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_str(&decode_input(bytes)?)
}

/// Render a table back into INI text that [`parse_str`] reads back.
///
/// Root scalars come first, then one `[section]` block per nested table.
pub fn to_ini_string(table: &Table) -> String {
    let mut out = String::new();
    for (key, value) in table {
        if !value.is_table() {
            out.push_str(&format!("{key} = {}\n", format_value(value)));
        }
    }
    for (name, value) in table {
        if let Value::Table(section) = value {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{name}]\n"));
            for (key, value) in section {
                out.push_str(&format!("{key} = {}\n", format_value(value)));
            }
        }
    }
    out
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_bool() {
        let t = parse_lines(["key=true"]).unwrap();
        assert_eq!(t["key"], Value::Boolean(true));
    }

    #[test]
    fn coerces_bool_case_insensitive() {
        let t = parse_lines(["a=FALSE", "b=True"]).unwrap();
        assert_eq!(t["a"], Value::Boolean(false));
        assert_eq!(t["b"], Value::Boolean(true));
    }

    #[test]
    fn coerces_integer() {
        let t = parse_lines(["key=42", "neg=-7"]).unwrap();
        assert_eq!(t["key"], Value::Integer(42));
        assert_eq!(t["neg"], Value::Integer(-7));
    }

    #[test]
    fn keeps_string() {
        let t = parse_lines(["key=hello"]).unwrap();
        assert_eq!(t["key"], Value::String("hello".into()));
    }

    #[test]
    fn overflowing_integer_stays_string() {
        let t = parse_lines(["big=99999999999999999999"]).unwrap();
        assert_eq!(t["big"], Value::String("99999999999999999999".into()));
    }

    #[test]
    fn empty_value_is_empty_string() {
        let t = parse_lines(["key="]).unwrap();
        assert_eq!(t["key"], Value::String(String::new()));
    }

    #[test]
    fn single_space_around_equals_is_stripped() {
        let t = parse_lines(["key = value with spaces"]).unwrap();
        assert_eq!(t["key"], Value::String("value with spaces".into()));
    }

    #[test]
    fn only_one_leading_value_space_is_stripped() {
        let t = parse_lines(["key=  padded"]).unwrap();
        assert_eq!(t["key"], Value::String(" padded".into()));
    }

    #[test]
    fn value_may_contain_equals() {
        let t = parse_lines(["expr=a=b"]).unwrap();
        assert_eq!(t["expr"], Value::String("a=b".into()));
    }

    #[test]
    fn section_accumulation() {
        let t = parse_lines(["a=1", "[sec]", "b=2"]).unwrap();
        assert_eq!(t["a"], Value::Integer(1));
        let sec = t["sec"].as_table().unwrap();
        assert_eq!(sec["b"], Value::Integer(2));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn multiple_sections() {
        let t = parse_lines(["[one]", "x=1", "[two]", "y=2", "z=3"]).unwrap();
        assert_eq!(t["one"]["x"], Value::Integer(1));
        assert_eq!(t["two"]["y"], Value::Integer(2));
        assert_eq!(t["two"]["z"], Value::Integer(3));
    }

    #[test]
    fn empty_section_is_empty_table() {
        let t = parse_lines(["[empty]", "[full]", "k=v"]).unwrap();
        assert!(t["empty"].as_table().unwrap().is_empty());
        assert_eq!(t["full"]["k"], Value::String("v".into()));
    }

    #[test]
    fn empty_lines_ignored() {
        let t = parse_lines(["", "a=1", ""]).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t["a"], Value::Integer(1));
    }

    #[test]
    fn malformed_line_reports_line_one() {
        let err = parse_lines(["not a valid line"]).unwrap_err();
        match err {
            InifigError::IniParse { line, content } => {
                assert_eq!(line, 1);
                assert_eq!(content, "not a valid line");
            }
            other => panic!("Expected IniParse, got: {other:?}"),
        }
    }

    #[test]
    fn line_numbers_count_empty_lines() {
        let err = parse_lines(["a=1", "", "  b=2"]).unwrap_err();
        match err {
            InifigError::IniParse { line, .. } => assert_eq!(line, 3),
            other => panic!("Expected IniParse, got: {other:?}"),
        }
    }

    #[test]
    fn header_must_start_the_line() {
        assert!(parse_lines([" [sec]"]).is_err());
        assert!(parse_lines(["[se c]"]).is_err());
    }

    #[test]
    fn two_spaces_before_equals_rejected() {
        assert!(parse_lines(["key  =1"]).is_err());
    }

    #[test]
    fn comment_lines_are_rejected() {
        assert!(parse_lines(["; comment"]).is_err());
        assert!(parse_lines(["# comment"]).is_err());
    }

    #[test]
    fn duplicate_key_last_wins() {
        let t = parse_lines(["a=1", "a=2"]).unwrap();
        assert_eq!(t["a"], Value::Integer(2));
    }

    #[test]
    fn repeated_section_replaces_earlier_one() {
        let t = parse_lines(["[s]", "a=1", "[t]", "c=3", "[s]", "b=2"]).unwrap();
        let s = t["s"].as_table().unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s["b"], Value::Integer(2));
    }

    #[test]
    fn section_overrides_root_key_of_same_name() {
        let t = parse_lines(["sec=1", "[sec]", "x=2"]).unwrap();
        assert!(t["sec"].is_table());
    }

    #[test]
    fn unicode_word_characters() {
        let t = parse_lines(["[général]", "clé=valeur"]).unwrap();
        assert_eq!(t["général"]["clé"], Value::String("valeur".into()));
    }

    #[test]
    fn deterministic() {
        let lines = ["a=1", "[x]", "b=true", "c=str"];
        assert_eq!(parse_lines(lines).unwrap(), parse_lines(lines).unwrap());
    }

    #[test]
    fn parse_str_handles_crlf() {
        let t = parse_str("a=1\r\n[s]\r\nb=2\r\n").unwrap();
        assert_eq!(t["a"], Value::Integer(1));
        assert_eq!(t["s"]["b"], Value::Integer(2));
    }

    #[test]
    fn load_from_bytes_strips_bom() {
        let bytes = b"\xEF\xBB\xBFa=1\n".to_vec();
        let t = load(bytes.as_slice()).unwrap();
        assert_eq!(t["a"], Value::Integer(1));
    }

    #[test]
    fn invalid_utf8_is_decode_error() {
        let bytes: &[u8] = &[b'a', b'=', 0xFF, 0xFE];
        let err = load(bytes).unwrap_err();
        assert!(matches!(err, InifigError::Decode(_)));
    }

    #[test]
    fn load_file_missing_reports_path() {
        let err = load_file(Path::new("/nonexistent/dir/app.ini")).unwrap_err();
        match err {
            InifigError::Io { path, .. } => assert!(path.ends_with("app.ini")),
            other => panic!("Expected Io, got: {other:?}"),
        }
    }

    #[test]
    fn rendered_text_parses_back() {
        let original = parse_lines(["name=demo", "[window]", "width=800", "max=false"]).unwrap();
        let text = to_ini_string(&original);
        assert_eq!(parse_str(&text).unwrap(), original);
    }

    #[test]
    fn rendered_text_puts_root_keys_first() {
        let mut table = Table::new();
        let mut sec = Table::new();
        sec.insert("b".into(), Value::Integer(2));
        table.insert("aaa".into(), Value::Table(sec));
        table.insert("zzz".into(), Value::Integer(1));
        assert_eq!(to_ini_string(&table), "zzz = 1\n\n[aaa]\nb = 2\n");
    }
}
