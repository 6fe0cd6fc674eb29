//! ASCII-only pretty JSON.
//!
//! The registry index is committed to repositories and served from several
//! hosts; keeping it to 7-bit ASCII avoids any dependence on how those
//! handle encodings. [`AsciiFormatter`] lays documents out like
//! [`PrettyFormatter`] with a two-space indent, and writes every non-ASCII
//! character in a string as `\uXXXX` (a surrogate pair above U+FFFF).

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use std::io::{self, Write};

/// Pretty formatter that escapes all non-ASCII text.
#[derive(Debug)]
pub struct AsciiFormatter<'a> {
    pretty: PrettyFormatter<'a>,
}

impl Default for AsciiFormatter<'_> {
    fn default() -> Self {
        Self {
            pretty: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for AsciiFormatter<'_> {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn end_object_key<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_key(writer)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut ascii_start = 0;
        for (offset, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(fragment.as_bytes().get(ascii_start..offset).unwrap_or_default())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            ascii_start = offset + ch.len_utf8();
        }
        writer.write_all(fragment.as_bytes().get(ascii_start..).unwrap_or_default())
    }
}

/// Serialize `value` as ASCII-only pretty JSON ending in a newline.
///
/// # Errors
///
/// Returns the serializer's error if `value` cannot be represented as JSON.
///
/// # Examples
///
/// ```
/// use module_packager::registry::ascii::to_ascii_json;
/// use serde_json::json;
///
/// let bytes = to_ascii_json(&json!({"description": "résumé"})).expect("serialize");
/// assert_eq!(bytes, b"{\n  \"description\": \"r\\u00e9sum\\u00e9\"\n}\n");
/// ```
pub fn to_ascii_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, AsciiFormatter::default());
    value.serialize(&mut serializer)?;
    buffer.push(b'\n');
    Ok(buffer)
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on broken fixtures")]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn render(value: &Value) -> String {
        String::from_utf8(to_ascii_json(value).expect("serialize")).expect("UTF-8")
    }

    #[rstest]
    #[case::latin("é", "\"\\u00e9\"\n")]
    #[case::cjk("中文", "\"\\u4e2d\\u6587\"\n")]
    #[case::astral("😀", "\"\\ud83d\\ude00\"\n")]
    #[case::mixed("a→b", "\"a\\u2192b\"\n")]
    #[case::plain("plain", "\"plain\"\n")]
    fn escapes_non_ascii(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(render(&json!(input)), expected);
    }

    #[test]
    fn control_and_quote_escapes_are_untouched() {
        assert_eq!(render(&json!("a\"b\n")), "\"a\\\"b\\n\"\n");
    }

    #[test]
    fn layout_matches_two_space_pretty_printing() {
        let value = json!({"a": [1, 2], "b": {}, "c": [], "d": null});
        assert_eq!(
            render(&value),
            "{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": {},\n  \"c\": [],\n  \"d\": null\n}\n"
        );
    }

    #[test]
    fn output_is_pure_ascii_and_round_trips() {
        let value = json!({"名前": "モジュール", "emoji": "🚀"});
        let bytes = to_ascii_json(&value).expect("serialize");

        assert!(bytes.is_ascii());
        let back: Value = serde_json::from_slice(&bytes).expect("parse");
        assert_eq!(back, value);
    }
}
