// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! JSON with full-line `//` comments
//!
//! Reading strips comment lines before handing the text to `serde_json`.
//! Writing pretty-prints with four-space indentation and can place a
//! description comment above any object key.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// Remove every line whose first non-blank characters are `//`
///
/// Line breaks are kept so parse errors still point at the right line.
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim_start().starts_with("//") {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize with four-space indentation
pub fn to_pretty_string<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Insert `// ...` lines above object keys
///
/// `describe` receives each key together with the raw line it sits on and
/// returns the comment text, if any. Multi-line descriptions become several
/// comment lines at the key's indentation.
pub fn annotate<F>(json: &str, mut describe: F) -> String
where
    F: FnMut(&str, &str) -> Option<&'static str>,
{
    let mut out = Vec::new();

    for line in json.lines() {
        if let Some(key) = object_key(line) {
            if let Some(description) = describe(key, line) {
                let indent = &line[..line.len() - line.trim_start().len()];
                for comment in description.lines() {
                    out.push(format!("{}// {}", indent, comment));
                }
            }
        }
        out.push(line.to_string());
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// The key of a `"key": value` line
fn object_key(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('"')?;
    let end = rest.find("\":")?;
    Some(&rest[..end])
}
