//! Form `content` bodies for write requests.
//!
//! Values are written as `Key: value`; extra lines of a multi-line value
//! are indented past the key so the service reads them back as
//! continuations.

/// Render `(name, value)` pairs as a form body.
pub fn render_form<K, V>(fields: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut lines = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        let name = name.as_ref();
        let indent = " ".repeat(name.chars().count() + 2);
        let mut parts = value.as_ref().split('\n');
        let first = parts.next().unwrap_or("");
        lines.push(format!("{name}: {first}"));
        for part in parts {
            lines.push(format!("{indent}{part}"));
        }
    }
    lines.join("\n")
}
