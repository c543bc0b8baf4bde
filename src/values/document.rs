//! Layout-preserving values document
//!
//! Helm values files are hand-maintained and heavily commented, so the document
//! is kept as its original lines. Edits splice rendered YAML into the line list
//! and leave every other byte alone. A parsed [`Mapping`] of the same text is
//! kept alongside to answer type questions the line view cannot.
//!
//! Only block-style roots can be edited this way; [`ValuesDocument::from_text`]
//! returns `None` for anything else so the caller can fall back to a plain
//! mapping. Rendering re-parses the edited lines and falls back to serialising
//! the mapping when they no longer describe it.

use super::tree::ValuesTree;
use crate::error::MirrorError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};

/// A mapping key line: quoted or plain key, colon, optional inline value.
static KEY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<head>(?:"(?P<dq>[^"\\]*(?:\\.[^"\\]*)*)"|'(?P<sq>[^']*(?:''[^']*)*)'|(?P<plain>[^\s#'"{}\[\],&*!|>%@`?:-][^:#]*?))[ \t]*:)(?:[ \t]+(?P<rest>.*))?$"#,
    )
    .expect("valid regex")
});

/// `&name` anchor definitions.
static ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s\[{,])&([^\s\[\]{},]+)").expect("valid regex"));

/// `*name` alias references.
static ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s\[{,])\*([^\s\[\]{},]+)").expect("valid regex"));

const INDENT_STEP: usize = 2;
const BOM: char = '\u{feff}';

pub struct ValuesDocument {
    lines: Vec<String>,
    line_ending: &'static str,
    trailing_newline: bool,
    bom: bool,
    /// Cleared once an edit cannot be expressed on the lines; `render` then
    /// serialises `root` instead.
    layout_kept: bool,
    root: Mapping,
}

/// Parse `text` into its root mapping. An empty or comment-only file is an empty mapping.
pub fn parse_root(text: &str) -> Result<Mapping, MirrorError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    if !text.lines().any(is_content) {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(text)? {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(root) => Ok(root),
        _ => Err(MirrorError::NotAMapping { key: "(document root)".to_string() }),
    }
}

/// One `key: ...` line and the lines of its body.
#[derive(Debug, Clone, Copy)]
struct Entry {
    line: usize,
    /// One past the last body line.
    end: usize,
}

struct KeyLine<'a> {
    key: String,
    head: &'a str,
    rest: &'a str,
}

#[derive(Debug, PartialEq, Eq)]
enum InlineValue {
    /// Nothing after the colon: the body (if any) follows on indented lines.
    Block,
    /// `{}`, `~` or `null`.
    Empty,
    /// Anything else written on the key line itself.
    Inline,
}

impl ValuesDocument {
    /// Wrap `text` for editing, or `None` when its layout cannot be edited line by line.
    pub fn from_text(text: &str, root: Mapping) -> Option<Self> {
        let (bom, text) = match text.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let line_ending = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let lines: Vec<String> = text.lines().map(str::to_string).collect();

        let doc = Self {
            lines,
            line_ending,
            trailing_newline: text.ends_with('\n'),
            bom,
            layout_kept: true,
            root,
        };

        let first = doc.lines.iter().find(|l| is_content(l) && !is_document_marker(l));
        if let Some(first) = first {
            if indent_of(first) != 0 || parse_key_line(first).is_none() {
                return None;
            }
        }

        // Every top-level key must be found where the parser found it, or
        // edits could land next to a key the line scan missed.
        let all_located = doc.root.keys().filter_map(Value::as_str).all(|key| {
            doc.find_entry(0, doc.lines.len(), 0, key).is_some()
        });
        all_located.then_some(doc)
    }

    fn find_entry(&self, from: usize, to: usize, indent: usize, key: &str) -> Option<Entry> {
        (from..to)
            .find(|&i| {
                let line = &self.lines[i];
                is_content(line)
                    && indent_of(line) == indent
                    && parse_key_line(line).is_some_and(|kl| kl.key == key)
            })
            .map(|line| Entry { line, end: self.body_end(line, indent, to) })
    }

    /// Lines after `line` that are indented deeper (or are same-level `- ` items)
    /// belong to it, as do the continuation lines of a flow collection opened on
    /// it. Blank lines and shallower comments only count when something deeper
    /// follows them.
    fn body_end(&self, line: usize, indent: usize, limit: usize) -> usize {
        let mut last = self.flow_end(line, limit);
        for j in last + 1..limit {
            let current = &self.lines[j];
            let trimmed = current.trim();
            if trimmed.is_empty() {
                continue;
            }
            let depth = indent_of(current);
            if trimmed.starts_with('#') {
                if depth > indent {
                    last = j;
                }
                continue;
            }
            let sequence_item = depth == indent && (trimmed == "-" || trimmed.starts_with("- "));
            if depth <= indent && !sequence_item {
                break;
            }
            last = j;
        }
        last + 1
    }

    /// Line holding the bracket that closes a `{`/`[` opened on the key line at `line`.
    fn flow_end(&self, line: usize, limit: usize) -> usize {
        let Some(kl) = parse_key_line(&self.lines[line]) else {
            return line;
        };
        let value = strip_properties(kl.rest);
        if !(value.starts_with('{') || value.starts_with('[')) {
            return line;
        }

        let mut depth = flow_depth(value, 0);
        let mut end = line;
        while depth > 0 && end + 1 < limit {
            end += 1;
            depth = flow_depth(&self.lines[end], depth);
        }
        end
    }

    /// Indentation used by the children of `entry`, or one step deeper when it has none.
    fn child_indent(&self, entry: Entry, indent: usize) -> usize {
        self.lines[entry.line + 1..entry.end]
            .iter()
            .find(|l| is_content(l))
            .map(|l| indent_of(l))
            .unwrap_or(indent + INDENT_STEP)
    }

    fn inline_value(&self, entry: Entry) -> InlineValue {
        let Some(kl) = parse_key_line(&self.lines[entry.line]) else {
            return InlineValue::Inline;
        };
        let (value, _) = split_inline_comment(kl.rest);
        let value = strip_properties(value);
        match value {
            "" => InlineValue::Block,
            "{}" | "~" | "null" | "Null" | "NULL" => InlineValue::Empty,
            _ => InlineValue::Inline,
        }
    }

    fn splice(&mut self, at: usize, remove: usize, with: Vec<String>) {
        self.lines.splice(at..at + remove, with);
    }

    /// Add `key:` as a new last section, ahead of a closing `...` marker.
    fn append_section(&mut self, key: &str, field: &str, value: &Value) -> Result<(), MirrorError> {
        let mut block = vec![format!("{}:", render_key(key)?)];
        block.extend(render_field(field, value, INDENT_STEP)?);

        let at = self
            .lines
            .iter()
            .rposition(|l| is_content(l))
            .filter(|&i| self.lines[i].trim_end() == "...")
            .unwrap_or(self.lines.len());
        self.splice(at, 0, block);
        Ok(())
    }

    /// Whether removing `lines[from..to]` would leave an alias elsewhere without its anchor.
    fn drops_referenced_anchor(&self, from: usize, to: usize) -> bool {
        let anchors: Vec<&str> = self.lines[from..to]
            .iter()
            .filter(|l| is_content(l))
            .flat_map(|l| ANCHOR.captures_iter(l).filter_map(|c| c.get(1)).map(|m| m.as_str()))
            .collect();
        if anchors.is_empty() {
            return false;
        }

        self.lines
            .iter()
            .enumerate()
            .filter(|(i, l)| !(from..to).contains(i) && is_content(l))
            .any(|(_, l)| {
                ALIAS
                    .captures_iter(l)
                    .filter_map(|c| c.get(1))
                    .any(|m| anchors.contains(&m.as_str()))
            })
    }

    /// Stop editing lines; from here on `render` serialises the mapping.
    fn release_layout(&mut self, key: &str) {
        tracing::warn!(
            "'{key}' holds an anchor that is aliased elsewhere; values file will be re-serialised and comments dropped"
        );
        self.layout_kept = false;
    }

    fn render_lines(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push(BOM);
        }
        out.push_str(&self.lines.join(self.line_ending));
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(self.line_ending);
        }
        out
    }

    fn section_entry(&self, key: &str) -> Option<Entry> {
        self.find_entry(0, self.lines.len(), 0, key)
    }

    fn field_entry(&self, section: Entry, field: &str) -> Option<(Entry, usize)> {
        let indent = self.child_indent(section, 0);
        self.find_entry(section.line + 1, section.end, indent, field)
            .map(|entry| (entry, indent))
    }

    fn edit_lines(&mut self, key: &str, field: &str, value: &Value) -> Result<(), MirrorError> {
        let Some(section) = self.section_entry(key) else {
            return self.append_section(key, field, value);
        };

        match self.inline_value(section) {
            InlineValue::Block => {
                if let Some((existing, indent)) = self.field_entry(section, field) {
                    if self.drops_referenced_anchor(existing.line, existing.end) {
                        self.release_layout(key);
                        return Ok(());
                    }
                    let rendered = render_field(field, value, indent)?;
                    self.splice(existing.line, existing.end - existing.line, rendered);
                } else {
                    let indent = self.child_indent(section, 0);
                    let rendered = render_field(field, value, indent)?;
                    self.splice(section.end, 0, rendered);
                }
            }
            InlineValue::Empty => {
                if self.drops_referenced_anchor(section.line, section.line + 1) {
                    self.release_layout(key);
                    return Ok(());
                }
                let header = {
                    let line = &self.lines[section.line];
                    let kl = parse_key_line(line).ok_or_else(|| MirrorError::NotAMapping {
                        key: key.to_string(),
                    })?;
                    match split_inline_comment(kl.rest).1 {
                        Some(comment) => format!("{} {comment}", kl.head),
                        None => kl.head.to_string(),
                    }
                };
                let rendered = render_field(field, value, INDENT_STEP)?;
                self.lines[section.line] = header;
                self.splice(section.line + 1, 0, rendered);
            }
            InlineValue::Inline => {
                if self.drops_referenced_anchor(section.line, section.end) {
                    self.release_layout(key);
                    return Ok(());
                }
                // Flow mapping on the key line: rewrite just this section in block style.
                let mut section_map = match self.root.get(key) {
                    Some(Value::Mapping(m)) => m.clone(),
                    _ => Mapping::new(),
                };
                section_map.insert(Value::String(field.to_string()), value.clone());
                let mut block = vec![format!("{}:", render_key(key)?)];
                block.extend(indent_lines(&serde_yaml::to_string(&section_map)?, INDENT_STEP));
                tracing::debug!("Rewrote flow-style section '{key}' in block style");
                self.splice(section.line, section.end - section.line, block);
            }
        }
        Ok(())
    }
}

impl ValuesTree for ValuesDocument {
    fn set_field(&mut self, key: &str, field: &str, value: Value) -> Result<(), MirrorError> {
        match self.root.get(key) {
            None | Some(Value::Null) | Some(Value::Mapping(_)) => {}
            Some(_) => return Err(MirrorError::NotAMapping { key: key.to_string() }),
        }

        if self.layout_kept {
            self.edit_lines(key, field, &value)?;
            self.trailing_newline = true;
        }
        self.root.set_field(key, field, value)
    }

    fn annotate(&mut self, key: &str, field: &str, comment: &str) -> bool {
        if !self.layout_kept {
            return false;
        }
        let Some(section) = self.section_entry(key) else {
            return false;
        };
        if self.inline_value(section) != InlineValue::Block {
            return false;
        }
        let Some((entry, indent)) = self.field_entry(section, field) else {
            return false;
        };

        let text = format!("# {comment}");
        if entry.line > 0 && self.lines[entry.line - 1].trim() == text {
            return true;
        }
        self.splice(entry.line, 0, vec![format!("{}{text}", " ".repeat(indent))]);
        true
    }

    fn render(&self) -> Result<String, MirrorError> {
        if self.layout_kept {
            let text = self.render_lines();
            match parse_root(&text) {
                Ok(parsed) if parsed == self.root => return Ok(text),
                Ok(_) => tracing::warn!("Edited values file no longer matches its values; re-serialising it"),
                Err(err) => tracing::warn!("Edited values file does not parse ({err}); re-serialising it"),
            }
        }
        self.root.render()
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

fn is_document_marker(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed == "---" || trimmed == "..." || trimmed.starts_with('%')
}

fn parse_key_line(line: &str) -> Option<KeyLine<'_>> {
    let body = line[indent_of(line)..].trim_end();
    let caps = KEY_LINE.captures(body)?;
    let key = if let Some(dq) = caps.name("dq") {
        dq.as_str().replace("\\\"", "\"").replace("\\\\", "\\")
    } else if let Some(sq) = caps.name("sq") {
        sq.as_str().replace("''", "'")
    } else {
        caps.name("plain")?.as_str().trim_end().to_string()
    };
    let head = &line[..indent_of(line) + caps.name("head")?.end()];
    let rest = caps.name("rest").map_or("", |m| m.as_str());
    Some(KeyLine { key, head, rest })
}

/// Split `value # comment` into its value and comment parts.
fn split_inline_comment(rest: &str) -> (&str, Option<&str>) {
    if rest.starts_with('#') {
        return ("", Some(rest));
    }
    match rest.find(" #") {
        Some(pos) => (rest[..pos].trim(), Some(&rest[pos + 1..])),
        None => (rest.trim(), None),
    }
}

/// Open `{`/`[` count after scanning `text` from `depth`, skipping quoted
/// scalars and trailing comments.
fn flow_depth(text: &str, mut depth: usize) -> usize {
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some('"') if c == '\\' => {
                chars.next();
            }
            Some('\'') if c == '\'' && chars.peek() == Some(&'\'') => {
                chars.next();
            }
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' if prev.is_whitespace() || "{[,:".contains(prev) => quote = Some(c),
                '#' if prev.is_whitespace() => break,
                '{' | '[' => depth += 1,
                '}' | ']' => depth = depth.saturating_sub(1),
                _ => {}
            },
        }
        prev = c;
    }
    depth
}

/// Drop leading anchors and tags (`&name`, `!tag`) from an inline value.
fn strip_properties(mut value: &str) -> &str {
    while value.starts_with('&') || value.starts_with('!') {
        value = value.split_once(char::is_whitespace).map_or("", |(_, tail)| tail.trim_start());
    }
    value
}

fn render_key(key: &str) -> Result<String, MirrorError> {
    Ok(serde_yaml::to_string(&Value::String(key.to_string()))?.trim_end().to_string())
}

/// Render `field: value` at `indent`, nested collections in block style.
fn render_field(field: &str, value: &Value, indent: usize) -> Result<Vec<String>, MirrorError> {
    let pad = " ".repeat(indent);
    let key = render_key(field)?;

    let nested = match value {
        Value::Mapping(m) => !m.is_empty(),
        Value::Sequence(s) => !s.is_empty(),
        _ => false,
    };
    let rendered = serde_yaml::to_string(value)?;

    if nested {
        let mut out = vec![format!("{pad}{key}:")];
        out.extend(indent_lines(&rendered, indent + INDENT_STEP));
        return Ok(out);
    }

    let mut scalar = rendered.lines();
    let first = scalar.next().unwrap_or("");
    let mut out = vec![format!("{pad}{key}: {first}")];
    out.extend(scalar.map(|l| if l.is_empty() { String::new() } else { format!("{pad}{l}") }));
    Ok(out)
}

fn indent_lines(text: &str, indent: usize) -> Vec<String> {
    let pad = " ".repeat(indent);
    text.lines().map(|l| if l.is_empty() { String::new() } else { format!("{pad}{l}") }).collect()
}
