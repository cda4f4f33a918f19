//! Textual representation of a [`ConfigTree`].
//!
//! ```text
//! #comment attached to Section
//! Section
//! {
//!   Option = value
//! }
//! ```
//! Values and comments are single-line; `\`, newline and carriage return
//! are escaped so `parse(serialize(t)) == t` for every tree.

use super::validate_name;
use super::ConfigOption;
use super::ConfigTree;
use super::Section;
use crate::TreeError;

const INDENT: &str = "  ";

impl ConfigTree {
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        write_section_body(&mut out, self.root(), 0);
        out
    }

    pub fn parse(text: &str) -> Result<Self, TreeError> {
        let mut stack: Vec<Section> = vec![Section::default()];
        let mut pending_comment: Option<String> = None;
        let mut pending_section: Option<(String, String, usize)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw).trim_start();
            if line.trim().is_empty() {
                continue;
            }

            if let Some(text) = line.strip_prefix('#') {
                let text = unescape(text);
                pending_comment = Some(match pending_comment.take() {
                    Some(mut acc) => {
                        acc.push('\n');
                        acc.push_str(&text);
                        acc
                    }
                    None => text,
                });
                continue;
            }

            if let Some((name, _, opened_at)) = &pending_section {
                if line.trim() != "{" {
                    return Err(TreeError::Parse {
                        line: line_no,
                        reason: format!("expected '{{' after section {} (line {})", name, opened_at),
                    });
                }
                let (name, comment, _) = pending_section.take().unwrap_or_default();
                let mut section = Section::new(name);
                section.comment = comment;
                stack.push(section);
                continue;
            }

            match line.trim() {
                "{" => {
                    return Err(TreeError::Parse {
                        line: line_no,
                        reason: "'{' without section name".to_string(),
                    })
                }
                "}" => {
                    if stack.len() < 2 {
                        return Err(TreeError::Parse {
                            line: line_no,
                            reason: "unbalanced '}'".to_string(),
                        });
                    }
                    pending_comment = None;
                    if let (Some(closed), Some(parent)) = (stack.pop(), stack.last_mut()) {
                        if parent.contains(&closed.name) {
                            return Err(duplicate(line_no, &closed.name));
                        }
                        parent.sections.push(closed);
                    }
                    continue;
                }
                _ => {}
            }

            let comment = pending_comment.take().unwrap_or_default();
            match line.split_once('=') {
                Some((name, rest)) => {
                    let name = name.trim();
                    validate_name(name).map_err(|reason| TreeError::Parse {
                        line: line_no,
                        reason: format!("option {:?}: {}", name, reason),
                    })?;
                    let value = unescape(rest.strip_prefix(' ').unwrap_or(rest));
                    let Some(parent) = stack.last_mut() else {
                        continue;
                    };
                    if parent.contains(name) {
                        return Err(duplicate(line_no, name));
                    }
                    let mut option = ConfigOption::new(name, value);
                    option.comment = comment;
                    parent.options.push(option);
                }
                None => {
                    let name = line.trim();
                    validate_name(name).map_err(|reason| TreeError::Parse {
                        line: line_no,
                        reason: format!("section {:?}: {}", name, reason),
                    })?;
                    pending_section = Some((name.to_string(), comment, line_no));
                }
            }
        }

        if let Some((name, _, line)) = pending_section {
            return Err(TreeError::Parse {
                line,
                reason: format!("section {} is never opened", name),
            });
        }
        if stack.len() != 1 {
            return Err(TreeError::Parse {
                line: text.lines().count(),
                reason: format!("{} section(s) left unclosed", stack.len() - 1),
            });
        }
        let mut tree = ConfigTree::new();
        if let Some(root) = stack.pop() {
            *tree.root_mut() = root;
        }
        Ok(tree)
    }
}

fn write_section_body(
    out: &mut String,
    section: &Section,
    depth: usize,
) {
    let indent = INDENT.repeat(depth);
    for option in &section.options {
        write_comment(out, &indent, &option.comment);
        out.push_str(&indent);
        out.push_str(&option.name);
        out.push_str(" = ");
        out.push_str(&escape(&option.value));
        out.push('\n');
    }
    for child in &section.sections {
        write_comment(out, &indent, &child.comment);
        out.push_str(&format!("{indent}{}\n{indent}{{\n", child.name));
        write_section_body(out, child, depth + 1);
        out.push_str(&format!("{indent}}}\n"));
    }
}

fn write_comment(
    out: &mut String,
    indent: &str,
    comment: &str,
) {
    if comment.is_empty() {
        return;
    }
    out.push_str(indent);
    out.push('#');
    out.push_str(&escape(comment));
    out.push('\n');
}

fn duplicate(
    line: usize,
    name: &str,
) -> TreeError {
    TreeError::Parse {
        line,
        reason: format!("duplicate name {}", name),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
