// src/format.rs - Webhook payload formatting.
//
// Raw webhook bodies arrive as free text, JSON objects, or JSON arrays.
// Instead of chaining regex substitutions over the raw string, text is
// parsed into a small block tree and then rendered per surface: plain
// marked-up text here, HTML in `markup`.
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"^(#{1,3})\s+(.+)$").unwrap();
    static ref HRULE: Regex = Regex::new(r"^-{3,}$").unwrap();
    static ref BOLD_LABEL: Regex = Regex::new(r"^\*\*([^*]+):\*\*\s*(.*)$").unwrap();
    static ref BULLET: Regex = Regex::new(r"^[-*•]\s+(.+)$").unwrap();
    static ref NUMBERED: Regex = Regex::new(r"^(\d+)[.)]\s+(.+)$").unwrap();
}

/// One logical line of formatted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(usize, String),
    /// `**Name:** value` pair; `value` is `None` for label-only lines.
    Label { name: String, value: Option<String> },
    Bullet(String),
    /// Numbered list item; the marker is kept verbatim so `7.` stays `7.`.
    Numbered(String, String),
    Text(String),
    Blank,
}

/// Format an arbitrary webhook payload into readable marked-up text.
/// Never fails: unknown shapes fall back to their stringified form.
pub fn format_payload(value: &Value) -> String {
    match value {
        Value::String(text) => format_text(text),
        Value::Object(_) | Value::Array(_) => render_value(value),
        scalar => scalar_text(scalar),
    }
}

/// Format free text. Strings that parse as JSON objects or arrays are
/// rendered structurally; everything else goes through the line parser.
/// Running the result through again yields the same output.
pub fn format_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return render_value(&value);
        }
    }
    render_plain(&parse_blocks(trimmed))
}

/// Classify each line of `text` into a block. `Output:` prefixes are
/// stripped, horizontal rules dropped, and runs of blank lines collapsed.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut blocks: Vec<Block> = Vec::new();

    for raw_line in normalized.lines() {
        let line = raw_line
            .strip_prefix("Output:")
            .map(str::trim_start)
            .unwrap_or(raw_line)
            .trim();

        if line.is_empty() || HRULE.is_match(line) {
            if matches!(blocks.last(), Some(Block::Blank)) || blocks.is_empty() {
                continue;
            }
            blocks.push(Block::Blank);
        } else if let Some(caps) = HEADING.captures(line) {
            blocks.push(Block::Heading(caps[1].len(), caps[2].trim().to_string()));
        } else if let Some(caps) = BOLD_LABEL.captures(line) {
            let value = caps[2].trim();
            blocks.push(Block::Label {
                name: caps[1].trim().to_string(),
                value: (!value.is_empty()).then(|| value.to_string()),
            });
        } else if let Some(caps) = BULLET.captures(line) {
            blocks.push(Block::Bullet(caps[1].trim().to_string()));
        } else if let Some(caps) = NUMBERED.captures(line) {
            blocks.push(Block::Numbered(caps[1].to_string(), caps[2].trim().to_string()));
        } else if let Some((name, value)) = split_label(line) {
            blocks.push(Block::Label { name, value });
        } else {
            blocks.push(Block::Text(line.to_string()));
        }
    }

    while matches!(blocks.last(), Some(Block::Blank)) {
        blocks.pop();
    }
    blocks
}

/// Render blocks back to plain marked-up text.
pub fn render_plain(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|block| match block {
            Block::Heading(level, text) => format!("{} {}", "#".repeat(*level), text),
            Block::Label { name, value: Some(value) } => format!("**{}:** {}", name, value),
            Block::Label { name, value: None } => format!("**{}:**", name),
            Block::Bullet(text) => format!("• {}", text),
            Block::Numbered(marker, text) => format!("{}. {}", marker, text),
            Block::Text(text) => text.clone(),
            Block::Blank => String::new(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// `key: value` and trailing-colon lines become labels. Keys containing `*`
// are left alone so inline emphasis does not get re-wrapped on a second pass.
fn split_label(line: &str) -> Option<(String, Option<String>)> {
    let idx = line.find(':')?;
    let name = line[..idx].trim();
    if name.is_empty() || name.contains('*') {
        return None;
    }
    let value = line[idx + 1..].trim();
    Some((name.to_string(), (!value.is_empty()).then(|| value.to_string())))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(_) | Value::Array(_) => {
                    format!("{}. {}", index + 1, render_value(item))
                }
                scalar => format!("• {}", scalar_text(scalar)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(key, inner)| {
                let label = humanize_key(key);
                match inner {
                    Value::Object(_) | Value::Array(_) => {
                        format!("**{}:**\n{}", label, render_value(inner))
                    }
                    scalar => format!("**{}:** {}", label, scalar_text(scalar)),
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
        scalar => scalar_text(scalar),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => value.to_string(),
    }
}

// "marketAnalysis" -> "Market Analysis", "risk_factors" -> "Risk factors".
fn humanize_key(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch == '_' {
            spaced.push(' ');
        } else if ch.is_ascii_uppercase() && i > 0 {
            spaced.push(' ');
            spaced.push(ch);
        } else {
            spaced.push(ch);
        }
    }
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_keys_become_spaced_bold_labels() {
        let out = format_payload(&json!({"marketAnalysis": "growth is steady"}));
        assert_eq!(out, "**Market Analysis:** growth is steady");
    }

    #[test]
    fn snake_case_keys_get_first_letter_capitalized() {
        let out = format_payload(&json!({"risk_factors": "regulatory pressure"}));
        assert_eq!(out, "**Risk factors:** regulatory pressure");
    }

    #[test]
    fn arrays_enumerate_objects_and_bullet_scalars() {
        let out = format_payload(&json!([{"headline": "rates cut"}, "plain item"]));
        assert_eq!(out, "1. **Headline:** rates cut\n• plain item");
    }

    #[test]
    fn nested_structures_render_without_structural_chars() {
        let payload = json!({
            "insights": {"trend": "upward", "volume": 42},
            "sources": ["reuters", "bloomberg"]
        });
        let out = format_payload(&payload);
        assert!(!out.contains('{') && !out.contains('['), "unrendered JSON in: {}", out);
        for leaf in ["upward", "42", "reuters", "bloomberg"] {
            assert!(out.contains(leaf), "missing leaf {:?} in: {}", leaf, out);
        }
    }

    #[test]
    fn json_encoded_strings_are_parsed() {
        let out = format_text(r#"{"post": "Big news today"}"#);
        assert_eq!(out, "**Post:** Big news today");
    }

    #[test]
    fn key_value_and_trailing_colon_lines_become_bold() {
        let out = format_text("Summary: all good\nNext Steps:");
        assert_eq!(out, "**Summary:** all good\n**Next Steps:**");
    }

    #[test]
    fn output_prefix_and_horizontal_rules_are_stripped() {
        let out = format_text("Output: first line\n---\nsecond line");
        assert_eq!(out, "first line\n\nsecond line");
    }

    #[test]
    fn blank_runs_collapse_to_one() {
        let out = format_text("alpha\n\n\n\nbeta");
        assert_eq!(out, "alpha\n\nbeta");
    }

    #[test]
    fn list_markers_are_normalized() {
        let out = format_text("- first\n* second\n1) third");
        assert_eq!(out, "• first\n• second\n1. third");
    }

    #[test]
    fn formatting_plain_text_is_idempotent() {
        let input = "Output: Research notes\n\nKey Points:\n- adoption is rising\n2) costs dropping\n\n\nClosing: watch the space\n*Note: sample data only*";
        let once = format_text(input);
        assert_eq!(format_text(&once), once);
    }

    #[test]
    fn headings_pass_through_unchanged() {
        let out = format_text("## Quarterly Outlook\nbody text");
        assert_eq!(out, "## Quarterly Outlook\nbody text");
    }
}
