// src/markup.rs - HTML rendering of formatted content.
//
// Presentation-layer counterpart of `format`: the same block grammar is
// rendered to HTML for the dashboard instead of plain marked-up text.
// Adjacent list items collapse into a single <ul>; source text is escaped
// before any markup is inserted.
use crate::format::{self, Block};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BOLD: Regex = Regex::new(r"\*\*([^*]+)\*\*").unwrap();
    static ref ITALIC: Regex = Regex::new(r"\*([^*]+)\*").unwrap();
}

/// Render a raw webhook payload (or already-formatted text) as HTML.
pub fn render_html(raw: &str) -> String {
    let blocks = format::parse_blocks(&format::format_text(raw));

    let mut html = String::new();
    let mut list_open = false;
    let mut paragraph: Vec<String> = Vec::new();

    for block in &blocks {
        match block {
            Block::Heading(level, text) => {
                flush_paragraph(&mut html, &mut paragraph);
                close_list(&mut html, &mut list_open);
                html.push_str(&format!("<h{}>{}</h{}>", level, inline_markup(text), level));
            }
            Block::Bullet(text) | Block::Numbered(_, text) => {
                flush_paragraph(&mut html, &mut paragraph);
                if !list_open {
                    html.push_str("<ul>");
                    list_open = true;
                }
                html.push_str(&format!("<li>{}</li>", inline_markup(text)));
            }
            Block::Label { name, value } => {
                flush_paragraph(&mut html, &mut paragraph);
                close_list(&mut html, &mut list_open);
                match value {
                    Some(value) => html.push_str(&format!(
                        "<p><strong>{}:</strong> {}</p>",
                        escape_html(name),
                        inline_markup(value)
                    )),
                    None => html.push_str(&format!("<p><strong>{}:</strong></p>", escape_html(name))),
                }
            }
            Block::Text(text) => {
                close_list(&mut html, &mut list_open);
                paragraph.push(inline_markup(text));
            }
            // A blank line ends the paragraph but not an open list, so
            // spaced-out bullet runs still merge into one container.
            Block::Blank => flush_paragraph(&mut html, &mut paragraph),
        }
    }

    flush_paragraph(&mut html, &mut paragraph);
    close_list(&mut html, &mut list_open);
    html
}

fn flush_paragraph(html: &mut String, paragraph: &mut Vec<String>) {
    if !paragraph.is_empty() {
        html.push_str(&format!("<p>{}</p>", paragraph.join("<br>")));
        paragraph.clear();
    }
}

fn close_list(html: &mut String, list_open: &mut bool) {
    if *list_open {
        html.push_str("</ul>");
        *list_open = false;
    }
}

fn inline_markup(text: &str) -> String {
    let escaped = escape_html(text);
    let bolded = BOLD.replace_all(&escaped, "<strong>$1</strong>");
    ITALIC.replace_all(&bolded, "<em>$1</em>").into_owned()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_list_items_share_one_list() {
        let html = render_html("- first\n- second\n1. third");
        assert_eq!(html, "<ul><li>first</li><li>second</li><li>third</li></ul>");
    }

    #[test]
    fn blank_lines_between_bullets_do_not_split_the_list() {
        let html = render_html("- first\n\n- second");
        assert_eq!(html, "<ul><li>first</li><li>second</li></ul>");
    }

    #[test]
    fn blank_lines_split_paragraphs() {
        let html = render_html("alpha\nbeta\n\ngamma");
        assert_eq!(html, "<p>alpha<br>beta</p><p>gamma</p>");
    }

    #[test]
    fn labels_render_as_strong_prefixes() {
        let html = render_html("Summary: numbers look fine");
        assert_eq!(html, "<p><strong>Summary:</strong> numbers look fine</p>");
    }

    #[test]
    fn headings_render_at_their_level() {
        let html = render_html("## Outlook");
        assert_eq!(html, "<h2>Outlook</h2>");
    }

    #[test]
    fn inline_emphasis_is_converted() {
        let html = render_html("- a **key** point");
        assert_eq!(html, "<ul><li>a <strong>key</strong> point</li></ul>");
    }

    #[test]
    fn source_html_is_escaped() {
        let html = render_html("tags like <script> stay inert & visible");
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn json_payloads_render_structurally() {
        let html = render_html(r#"{"post": "launch day"}"#);
        assert_eq!(html, "<p><strong>Post:</strong> launch day</p>");
    }
}
