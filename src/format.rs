//! Plain-text to HTML conversion for task descriptions.
//!
//! The task API renders descriptions as HTML, so multi-line text typed on the
//! command line is turned into a small fragment: upper-case `HEADER:` lines
//! become bold, `-`/`•`/`1.` lines become list items and blank lines become
//! breaks. Text that already looks like HTML is passed through untouched.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HEADER_RE: Regex = Regex::new(r"^[A-ZÁÉÍÓÚÑ\s]+:").unwrap();
    static ref BULLET_RE: Regex = Regex::new(r"^[-•]\s+").unwrap();
    static ref NUMBERED_RE: Regex = Regex::new(r"^\d+\.\s+").unwrap();
}

/// Converts a plain-text description into an HTML fragment.
///
/// Empty input is returned as is. Input containing both `<` and `>` is
/// assumed to be HTML already and is returned unmodified, which also makes
/// the conversion idempotent.
///
/// # Examples
///
/// ```
/// use vikunja_cli::format::text_to_html;
///
/// assert_eq!(
///     text_to_html("TODO:\nfix bug"),
///     "<strong>TODO:</strong><br>\nfix bug<br>"
/// );
/// ```
pub fn text_to_html(text: &str) -> String {
    if text.is_empty() || looks_like_html(text) {
        return text.to_string();
    }

    let mut out = Fragment::default();
    for line in text.split('\n') {
        let line = line.trim();
        // The plain rule always matches, so exactly one handler runs.
        if let Some(rule) = RULES.iter().find(|rule| (rule.matches)(line)) {
            (rule.emit)(&mut out, line);
        }
    }
    out.finish()
}

/// [`text_to_html`] for an optional description; `None` stays `None`.
pub fn format_description(text: Option<&str>) -> Option<String> {
    text.map(text_to_html)
}

fn looks_like_html(text: &str) -> bool {
    text.contains('<') && text.contains('>')
}

/// A line classifier paired with the output it produces.
struct Rule {
    matches: fn(&str) -> bool,
    emit: fn(&mut Fragment, &str),
}

/// Evaluated in order; a header that also looks like a list item stays a header.
const RULES: &[Rule] = &[
    Rule {
        matches: is_blank,
        emit: Fragment::blank,
    },
    Rule {
        matches: is_header,
        emit: Fragment::header,
    },
    Rule {
        matches: is_list_item,
        emit: Fragment::list_item,
    },
    Rule {
        matches: is_plain,
        emit: Fragment::plain,
    },
];

fn is_blank(line: &str) -> bool {
    line.is_empty()
}

fn is_header(line: &str) -> bool {
    HEADER_RE.is_match(line)
}

fn is_list_item(line: &str) -> bool {
    BULLET_RE.is_match(line) || NUMBERED_RE.is_match(line)
}

fn is_plain(_line: &str) -> bool {
    true
}

/// Output lines under construction plus whether a `<ul>` is open.
#[derive(Debug, Default)]
struct Fragment {
    lines: Vec<String>,
    in_list: bool,
}

impl Fragment {
    fn blank(&mut self, _line: &str) {
        self.close_list();
        self.lines.push("<br>".to_string());
    }

    fn header(&mut self, line: &str) {
        self.close_list();
        self.lines.push(format!("<strong>{}</strong><br>", line));
    }

    fn list_item(&mut self, line: &str) {
        if !self.in_list {
            self.lines.push("<ul>".to_string());
            self.in_list = true;
        }
        // bullet first, then a number left behind it ("- 1. x" -> "x")
        let item = BULLET_RE.replace(line, "");
        let item = NUMBERED_RE.replace(&item, "");
        self.lines.push(format!("<li>{}</li>", item));
    }

    fn plain(&mut self, line: &str) {
        self.close_list();
        self.lines.push(format!("{}<br>", line));
    }

    fn close_list(&mut self) {
        if self.in_list {
            self.lines.push("</ul>".to_string());
            self.in_list = false;
        }
    }

    fn finish(mut self) -> String {
        self.close_list();
        self.lines.join("\n")
    }
}
