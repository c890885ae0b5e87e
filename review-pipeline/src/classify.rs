//! Review-comment classification over the reviewer's body grammar.
//!
//! Observed body layout (every part optional):
//!
//! ```text
//! **<sub><sub>![P2 Badge](https://…)</sub></sub> Title text**
//! Description paragraphs…
//!
//! Useful? React with 👍 / 👎.
//! ```
//!
//! - Title: the first `**`-delimited span, inline HTML tags and badge image
//!   syntax stripped.
//! - Description: everything after the first bold span's closing `**` (the
//!   whole body when no span exists), with the `Useful? React with…` trailer
//!   removed wherever it starts.
//! - Priority: `![P<digit>` badge token; [`Priority::default`] when absent or
//!   outside the recognized set.
//!
//! Classification never fails: a comment is either filtered as non-actionable
//! or yields a [`TaskDescriptor`].

use github_client::ReviewComment;
use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{Priority, TaskDescriptor};

lazy_static! {
    /// First bold span; `(?s)` so titles may wrap across lines.
    static ref BOLD_SPAN: Regex = Regex::new(r"(?s)\*\*(.+?)\*\*").unwrap();
    /// Inline HTML tags inside the title (`<sub>`, `<br>`, …).
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    /// Markdown image syntax, which is how the badge is embedded.
    static ref BADGE_IMAGE: Regex = Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap();
    /// Call-to-action trailer appended to reviewer comments.
    static ref USEFUL_TRAILER: Regex = Regex::new(r"(?s)\n*Useful\?\s*React with.*").unwrap();
    /// Priority badge token (`![P2 Badge](…`).
    static ref PRIORITY_BADGE: Regex = Regex::new(r"!\[P(\d)").unwrap();
    /// Approval/acknowledgement openers that need no fix.
    static ref APPROVAL_PREFIX: Regex =
        Regex::new(r"(?i)^\s*(👍|LGTM|Looks good|Approved)").unwrap();
}

/// Whether a comment is worth running the pipeline for.
///
/// Summary-level comments (no file path) and pure acknowledgements are
/// filtered here, before any classification happens.
pub fn is_actionable(comment: &ReviewComment) -> bool {
    if comment.path.is_none() {
        return false;
    }
    !APPROVAL_PREFIX.is_match(&comment.body)
}

/// Classifies one review comment into a fix task.
///
/// Returns `None` for non-actionable comments and never errors otherwise.
pub fn classify(comment: &ReviewComment) -> Option<TaskDescriptor> {
    if !is_actionable(comment) {
        return None;
    }
    let path = comment.path.clone()?;

    Some(TaskDescriptor {
        comment_id: comment.id,
        node_id: comment.node_id.clone(),
        path,
        line: comment.line.or(comment.original_line),
        start_line: comment.start_line.or(comment.original_start_line),
        diff_hunk: comment.diff_hunk.clone(),
        title: extract_title(&comment.body),
        description: extract_description(&comment.body),
        priority: extract_priority(&comment.body),
    })
}

/// First bold span with markup stripped; empty when the body has none.
fn extract_title(body: &str) -> String {
    let Some(caps) = BOLD_SPAN.captures(body) else {
        return String::new();
    };
    let raw = &caps[1];
    let no_html = HTML_TAG.replace_all(raw, "");
    let no_badge = BADGE_IMAGE.replace_all(&no_html, "");
    no_badge.trim().to_string()
}

/// Body text after the first bold span's closing `**`, trailer removed.
fn extract_description(body: &str) -> String {
    let after_title = match closing_bold_delimiter(body) {
        Some(end) => body[end + 2..].trim(),
        None => body,
    };
    USEFUL_TRAILER.replace(after_title, "").trim().to_string()
}

/// Byte offset of the closing `**` of the first bold span.
fn closing_bold_delimiter(body: &str) -> Option<usize> {
    let open = body.find("**")?;
    let close = body[open + 2..].find("**")?;
    Some(open + 2 + close)
}

/// `![P<digit>` badge token, defaulted when missing or unrecognized.
fn extract_priority(body: &str) -> Priority {
    PRIORITY_BADGE
        .captures(body)
        .and_then(|caps| caps[1].chars().next())
        .and_then(|c| c.to_digit(10))
        .and_then(Priority::from_digit)
        .unwrap_or_default()
}
