//! Typed request contract for one agent invocation.
//!
//! The agent is a black box: it receives one deterministic text instruction
//! on stdin and is expected to edit files in the working directory. Keeping
//! the payload construction here, behind a struct, means the rest of the
//! pipeline never concatenates prompt strings.

/// Everything the agent needs to address one review comment.
#[derive(Debug, Clone)]
pub struct FixRequest {
    /// Repository-relative path of the file the comment is anchored to.
    pub path: String,
    /// Short title extracted from the comment body; may be empty.
    pub title: String,
    /// Priority tag, e.g. `P2`.
    pub priority: String,
    /// Anchor line, when the comment has one.
    pub line: Option<u64>,
    /// Start of the anchored range for multi-line comments.
    pub start_line: Option<u64>,
    /// Comment body with title and boilerplate stripped.
    pub description: String,
    /// Diff excerpt the comment was left on.
    pub diff_hunk: Option<String>,
}

impl FixRequest {
    /// Renders the stdin payload for the agent.
    ///
    /// Absent optional fields render as `N/A`. The wording instructs the
    /// agent to actually edit files and to leave commit/push to the caller.
    pub fn render_prompt(&self) -> String {
        let line = opt_num(self.line);
        let start_line = opt_num(self.start_line);
        let diff_hunk = self.diff_hunk.as_deref().unwrap_or("N/A");

        format!(
            "You MUST edit the file \"{path}\" to fix the code review issue described below. \
Use your edit tool to make the change. Do NOT just describe the fix — actually edit the file.\n\
\n\
Review comment title: {title}\n\
Priority: {priority}\n\
File: {path}\n\
Line: {line}\n\
Start line: {start_line}\n\
\n\
Review comment:\n\
{description}\n\
\n\
Diff hunk for context:\n\
{diff_hunk}\n\
\n\
INSTRUCTIONS:\n\
1. Read the file \"{path}\" if needed\n\
2. Use your Edit tool to make the minimal, focused fix for this review comment\n\
3. Do NOT commit, push, or make unrelated changes\n\
4. Do NOT just explain what to do — you MUST edit the file",
            path = self.path,
            title = self.title,
            priority = self.priority,
            line = line,
            start_line = start_line,
            description = self.description,
            diff_hunk = diff_hunk,
        )
    }
}

fn opt_num(n: Option<u64>) -> String {
    n.map(|v| v.to_string()).unwrap_or_else(|| "N/A".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FixRequest {
        FixRequest {
            path: "src/auth.rs".into(),
            title: "Fix null check".into(),
            priority: "P1".into(),
            line: Some(42),
            start_line: None,
            description: "Guard against a missing session token.".into(),
            diff_hunk: Some("@@ -40,3 +40,4 @@".into()),
        }
    }

    #[test]
    fn prompt_contains_all_fields() {
        let prompt = request().render_prompt();
        assert!(prompt.contains("src/auth.rs"));
        assert!(prompt.contains("Review comment title: Fix null check"));
        assert!(prompt.contains("Priority: P1"));
        assert!(prompt.contains("Line: 42"));
        assert!(prompt.contains("Start line: N/A"));
        assert!(prompt.contains("Guard against a missing session token."));
        assert!(prompt.contains("@@ -40,3 +40,4 @@"));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(request().render_prompt(), request().render_prompt());
    }

    #[test]
    fn absent_optionals_render_as_na() {
        let mut req = request();
        req.line = None;
        req.diff_hunk = None;
        let prompt = req.render_prompt();
        assert!(prompt.contains("Line: N/A"));
        assert!(prompt.contains("Diff hunk for context:\nN/A"));
    }

    #[test]
    fn prompt_forbids_committing() {
        let prompt = request().render_prompt();
        assert!(prompt.contains("Do NOT commit, push"));
    }
}
