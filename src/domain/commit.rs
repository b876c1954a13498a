//! Conventional commit parsing.
//!
//! A raw commit message may carry several conventional messages: nested
//! `BEGIN_NESTED_COMMIT`/`END_NESTED_COMMIT` blocks, and footer lines that are
//! themselves shaped like `type(scope): subject`. Each recognised message becomes
//! one [`ConventionalCommit`] sharing the raw commit's sha and file list.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, Span};

/// Note title for breaking changes
pub const BREAKING_CHANGE_NOTE: &str = "BREAKING CHANGE";
/// Note title for `Release-As:` footers
pub const RELEASE_AS_NOTE: &str = "RELEASE AS";

const NESTED_BEGIN: &str = "BEGIN_NESTED_COMMIT";
const NESTED_END: &str = "END_NESTED_COMMIT";
const OVERRIDE_BEGIN: &str = "BEGIN_COMMIT_OVERRIDE";
const OVERRIDE_END: &str = "END_COMMIT_OVERRIDE";

/// A commit as delivered by the commit source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommit {
    pub sha: String,
    pub message: String,
    /// Changed paths; `None` means the source never backfilled them
    #[serde(default)]
    pub files: Option<Vec<String>>,
    /// Body of the pull request that produced this commit, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_body: Option<String>,
}

impl RawCommit {
    pub fn new<S: Into<String>>(sha: impl Into<String>, message: impl Into<String>, files: Vec<S>) -> Self {
        RawCommit {
            sha: sha.into(),
            message: message.into(),
            files: Some(files.into_iter().map(Into::into).collect()),
            pull_request_body: None,
        }
    }

    /// A commit whose file list was never fetched
    pub fn without_files(sha: impl Into<String>, message: impl Into<String>) -> Self {
        RawCommit {
            sha: sha.into(),
            message: message.into(),
            files: None,
            pull_request_body: None,
        }
    }

    pub fn with_pull_request_body(mut self, body: impl Into<String>) -> Self {
        self.pull_request_body = Some(body.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub title: String,
    pub text: String,
}

/// Issue reference from a footer such as `Fixes #123`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub action: String,
    pub issue: String,
    pub prefix: String,
}

/// One conventional message extracted from a raw commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConventionalCommit {
    pub sha: String,
    pub r#type: String,
    pub scope: Option<String>,
    /// Subject with type and scope stripped
    pub bare_message: String,
    /// Normalised header line, e.g. `feat(api)!: subject`
    pub header: String,
    pub breaking: bool,
    pub notes: Vec<Note>,
    pub references: Vec<Reference>,
    pub files: Option<Vec<String>>,
}

impl ConventionalCommit {
    /// Breaking-change notes in the order they were found
    pub fn breaking_notes(&self) -> impl Iterator<Item = &Note> {
        self.notes
            .iter()
            .filter(|note| note.title == BREAKING_CHANGE_NOTE)
    }

    /// Raw text of the first `Release-As` footer, if any
    pub fn release_as(&self) -> Option<&str> {
        self.notes
            .iter()
            .find(|note| note.title == RELEASE_AS_NOTE)
            .map(|note| note.text.as_str())
    }
}

/// Parser output for a single conventional message, before it is bound to a sha
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub r#type: String,
    pub scope: Option<String>,
    pub subject: String,
    pub header: String,
    pub notes: Vec<Note>,
    pub references: Vec<Reference>,
}

impl ParsedMessage {
    pub fn is_breaking(&self) -> bool {
        self.notes
            .iter()
            .any(|note| note.title == BREAKING_CHANGE_NOTE)
    }
}

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<type>[A-Za-z][\w-]*)(?:\((?P<scope>[^()\r\n]+)\))?(?P<bang>!)?:\s*(?P<subject>\S.*)$")
            .expect("header pattern is valid")
    })
}

fn footer_commit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<type>[a-z]+)(?:\((?P<scope>[^()\r\n]+)\))?(?P<bang>!)?:\s*(?P<subject>\S.*)$")
            .expect("footer commit pattern is valid")
    })
}

fn breaking_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^BREAKING[ -]CHANGE:\s*(?P<text>.*)$").expect("breaking pattern is valid")
    })
}

fn release_as_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^release[ -]as:\s*(?P<version>\S+)\s*$").expect("release-as pattern is valid")
    })
}

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<action>[A-Za-z][\w-]*)(?::\s*|\s+)#(?P<issue>[0-9]+)\s*$")
            .expect("reference pattern is valid")
    })
}

/// Lines that switch a breaking-change note into verbatim markdown mode
fn has_extended_context(line: &str) -> bool {
    line.starts_with("#### ") || line.starts_with("- ") || line.starts_with("* ")
}

fn is_footer_token(line: &str) -> bool {
    breaking_regex().is_match(line)
        || release_as_regex().is_match(line)
        || reference_regex().is_match(line)
}

/// Split a message on nested-commit markers.
///
/// The first element is the outer message (with everything outside the markers);
/// each nested block follows in order.
pub fn split_nested_messages(message: &str) -> Vec<String> {
    let mut parts = message.split(NESTED_BEGIN);
    let mut outer = parts.next().unwrap_or_default().to_string();
    let mut nested = Vec::new();

    for part in parts {
        let mut pieces = part.split(NESTED_END);
        nested.push(pieces.next().unwrap_or_default().to_string());
        for rest in pieces {
            outer.push_str(rest);
        }
    }

    let mut messages = vec![outer];
    messages.extend(nested);
    messages
}

/// The message to parse for a raw commit, honouring a pull request override block
pub fn effective_message(commit: &RawCommit) -> &str {
    if let Some(body) = commit.pull_request_body.as_deref() {
        if let Some((_, after)) = body.split_once(OVERRIDE_BEGIN) {
            let content = after.split(OVERRIDE_END).next().unwrap_or_default().trim();
            if !content.is_empty() {
                return content;
            }
        }
    }
    &commit.message
}

/// Parse every conventional message contained in `message`.
///
/// Returns an empty vector when nothing in the message follows the grammar.
pub fn parse_message(message: &str) -> Vec<ParsedMessage> {
    split_nested_messages(message)
        .iter()
        .flat_map(|part| parse_single(part))
        .collect()
}

fn parse_header(line: &str, pattern: &Regex) -> Option<ParsedMessage> {
    let captures = pattern.captures(line)?;
    let r#type = captures.name("type")?.as_str().to_string();
    let scope = captures
        .name("scope")
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());
    let subject = captures.name("subject")?.as_str().trim().to_string();
    let bang = captures.name("bang").is_some();

    let mut header = r#type.clone();
    if let Some(scope) = &scope {
        header.push_str(&format!("({})", scope));
    }
    if bang {
        header.push('!');
    }
    header.push_str(&format!(": {}", subject));

    let mut notes = Vec::new();
    if bang {
        notes.push(Note {
            title: BREAKING_CHANGE_NOTE.to_string(),
            text: subject.clone(),
        });
    }

    Some(ParsedMessage {
        r#type,
        scope,
        subject,
        header,
        notes,
        references: Vec::new(),
    })
}

fn parse_single(text: &str) -> Vec<ParsedMessage> {
    let text = text.trim();
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let Some((first, body)) = lines.split_first() else {
        return Vec::new();
    };
    let Some(mut head) = parse_header(first, header_regex()) else {
        return Vec::new();
    };

    let mut footer_commits = Vec::new();
    let mut breaking_text: Option<String> = None;
    let mut release_as: Option<String> = None;
    // The header is followed by a paragraph break even when no blank line is present
    let mut prev_blank = true;
    let mut prev_footer = false;
    let mut i = 0;

    while i < body.len() {
        let line = body[i];
        i += 1;

        if line.trim().is_empty() {
            prev_blank = true;
            prev_footer = false;
            continue;
        }

        let paragraph_start = prev_blank || prev_footer;
        prev_blank = false;
        prev_footer = true;

        if let Some(captures) = breaking_regex().captures(line) {
            let first_text = captures.name("text").map_or("", |m| m.as_str());
            let (note, consumed) = collect_breaking_note(first_text, &body[i..]);
            if !note.is_empty() {
                breaking_text = Some(note);
            }
            i += consumed;
            continue;
        }

        if let Some(captures) = release_as_regex().captures(line) {
            if release_as.is_none() {
                release_as = captures.name("version").map(|m| m.as_str().to_string());
            }
            continue;
        }

        if let Some(captures) = reference_regex().captures(line) {
            head.references.push(Reference {
                action: captures["action"].to_string(),
                issue: captures["issue"].to_string(),
                prefix: "#".to_string(),
            });
            continue;
        }

        if paragraph_start {
            if let Some(footer) = parse_header(line, footer_commit_regex()) {
                footer_commits.push(footer);
                continue;
            }
        }

        prev_footer = false;
    }

    if let Some(text) = breaking_text {
        // A BREAKING CHANGE footer supersedes the `!` subject note
        head.notes.retain(|note| note.title != BREAKING_CHANGE_NOTE);
        head.notes.push(Note {
            title: BREAKING_CHANGE_NOTE.to_string(),
            text,
        });
    }
    if let Some(version) = release_as {
        head.notes.push(Note {
            title: RELEASE_AS_NOTE.to_string(),
            text: version,
        });
    }

    footer_commits.push(head);
    footer_commits
}

/// Collect the text of a breaking-change note starting after its marker.
///
/// Returns the note text and how many lines of `rest` it consumed.
fn collect_breaking_note(first: &str, rest: &[&str]) -> (String, usize) {
    let mut text = first.trim().to_string();
    let mut extended = false;
    let mut consumed = 0;

    while consumed < rest.len() {
        let line = rest[consumed];

        if line.trim().is_empty() {
            if !extended {
                break;
            }
            let continues = rest[consumed + 1..]
                .iter()
                .find(|next| !next.trim().is_empty())
                .is_some_and(|next| has_extended_context(next));
            if !continues {
                break;
            }
            text.push('\n');
            consumed += 1;
            continue;
        }

        if is_footer_token(line) {
            break;
        }

        if has_extended_context(line) {
            extended = true;
        }

        if extended {
            text.push('\n');
            text.push_str(line);
        } else if text.is_empty() {
            text.push_str(line.trim());
        } else {
            text.push(' ');
            text.push_str(line.trim());
        }
        consumed += 1;
    }

    (text.trim().to_string(), consumed)
}

/// Parse raw commits into conventional commits.
///
/// A raw commit may expand into several conventional commits; non-conventional
/// messages are skipped and logged at debug level on `span`.
pub fn parse_conventional_commits(commits: &[RawCommit], span: &Span) -> Vec<ConventionalCommit> {
    let mut parsed_commits = Vec::new();

    for commit in commits {
        let parsed = parse_message(effective_message(commit));
        if parsed.is_empty() {
            debug!(
                parent: span,
                sha = %commit.sha,
                subject = commit.message.lines().next().unwrap_or_default(),
                "commit could not be parsed"
            );
            continue;
        }

        for message in parsed {
            let breaking = message.is_breaking();
            parsed_commits.push(ConventionalCommit {
                sha: commit.sha.clone(),
                r#type: message.r#type,
                scope: message.scope,
                bare_message: message.subject,
                header: message.header,
                breaking,
                notes: message.notes,
                references: message.references,
                files: commit.files.clone(),
            });
        }
    }

    parsed_commits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(message: &str) -> ParsedMessage {
        let mut parsed = parse_message(message);
        assert_eq!(parsed.len(), 1, "expected one message from {:?}", message);
        parsed.remove(0)
    }

    #[test]
    fn test_parse_with_scope() {
        let commit = parse_one("feat(auth): add login");
        assert_eq!(commit.r#type, "feat");
        assert_eq!(commit.scope, Some("auth".to_string()));
        assert_eq!(commit.subject, "add login");
        assert!(!commit.is_breaking());
    }

    #[test]
    fn test_parse_with_breaking_marker() {
        let commit = parse_one("feat(auth)!: redesign login");
        assert_eq!(commit.r#type, "feat");
        assert!(commit.is_breaking());
        assert_eq!(commit.notes[0].text, "redesign login");
        assert_eq!(commit.header, "feat(auth)!: redesign login");
    }

    #[test]
    fn test_parse_breaking_without_scope() {
        let commit = parse_one("fix!: some breaking fix");
        assert_eq!(commit.r#type, "fix");
        assert_eq!(commit.scope, None);
        assert_eq!(commit.notes.len(), 1);
        assert_eq!(commit.notes[0].title, BREAKING_CHANGE_NOTE);
        assert_eq!(commit.notes[0].text, "some breaking fix");
    }

    #[test]
    fn test_parse_non_conventional() {
        assert!(parse_message("Random commit message").is_empty());
        assert!(parse_message("").is_empty());
        assert!(parse_message("feat:").is_empty());
    }

    #[test]
    fn test_parse_breaking_change_footer() {
        let commit = parse_one("feat: some feature\n\nBREAKING CHANGE: this is actually a breaking change");
        assert!(commit.is_breaking());
        assert_eq!(commit.notes.len(), 1);
        assert_eq!(commit.notes[0].text, "this is actually a breaking change");
    }

    #[test]
    fn test_parse_breaking_change_hyphenated_footer() {
        let commit = parse_one("fix: rename\n\nBREAKING-CHANGE: field renamed");
        assert!(commit.is_breaking());
        assert_eq!(commit.notes[0].text, "field renamed");
    }

    #[test]
    fn test_footer_note_supersedes_bang_subject() {
        let commit = parse_one("fix!: some fix\n\nBREAKING CHANGE: the real story");
        let notes: Vec<_> = commit.notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(notes, vec!["the real story"]);
    }

    #[test]
    fn test_multi_line_breaking_note_joins_until_blank_line() {
        let commit = parse_one(
            "feat: thing\n\nBREAKING CHANGE: first line\nsecond line\nthird line\n\nI should be removed",
        );
        assert_eq!(commit.notes[0].text, "first line second line third line");
    }

    #[test]
    fn test_breaking_note_removes_surrounding_body_text() {
        let commit = parse_one("fix: x\n\nsome context\nBREAKING CHANGE: my comment\n\nmore text after");
        assert_eq!(commit.notes[0].text, "my comment");
    }

    #[test]
    fn test_breaking_note_preserves_markdown_list() {
        let commit = parse_one(
            "feat: drop apis\n\nBREAKING CHANGE: some APIs were removed\n#### Deleted\n- deleted API foo\n\n- deleted API bar\n\ntrailing prose",
        );
        let text = &commit.notes[0].text;
        assert_eq!(
            text,
            "some APIs were removed\n#### Deleted\n- deleted API foo\n\n- deleted API bar"
        );
        assert!(!text.contains("trailing prose"));
    }

    #[test]
    fn test_release_as_footer() {
        let commit = parse_one("chore: correct release\n\nRelease-As: v3.0.0");
        assert!(!commit.is_breaking());
        assert_eq!(commit.notes.len(), 1);
        assert_eq!(commit.notes[0].title, RELEASE_AS_NOTE);
        assert_eq!(commit.notes[0].text, "v3.0.0");
    }

    #[test]
    fn test_release_as_after_breaking_note_is_not_swallowed() {
        let commit = parse_one("feat: x\n\nBREAKING CHANGE: gone\nRelease-As: 2.0.0");
        assert_eq!(commit.notes.len(), 2);
        assert_eq!(commit.notes[0].text, "gone");
        assert_eq!(commit.notes[1].text, "2.0.0");
    }

    #[test]
    fn test_references() {
        let commit = parse_one("fix: some fix\n\nFixes #123");
        assert_eq!(
            commit.references,
            vec![Reference {
                action: "Fixes".to_string(),
                issue: "123".to_string(),
                prefix: "#".to_string(),
            }]
        );
        let commit = parse_one("fix: other\n\nCloses: #9");
        assert_eq!(commit.references[0].action, "Closes");
        assert_eq!(commit.references[0].issue, "9");
    }

    #[test]
    fn test_multiple_messages_in_one_commit() {
        let parsed = parse_message("fix: some fix\n\nfeat: another feature");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].r#type, "feat");
        assert_eq!(parsed[0].subject, "another feature");
        assert_eq!(parsed[1].r#type, "fix");
        assert_eq!(parsed[1].subject, "some fix");
    }

    #[test]
    fn test_footer_commits_with_scope_and_breaking() {
        let parsed = parse_message(
            "chore: multiple commits\n\nfix(securitycenter): fixes security center.\nfeat(recaptchaenterprise)!: migrate microgenerator\nCommitter: @someone",
        );
        let fix = parsed
            .iter()
            .find(|m| m.subject == "fixes security center.")
            .unwrap();
        assert_eq!(fix.scope.as_deref(), Some("securitycenter"));
        let feat = parsed
            .iter()
            .find(|m| m.subject == "migrate microgenerator")
            .unwrap();
        assert!(feat.is_breaking());
        assert_eq!(feat.scope.as_deref(), Some("recaptchaenterprise"));
        assert!(parsed.iter().all(|m| m.r#type != "Committer"));
    }

    #[test]
    fn test_body_prose_is_not_a_footer_commit() {
        let parsed = parse_message("feat: thing\n\nexplaining the change\nfix: not a footer");
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_nested_commits() {
        let message = "chore: outer\n\nBEGIN_NESTED_COMMIT\nfix(api): nested fix\nEND_NESTED_COMMIT\nBEGIN_NESTED_COMMIT\nfeat: nested feature\nEND_NESTED_COMMIT";
        let parsed = parse_message(message);
        let types: Vec<_> = parsed.iter().map(|m| m.r#type.as_str()).collect();
        assert_eq!(types, vec!["chore", "fix", "feat"]);
    }

    #[test]
    fn test_commit_override_from_pull_request_body() {
        let raw = RawCommit::new("sha1", "chore: some commit", Vec::<String>::new())
            .with_pull_request_body("BEGIN_COMMIT_OVERRIDE\nfix: some fix\nEND_COMMIT_OVERRIDE");
        let commits = parse_conventional_commits(&[raw], &Span::none());
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].r#type, "fix");
        assert_eq!(commits[0].bare_message, "some fix");
    }

    #[test]
    fn test_empty_override_keeps_message() {
        let raw = RawCommit::new("sha1", "feat: kept", Vec::<String>::new())
            .with_pull_request_body("BEGIN_COMMIT_OVERRIDE\n\nEND_COMMIT_OVERRIDE");
        assert_eq!(effective_message(&raw), "feat: kept");
    }

    #[test]
    fn test_parse_conventional_commits_shares_sha_and_files() {
        let raw = RawCommit::new("abc123", "feat: a\n\nfix: b", vec!["packages/a/src/lib.rs"]);
        let commits = parse_conventional_commits(&[raw], &Span::none());
        assert_eq!(commits.len(), 2);
        assert!(commits.iter().all(|c| c.sha == "abc123"));
        assert!(commits
            .iter()
            .all(|c| c.files.as_deref() == Some(&["packages/a/src/lib.rs".to_string()][..])));
    }

    #[test]
    fn test_parse_conventional_commits_skips_non_conventional() {
        let commits = parse_conventional_commits(
            &[
                RawCommit::new("1", "Merge branch 'main'", Vec::<String>::new()),
                RawCommit::new("2", "docs: some documentation", Vec::<String>::new()),
            ],
            &Span::none(),
        );
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].r#type, "docs");
        assert!(commits[0].scope.is_none());
    }
}
