//! Changelog generation.
//!
//! Commits are grouped into configured sections and rendered as a markdown
//! entry. The renderer is pluggable through [`ChangelogNotes`]; the default
//! output matches the conventional-changelog layout used by release tooling.

use crate::domain::{ConventionalCommit, TagName};
use crate::graph::DependencyNote;
use chrono::NaiveDate;
use regex::{Captures, Regex};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Heading used for dependency updates when no `deps` section is configured
pub const DEPENDENCIES_HEADING: &str = "Dependencies";

/// Maps a commit type to a changelog heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogSection {
    pub r#type: String,
    pub section: String,
    #[serde(default)]
    pub hidden: bool,
}

impl ChangelogSection {
    pub fn new(r#type: &str, section: &str, hidden: bool) -> Self {
        ChangelogSection {
            r#type: r#type.to_string(),
            section: section.to_string(),
            hidden,
        }
    }
}

/// Default sections in rendering order
pub fn default_sections() -> Vec<ChangelogSection> {
    vec![
        ChangelogSection::new("feat", "Features", false),
        ChangelogSection::new("feature", "Features", false),
        ChangelogSection::new("fix", "Bug Fixes", false),
        ChangelogSection::new("perf", "Performance Improvements", false),
        ChangelogSection::new("deps", DEPENDENCIES_HEADING, false),
        ChangelogSection::new("revert", "Reverts", false),
        ChangelogSection::new("docs", "Documentation", true),
        ChangelogSection::new("style", "Styles", true),
        ChangelogSection::new("chore", "Miscellaneous Chores", true),
        ChangelogSection::new("refactor", "Code Refactoring", true),
        ChangelogSection::new("test", "Tests", true),
        ChangelogSection::new("build", "Build System", true),
        ChangelogSection::new("ci", "Continuous Integration", true),
    ]
}

/// Repository coordinates used to build links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLink {
    pub host: String,
    pub owner: String,
    pub repo: String,
}

impl RepositoryLink {
    pub fn new(host: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepositoryLink {
            host: host.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    fn base(&self) -> String {
        format!("{}/{}/{}", self.host, self.owner, self.repo)
    }

    pub fn compare_url(&self, previous: &TagName, current: &TagName) -> String {
        format!("{}/compare/{}...{}", self.base(), previous, current)
    }

    pub fn commit_url(&self, sha: &str) -> String {
        format!("{}/commit/{}", self.base(), sha)
    }

    pub fn issue_url(&self, issue: &str) -> String {
        format!("{}/issues/{}", self.base(), issue)
    }
}

/// Everything a renderer needs besides the commits themselves
#[derive(Debug, Clone)]
pub struct BuildNotesOptions {
    pub version: Version,
    /// Tag of the previous release; `None` for a first release
    pub previous_tag: Option<TagName>,
    pub current_tag: TagName,
    pub date: NaiveDate,
    pub repository: Option<RepositoryLink>,
    pub sections: Vec<ChangelogSection>,
    pub dependency_notes: Vec<DependencyNote>,
}

/// Pluggable changelog renderer
pub trait ChangelogNotes {
    fn build_notes(&self, commits: &[ConventionalCommit], options: &BuildNotesOptions) -> String;
}

/// Conventional-changelog style markdown
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultChangelogNotes;

fn escape_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"``[^`].*[^`]``|`[^`]*`|<|>").expect("escape pattern is valid"))
}

fn issue_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(#(?P<issue>[0-9]+)\)").expect("issue pattern is valid"))
}

/// Escape `<` and `>` outside of inline code spans
pub fn html_escape(text: &str) -> String {
    escape_regex()
        .replace_all(text, |caps: &Captures| match &caps[0] {
            "<" => "&lt;".to_string(),
            ">" => "&gt;".to_string(),
            code => code.to_string(),
        })
        .into_owned()
}

fn link_issues(text: &str, repository: Option<&RepositoryLink>) -> String {
    match repository {
        Some(repository) => issue_regex()
            .replace_all(text, |caps: &Captures| {
                let issue = &caps["issue"];
                format!("([#{}]({}))", issue, repository.issue_url(issue))
            })
            .into_owned(),
        None => text.to_string(),
    }
}

fn scope_prefix(commit: &ConventionalCommit) -> String {
    commit
        .scope
        .as_ref()
        .map(|scope| format!("**{}:** ", scope))
        .unwrap_or_default()
}

impl DefaultChangelogNotes {
    fn header(&self, options: &BuildNotesOptions) -> String {
        let date = options.date.format("%Y-%m-%d");
        match (&options.previous_tag, &options.repository) {
            (Some(previous), Some(repository)) => format!(
                "## [{}]({}) ({})",
                options.version,
                repository.compare_url(previous, &options.current_tag),
                date
            ),
            _ => format!("## {} ({})", options.version, date),
        }
    }

    fn commit_bullet(&self, commit: &ConventionalCommit, options: &BuildNotesOptions) -> String {
        let mut bullet = format!("* {}{}", scope_prefix(commit), html_escape(&commit.bare_message));

        match &options.repository {
            Some(repository) => {
                let short = commit.sha.get(..7).unwrap_or(&commit.sha);
                bullet.push_str(&format!(" ([{}]({}))", short, repository.commit_url(&commit.sha)));
                for reference in &commit.references {
                    bullet.push_str(&format!(
                        ", closes [{}{}]({})",
                        reference.prefix,
                        reference.issue,
                        repository.issue_url(&reference.issue)
                    ));
                }
            }
            None => {
                for reference in &commit.references {
                    bullet.push_str(&format!(", closes {}{}", reference.prefix, reference.issue));
                }
            }
        }

        bullet
    }

    fn dependency_bullet(&self, notes: &[DependencyNote]) -> String {
        let mut bullet = String::from("* The following workspace dependencies were updated\n  * dependencies");
        for note in notes {
            bullet.push_str(&format!("\n    * {}", note));
        }
        bullet
    }
}

/// Ordered heading → bullets groups; headings shared by several types merge
#[derive(Default)]
struct Groups {
    groups: Vec<(String, Vec<String>)>,
}

impl Groups {
    fn declare(&mut self, heading: &str) {
        if !self.groups.iter().any(|(h, _)| h == heading) {
            self.groups.push((heading.to_string(), Vec::new()));
        }
    }

    fn push(&mut self, heading: &str, bullet: String) {
        self.declare(heading);
        if let Some((_, bullets)) = self.groups.iter_mut().find(|(h, _)| h == heading) {
            bullets.push(bullet);
        }
    }
}

impl ChangelogNotes for DefaultChangelogNotes {
    fn build_notes(&self, commits: &[ConventionalCommit], options: &BuildNotesOptions) -> String {
        let mut output = self.header(options);
        output.push_str("\n\n\n");

        let breaking: Vec<String> = commits
            .iter()
            .flat_map(|commit| {
                commit.breaking_notes().map(move |note| {
                    let text = link_issues(&html_escape(&note.text), options.repository.as_ref());
                    format!("* {}{}", scope_prefix(commit), text)
                })
            })
            .collect();

        if !breaking.is_empty() {
            output.push_str("### ⚠ BREAKING CHANGES\n\n");
            for bullet in &breaking {
                output.push_str(bullet);
                output.push('\n');
            }
            output.push('\n');
        }

        let mut groups = Groups::default();
        for section in &options.sections {
            groups.declare(&section.section);
        }

        for commit in commits {
            let section = options.sections.iter().find(|s| s.r#type == commit.r#type);
            let heading = match section {
                Some(section) if !section.hidden || commit.breaking => section.section.as_str(),
                None if commit.breaking => commit.r#type.as_str(),
                _ => continue,
            };
            groups.push(heading, self.commit_bullet(commit, options));
        }

        if !options.dependency_notes.is_empty() {
            let heading = options
                .sections
                .iter()
                .find(|s| s.r#type == "deps")
                .map_or(DEPENDENCIES_HEADING, |s| s.section.as_str());
            groups.push(heading, self.dependency_bullet(&options.dependency_notes));
        }

        for (heading, bullets) in groups.groups.iter().filter(|(_, b)| !b.is_empty()) {
            output.push_str(&format!("### {}\n\n", heading));
            for bullet in bullets {
                output.push_str(bullet);
                output.push('\n');
            }
            output.push_str("\n\n");
        }

        output.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commit::parse_conventional_commits;
    use crate::domain::RawCommit;
    use tracing::Span;

    fn commits(messages: &[(&str, &str)]) -> Vec<ConventionalCommit> {
        let raw: Vec<RawCommit> = messages
            .iter()
            .map(|(sha, message)| RawCommit::new(*sha, *message, Vec::<String>::new()))
            .collect();
        parse_conventional_commits(&raw, &Span::none())
    }

    fn options() -> BuildNotesOptions {
        BuildNotesOptions {
            version: Version::new(1, 2, 3),
            previous_tag: Some(TagName::new("v1.2.2")),
            current_tag: TagName::new("v1.2.3"),
            date: NaiveDate::from_ymd_opt(1983, 10, 10).unwrap(),
            repository: Some(RepositoryLink::new("https://github.com", "googleapis", "java-trace")),
            sections: default_sections(),
            dependency_notes: Vec::new(),
        }
    }

    #[test]
    fn test_default_layout() {
        let input = commits(&[
            ("sha1", "feat: some feature"),
            ("sha2", "fix!: some bugfix"),
            ("sha3", "chore: hidden chore"),
        ]);
        let notes = DefaultChangelogNotes.build_notes(&input, &options());

        let expected = "## [1.2.3](https://github.com/googleapis/java-trace/compare/v1.2.2...v1.2.3) (1983-10-10)\n\
\n\
\n\
### ⚠ BREAKING CHANGES\n\
\n\
* some bugfix\n\
\n\
### Features\n\
\n\
* some feature ([sha1](https://github.com/googleapis/java-trace/commit/sha1))\n\
\n\
\n\
### Bug Fixes\n\
\n\
* some bugfix ([sha2](https://github.com/googleapis/java-trace/commit/sha2))";
        assert_eq!(notes, expected);
    }

    #[test]
    fn test_first_release_header_has_no_compare_link() {
        let mut opts = options();
        opts.previous_tag = None;
        let notes = DefaultChangelogNotes.build_notes(&commits(&[("sha1", "fix: x")]), &opts);
        assert!(notes.starts_with("## 1.2.3 (1983-10-10)\n"));
    }

    #[test]
    fn test_header_without_repository() {
        let mut opts = options();
        opts.repository = None;
        let notes = DefaultChangelogNotes.build_notes(&commits(&[("abcdef123456", "fix: x")]), &opts);
        assert_eq!(notes, "## 1.2.3 (1983-10-10)\n\n\n### Bug Fixes\n\n* x");
    }

    #[test]
    fn test_short_sha_and_scope() {
        let notes = DefaultChangelogNotes.build_notes(
            &commits(&[("abcdef1234567890", "fix(deps): update dependency foo")]),
            &options(),
        );
        assert!(notes.contains(
            "* **deps:** update dependency foo ([abcdef1](https://github.com/googleapis/java-trace/commit/abcdef1234567890))"
        ));
    }

    #[test]
    fn test_hidden_types_are_omitted_unless_breaking() {
        let notes = DefaultChangelogNotes.build_notes(
            &commits(&[("sha1", "docs: typo"), ("sha2", "chore!: drop node 12")]),
            &options(),
        );
        assert!(!notes.contains("typo"));
        assert!(notes.contains("### Miscellaneous Chores"));
        assert!(notes.contains("drop node 12"));
        assert!(!notes.contains("### Documentation"));
    }

    #[test]
    fn test_unknown_type_only_when_breaking() {
        let notes = DefaultChangelogNotes.build_notes(
            &commits(&[("sha1", "wip: nothing"), ("sha2", "api!: new surface")]),
            &options(),
        );
        assert!(!notes.contains("nothing"));
        assert!(notes.contains("### api\n\n* new surface"));
    }

    #[test]
    fn test_sections_follow_configured_order() {
        let notes = DefaultChangelogNotes.build_notes(
            &commits(&[("sha1", "fix: a fix"), ("sha2", "revert: a revert"), ("sha3", "feat: a feature")]),
            &options(),
        );
        let features = notes.find("### Features").unwrap();
        let fixes = notes.find("### Bug Fixes").unwrap();
        let reverts = notes.find("### Reverts").unwrap();
        assert!(features < fixes && fixes < reverts);
    }

    #[test]
    fn test_release_as_note_is_not_rendered() {
        let notes = DefaultChangelogNotes.build_notes(
            &commits(&[("sha1", "fix: x\n\nRelease-As: 9.9.9")]),
            &options(),
        );
        assert!(!notes.contains("9.9.9"));
        assert!(!notes.contains("BREAKING"));
    }

    #[test]
    fn test_html_escape_outside_code() {
        assert_eq!(html_escape("render <div> tags"), "render &lt;div&gt; tags");
        assert_eq!(html_escape("keep `Vec<T>` as is"), "keep `Vec<T>` as is");
        assert_eq!(html_escape("``a<b`` and <c>"), "``a<b`` and &lt;c&gt;");
    }

    #[test]
    fn test_references_render_as_closes() {
        let notes = DefaultChangelogNotes.build_notes(&commits(&[("sha1", "fix: x\n\nFixes #123")]), &options());
        assert!(notes.contains(
            "* x ([sha1](https://github.com/googleapis/java-trace/commit/sha1)), closes [#123](https://github.com/googleapis/java-trace/issues/123)"
        ));
    }

    #[test]
    fn test_breaking_note_issue_links_and_lists() {
        let notes = DefaultChangelogNotes.build_notes(
            &commits(&[(
                "sha1",
                "feat(api): drop apis\n\nBREAKING CHANGE: removed apis (#42)\n- deleted foo\n- deleted bar",
            )]),
            &options(),
        );
        assert!(notes.contains(
            "* **api:** removed apis ([#42](https://github.com/googleapis/java-trace/issues/42))\n- deleted foo\n- deleted bar\n"
        ));
    }

    #[test]
    fn test_dependency_notes_render_in_dependencies_section() {
        let mut opts = options();
        opts.dependency_notes = vec![DependencyNote {
            path: "packages/a".to_string(),
            name: "pkgA".to_string(),
            previous_version: Some(Version::new(1, 1, 1)),
            new_version: Version::new(1, 1, 2),
        }];
        let notes = DefaultChangelogNotes.build_notes(&[], &opts);
        assert!(notes.ends_with(
            "### Dependencies\n\n* The following workspace dependencies were updated\n  * dependencies\n    * pkgA bumped from 1.1.1 to 1.1.2"
        ));
    }

    #[test]
    fn test_dependency_notes_without_deps_section() {
        let mut opts = options();
        opts.sections = vec![ChangelogSection::new("fix", "Fixes", false)];
        opts.dependency_notes = vec![DependencyNote {
            path: "a".to_string(),
            name: "a".to_string(),
            previous_version: None,
            new_version: Version::new(1, 0, 0),
        }];
        let notes = DefaultChangelogNotes.build_notes(&commits(&[("sha1", "fix: x")]), &opts);
        let fixes = notes.find("### Fixes").unwrap();
        let deps = notes.find("### Dependencies").unwrap();
        assert!(fixes < deps);
        assert!(notes.contains("    * a bumped to 1.0.0"));
    }

    #[test]
    fn test_section_deserializes_with_default_hidden() {
        let section: ChangelogSection =
            serde_json::from_str(r#"{"type": "feat", "section": "New Stuff"}"#).unwrap();
        assert_eq!(section, ChangelogSection::new("feat", "New Stuff", false));
    }
}
