// src/drafts.rs
// File-backed draft store: one human-editable file per draft, with the
// directory scan as the only index

use crate::error::{KitError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::{distr::Alphanumeric, Rng};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

const HEADER_MARKER: &str = "---";
const SLUG_MAX_CHARS: usize = 50;

/// Lifecycle state of a local draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStatus {
    Composing,
    Ready,
    Sent,
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DraftStatus::Composing => "composing",
            DraftStatus::Ready => "ready",
            DraftStatus::Sent => "sent",
        })
    }
}

impl FromStr for DraftStatus {
    type Err = KitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "composing" => Ok(DraftStatus::Composing),
            "ready" => Ok(DraftStatus::Ready),
            "sent" => Ok(DraftStatus::Sent),
            other => Err(KitError::InvalidInput(format!(
                "unknown draft status '{other}' (expected composing, ready, or sent)"
            ))),
        }
    }
}

/// Header fields of a draft file. The identifier is embedded in the file
/// itself, so the store is recoverable from a directory scan alone.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftMetadata {
    pub draft_id: String,
    pub subject: String,
    pub description: Option<String>,
    pub status: DraftStatus,
    pub send_at: Option<String>,
    pub published: Option<bool>,
    pub layout_template: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// A fully parsed draft: header, body, and the file it came from.
#[derive(Debug, Clone)]
pub struct Draft {
    pub metadata: DraftMetadata,
    pub body: String,
    pub path: PathBuf,
}

/// Fields supplied on draft creation.
#[derive(Debug, Clone, Default)]
pub struct NewDraft {
    pub subject: String,
    pub content: String,
    pub description: Option<String>,
    pub send_at: Option<String>,
    pub published: Option<bool>,
    pub layout_template: Option<String>,
}

/// One row of a draft listing.
#[derive(Debug, Clone)]
pub struct DraftSummary {
    pub draft_id: String,
    pub subject: String,
    pub status: DraftStatus,
    pub created_at: DateTime<Utc>,
    pub path: PathBuf,
}

/// Durable staging area for composed-but-unsent broadcasts.
///
/// Each draft is one UTF-8 file in the configured directory; the files are
/// the persisted state and stay human-editable. Single-writer discipline is
/// assumed: nothing else is expected to write these files while a request
/// is being handled.
#[derive(Debug)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    /// The directory must already exist. Refusing to create it guards
    /// against silently writing drafts into an unintended location.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(KitError::Config(format!(
                "drafts directory does not exist: {}",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    /// Serialize a new draft to its own file and return the parsed record.
    pub fn create(&self, new: NewDraft) -> Result<Draft> {
        if new.subject.trim().is_empty() {
            return Err(KitError::InvalidInput(
                "draft subject must not be empty".to_string(),
            ));
        }
        if new.content.trim().is_empty() {
            return Err(KitError::InvalidInput(
                "draft content must not be empty".to_string(),
            ));
        }

        let now = now_millis();
        let draft_id = generate_draft_id(now);
        let metadata = DraftMetadata {
            draft_id: draft_id.clone(),
            subject: new.subject,
            description: new.description,
            status: DraftStatus::Composing,
            send_at: new.send_at,
            published: new.published,
            layout_template: new.layout_template,
            created_at: now,
            modified_at: now,
        };

        let path = self.dir.join(file_name(&metadata.subject, &draft_id, now));
        let body = new.content.trim().to_string();
        fs::write(&path, format_draft(&metadata, &body))?;

        Ok(Draft {
            metadata,
            body,
            path,
        })
    }

    /// Scan the directory for the file embedding `draft_id`.
    ///
    /// Files that do not parse as drafts are skipped: foreign or malformed
    /// files may share the directory without breaking the store.
    pub fn read(&self, draft_id: &str) -> Result<Option<Draft>> {
        for path in self.scan()? {
            match parse_draft_file(&path) {
                Ok(draft) if draft.metadata.draft_id == draft_id => return Ok(Some(draft)),
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unparseable draft file")
                }
            }
        }
        Ok(None)
    }

    /// Every parseable draft in the directory, most recent first.
    pub fn list(&self) -> Result<Vec<DraftSummary>> {
        let mut drafts = Vec::new();
        for path in self.scan()? {
            match parse_draft_file(&path) {
                Ok(draft) => drafts.push(DraftSummary {
                    draft_id: draft.metadata.draft_id,
                    subject: draft.metadata.subject,
                    status: draft.metadata.status,
                    created_at: draft.metadata.created_at,
                    path,
                }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unparseable draft file")
                }
            }
        }
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drafts)
    }

    /// Read-modify-write of the status field; bumps `modified_at`.
    /// Returns false when the identifier does not resolve.
    pub fn update_status(&self, draft_id: &str, status: DraftStatus) -> Result<bool> {
        let Some(mut draft) = self.read(draft_id)? else {
            return Ok(false);
        };
        draft.metadata.status = status;
        draft.metadata.modified_at = now_millis();
        fs::write(&draft.path, format_draft(&draft.metadata, &draft.body))?;
        Ok(true)
    }

    /// Remove the draft's file. Returns false when the identifier does not
    /// resolve.
    pub fn delete(&self, draft_id: &str) -> Result<bool> {
        match self.read(draft_id)? {
            Some(draft) => {
                fs::remove_file(&draft.path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn scan(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Current time clamped to millisecond precision, so the in-memory value
/// is identical to what the file format round-trips.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn generate_draft_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!(
        "draft_{}_{}",
        now.timestamp_millis(),
        suffix.to_lowercase()
    )
}

fn file_name(subject: &str, draft_id: &str, now: DateTime<Utc>) -> String {
    // draft_{millis}_{rand} -> the millis segment keys the file name
    let stamp = draft_id.split('_').nth(1).unwrap_or("0");
    format!(
        "{}_{}_{}.md",
        now.format("%Y-%m-%d"),
        slugify(subject),
        stamp
    )
}

fn slugify(subject: &str) -> String {
    let mut slug = String::new();
    for c in subject.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed: String = slug.trim_matches('-').chars().take(SLUG_MAX_CHARS).collect();
    let trimmed = trimmed.trim_end_matches('-');
    if trimmed.is_empty() {
        "draft".to_string()
    } else {
        trimmed.to_string()
    }
}

fn format_draft(meta: &DraftMetadata, body: &str) -> String {
    let mut header = String::new();
    push_field(&mut header, "subject", &meta.subject);
    if let Some(description) = &meta.description {
        push_field(&mut header, "description", description);
    }
    push_field(
        &mut header,
        "created_at",
        &meta.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    push_field(
        &mut header,
        "modified_at",
        &meta.modified_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    push_field(&mut header, "status", &meta.status.to_string());
    if let Some(send_at) = &meta.send_at {
        push_field(&mut header, "send_at", send_at);
    }
    if let Some(published) = meta.published {
        header.push_str(&format!("published: {published}\n"));
    }
    if let Some(template) = &meta.layout_template {
        push_field(&mut header, "layout_template", template);
    }
    push_field(&mut header, "draft_id", &meta.draft_id);

    format!("{HEADER_MARKER}\n{header}{HEADER_MARKER}\n\n{body}\n")
}

fn push_field(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!("{key}: \"{}\"\n", escape_value(value)));
}

fn escape_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn unescape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_draft_file(path: &Path) -> Result<Draft> {
    let text = fs::read_to_string(path)?;
    let (metadata, body) = parse_draft(&text)?;
    Ok(Draft {
        metadata,
        body,
        path: path.to_path_buf(),
    })
}

fn parse_draft(text: &str) -> Result<(DraftMetadata, String)> {
    let rest = text
        .strip_prefix("---\n")
        .ok_or_else(|| invalid("missing header marker"))?;
    let (header, body) = rest
        .split_once("\n---\n")
        .ok_or_else(|| invalid("unterminated header"))?;

    let mut draft_id = None;
    let mut subject = None;
    let mut description = None;
    let mut status = None;
    let mut send_at = None;
    let mut published = None;
    let mut layout_template = None;
    let mut created_at = None;
    let mut modified_at = None;

    for line in header.lines() {
        let Some((key, raw)) = line.split_once(':') else {
            continue;
        };
        let raw = raw.trim();
        match key.trim() {
            "subject" => subject = Some(field_value(raw)),
            "description" => description = Some(field_value(raw)),
            "status" => status = Some(field_value(raw).parse::<DraftStatus>()?),
            "send_at" => send_at = Some(field_value(raw)),
            "published" => published = field_value(raw).parse::<bool>().ok(),
            "layout_template" => layout_template = Some(field_value(raw)),
            "draft_id" => draft_id = Some(field_value(raw)),
            "created_at" => created_at = Some(parse_timestamp(&field_value(raw))?),
            "modified_at" => modified_at = Some(parse_timestamp(&field_value(raw))?),
            _ => {}
        }
    }

    let metadata = DraftMetadata {
        draft_id: draft_id.ok_or_else(|| invalid("missing draft_id"))?,
        subject: subject.ok_or_else(|| invalid("missing subject"))?,
        description,
        status: status.unwrap_or(DraftStatus::Composing),
        send_at,
        published,
        layout_template,
        created_at: created_at.ok_or_else(|| invalid("missing created_at"))?,
        modified_at: modified_at.ok_or_else(|| invalid("missing modified_at"))?,
    };

    Ok((metadata, body.trim().to_string()))
}

/// Strip surrounding quotes and unescape; bare values pass through.
fn field_value(raw: &str) -> String {
    match raw.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => unescape_value(inner),
        None => raw.to_string(),
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| invalid(&format!("bad timestamp '{value}': {e}")))
}

fn invalid(msg: &str) -> KitError {
    KitError::InvalidInput(format!("invalid draft file: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &tempfile::TempDir) -> DraftStore {
        DraftStore::new(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let err = DraftStore::new("/nonexistent/drafts").unwrap_err();
        assert!(matches!(err, KitError::Config(_)));
    }

    #[test]
    fn test_create_and_read_round_trip() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let created = store
            .create(NewDraft {
                subject: "Weekly Update".to_string(),
                content: "Hello subscribers".to_string(),
                description: Some("internal note".to_string()),
                send_at: Some("2026-09-01T09:00:00Z".to_string()),
                published: Some(false),
                layout_template: Some("default".to_string()),
            })
            .unwrap();

        assert_eq!(created.metadata.status, DraftStatus::Composing);
        assert!(created.path.exists());

        let read = store.read(&created.metadata.draft_id).unwrap().unwrap();
        assert_eq!(read.metadata, created.metadata);
        assert_eq!(read.body, "Hello subscribers");
        assert_eq!(read.path, created.path);
    }

    #[test]
    fn test_round_trip_preserves_quotes_and_backslashes() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let subject = r#"He said "ship it" \ then left"#;
        let created = store
            .create(NewDraft {
                subject: subject.to_string(),
                content: "Body".to_string(),
                description: Some(r#"quotes: "" and a \" mix"#.to_string()),
                ..Default::default()
            })
            .unwrap();

        let read = store.read(&created.metadata.draft_id).unwrap().unwrap();
        assert_eq!(read.metadata.subject, subject);
        assert_eq!(read.metadata, created.metadata);
    }

    #[test]
    fn test_optional_fields_are_omitted_from_header() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let created = store
            .create(NewDraft {
                subject: "Plain".to_string(),
                content: "Body".to_string(),
                ..Default::default()
            })
            .unwrap();

        let text = fs::read_to_string(&created.path).unwrap();
        assert!(!text.contains("description:"));
        assert!(!text.contains("send_at:"));
        assert!(!text.contains("published:"));

        let read = store.read(&created.metadata.draft_id).unwrap().unwrap();
        assert!(read.metadata.description.is_none());
        assert!(read.metadata.send_at.is_none());
        assert!(read.metadata.published.is_none());
    }

    #[test]
    fn test_empty_subject_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let err = store
            .create(NewDraft {
                subject: "  ".to_string(),
                content: "Body".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, KitError::InvalidInput(_)));
        assert!(store.list().unwrap().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_content_is_rejected() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let err = store
            .create(NewDraft {
                subject: "Subject".to_string(),
                content: "\n".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, KitError::InvalidInput(_)));
    }

    #[test]
    fn test_file_name_shape() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let created = store
            .create(NewDraft {
                subject: "Big News!! (August)".to_string(),
                content: "Body".to_string(),
                ..Default::default()
            })
            .unwrap();

        let name = created.path.file_name().unwrap().to_str().unwrap();
        assert!(name.contains("big-news-august"));
        assert!(name.ends_with(".md"));
        let date = name.split('_').next().unwrap();
        assert_eq!(date.len(), 10);
    }

    #[test]
    fn test_list_is_newest_first() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        store
            .create(NewDraft {
                subject: "First".to_string(),
                content: "Body".to_string(),
                ..Default::default()
            })
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        store
            .create(NewDraft {
                subject: "Second".to_string(),
                content: "Body".to_string(),
                ..Default::default()
            })
            .unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].subject, "Second");
        assert_eq!(listed[1].subject, "First");
    }

    #[test]
    fn test_foreign_files_are_skipped() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        fs::write(dir.path().join("notes.md"), "just some notes").unwrap();
        fs::write(dir.path().join("partial.md"), "---\nsubject: \"x\"\n").unwrap();
        fs::write(dir.path().join("README.txt"), "not even markdown").unwrap();

        let created = store
            .create(NewDraft {
                subject: "Real".to_string(),
                content: "Body".to_string(),
                ..Default::default()
            })
            .unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].draft_id, created.metadata.draft_id);
        assert!(store.read(&created.metadata.draft_id).unwrap().is_some());
    }

    #[test]
    fn test_update_status() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let created = store
            .create(NewDraft {
                subject: "S".to_string(),
                content: "Body".to_string(),
                ..Default::default()
            })
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(store
            .update_status(&created.metadata.draft_id, DraftStatus::Ready)
            .unwrap());

        let read = store.read(&created.metadata.draft_id).unwrap().unwrap();
        assert_eq!(read.metadata.status, DraftStatus::Ready);
        assert!(read.metadata.modified_at > read.metadata.created_at);
        assert_eq!(read.body, "Body");

        assert!(!store.update_status("draft_0_zzzzzz", DraftStatus::Sent).unwrap());
    }

    #[test]
    fn test_delete_is_observable() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let created = store
            .create(NewDraft {
                subject: "Doomed".to_string(),
                content: "Body".to_string(),
                ..Default::default()
            })
            .unwrap();
        let id = created.metadata.draft_id.clone();

        assert!(store.delete(&id).unwrap());
        assert!(store.read(&id).unwrap().is_none());
        assert!(store.list().unwrap().is_empty());
        assert!(!store.delete(&id).unwrap());
    }

    #[test]
    fn test_body_may_contain_marker_lines() {
        let dir = tempdir().unwrap();
        let store = store(&dir);

        let body = "intro\n\n---\n\noutro";
        let created = store
            .create(NewDraft {
                subject: "Divided".to_string(),
                content: body.to_string(),
                ..Default::default()
            })
            .unwrap();

        let read = store.read(&created.metadata.draft_id).unwrap().unwrap();
        assert_eq!(read.body, body);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("ready".parse::<DraftStatus>().unwrap(), DraftStatus::Ready);
        assert!("draft".parse::<DraftStatus>().is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Weekly Update"), "weekly-update");
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
        assert_eq!(slugify("!!!"), "draft");
        assert_eq!(slugify(&"a".repeat(80)).len(), SLUG_MAX_CHARS);
    }

    #[test]
    fn test_escape_round_trip() {
        for value in [r#"plain"#, r#"with "quotes""#, r#"back\slash"#, "multi\nline"] {
            assert_eq!(unescape_value(&escape_value(value)), value);
        }
    }
}
