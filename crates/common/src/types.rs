//! Core types for Coursework

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, PathBuf};

use crate::{Error, Result};

/// Identity of an assignment: the course it belongs to and its name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub course: String,
    pub assignment: String,
}

impl AssignmentKey {
    pub fn new(course: impl Into<String>, assignment: impl Into<String>) -> Self {
        Self {
            course: course.into(),
            assignment: assignment.into(),
        }
    }

    /// Both parts become single directory names in the exchange and in
    /// fetch destinations, so neither may be empty, `.`, `..`, or contain a
    /// path separator.
    pub fn validate(&self) -> Result<()> {
        check_name("course", &self.course)?;
        check_name("assignment", &self.assignment)
    }
}

fn check_name(what: &'static str, name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        "is empty"
    } else if name == "." || name == ".." {
        "refers to a directory, not a name"
    } else if name.contains(['/', '\\', '\0']) {
        "contains a path separator"
    } else {
        return Ok(());
    };

    Err(Error::InvalidName {
        what,
        name: name.to_string(),
        reason,
    })
}

impl std::fmt::Display for AssignmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.course, self.assignment)
    }
}

/// A notebook (or problem) that makes up an assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookItem {
    /// Display name, used for ordering
    pub name: String,
    /// File path relative to the assignment directory
    pub path: PathBuf,
}

impl NotebookItem {
    /// Item stored as `<name>.ipynb`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let path = PathBuf::from(format!("{}.ipynb", name));
        Self { name, path }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// The item path must stay inside the assignment directory
    pub fn validate(&self) -> Result<()> {
        let inside = !self.path.as_os_str().is_empty()
            && self
                .path
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if inside {
            Ok(())
        } else {
            Err(Error::InvalidName {
                what: "notebook",
                name: self.path.display().to_string(),
                reason: "path leaves the assignment directory",
            })
        }
    }
}

/// An assignment published for a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasedEntry {
    pub course: String,
    pub assignment_name: String,
    #[serde(default)]
    pub items: Vec<NotebookItem>,
    pub released_at: DateTime<Utc>,
}

/// A released assignment copied into a student working directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedEntry {
    pub course: String,
    pub assignment_name: String,
    pub local_path: PathBuf,
    #[serde(default)]
    pub items: Vec<NotebookItem>,
    pub fetched_at: DateTime<Utc>,
}

/// One hand-in of a fetched assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedEntry {
    pub course: String,
    pub assignment_name: String,
    pub submission_id: String,
    pub timestamp: DateTime<Utc>,
    /// 1-based submission counter for this assignment
    pub attempt: u32,
}

impl SubmittedEntry {
    /// Status text shown next to the submission
    pub fn status(&self) -> String {
        if self.attempt <= 1 {
            "submitted".to_string()
        } else {
            format!("submitted #{}", self.attempt)
        }
    }
}

/// What the exchange hands back after storing a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub submission_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Which of the three per-course collections to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Released,
    Fetched,
    Submitted,
}

impl ListKind {
    pub const ALL: [ListKind; 3] = [ListKind::Released, ListKind::Fetched, ListKind::Submitted];
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListKind::Released => write!(f, "released"),
            ListKind::Fetched => write!(f, "fetched"),
            ListKind::Submitted => write!(f, "submitted"),
        }
    }
}

impl std::str::FromStr for ListKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "released" => Ok(ListKind::Released),
            "fetched" | "downloaded" => Ok(ListKind::Fetched),
            "submitted" => Ok(ListKind::Submitted),
            other => Err(format!("unknown list kind: {}", other)),
        }
    }
}

/// A listed entry of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Released(ReleasedEntry),
    Fetched(FetchedEntry),
    Submitted(SubmittedEntry),
}

impl Entry {
    pub fn kind(&self) -> ListKind {
        match self {
            Entry::Released(_) => ListKind::Released,
            Entry::Fetched(_) => ListKind::Fetched,
            Entry::Submitted(_) => ListKind::Submitted,
        }
    }

    pub fn course(&self) -> &str {
        match self {
            Entry::Released(e) => &e.course,
            Entry::Fetched(e) => &e.course,
            Entry::Submitted(e) => &e.course,
        }
    }

    /// Display name (the assignment name)
    pub fn name(&self) -> &str {
        match self {
            Entry::Released(e) => &e.assignment_name,
            Entry::Fetched(e) => &e.assignment_name,
            Entry::Submitted(e) => &e.assignment_name,
        }
    }

    pub fn status(&self) -> String {
        match self {
            Entry::Released(_) => "released".to_string(),
            Entry::Fetched(_) => "fetched".to_string(),
            Entry::Submitted(e) => e.status(),
        }
    }
}

/// Lifecycle position of one assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Unreleased,
    Released,
    Fetched,
    Submitted(u32),
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Unreleased
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Unreleased => write!(f, "unreleased"),
            LifecycleState::Released => write!(f, "released"),
            LifecycleState::Fetched => write!(f, "fetched"),
            LifecycleState::Submitted(n) => write!(f, "submitted({})", n),
        }
    }
}

/// Advisory outcome of validating one notebook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            success: true,
            diagnostics: Vec::new(),
        }
    }

    pub fn failure(diagnostics: Vec<String>) -> Self {
        Self {
            success: false,
            diagnostics,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// The three collections owned by one course, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseRecords {
    pub course: String,
    #[serde(default)]
    pub released: Vec<ReleasedEntry>,
    #[serde(default)]
    pub fetched: Vec<FetchedEntry>,
    #[serde(default)]
    pub submitted: Vec<SubmittedEntry>,
}

impl CourseRecords {
    pub fn new(course: impl Into<String>) -> Self {
        Self {
            course: course.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.released.is_empty() && self.fetched.is_empty() && self.submitted.is_empty()
    }

    pub fn released(&self, assignment: &str) -> Option<&ReleasedEntry> {
        self.released.iter().find(|e| e.assignment_name == assignment)
    }

    pub fn fetched(&self, assignment: &str) -> Option<&FetchedEntry> {
        self.fetched.iter().find(|e| e.assignment_name == assignment)
    }

    pub fn submission_count(&self, assignment: &str) -> u32 {
        self.submitted
            .iter()
            .filter(|e| e.assignment_name == assignment)
            .count() as u32
    }

    /// Insert or replace the released entry for its assignment
    pub fn upsert_released(&mut self, entry: ReleasedEntry) {
        match self
            .released
            .iter_mut()
            .find(|e| e.assignment_name == entry.assignment_name)
        {
            Some(existing) => *existing = entry,
            None => self.released.push(entry),
        }
    }

    /// Insert or replace the fetched entry for its assignment
    pub fn upsert_fetched(&mut self, entry: FetchedEntry) {
        match self
            .fetched
            .iter_mut()
            .find(|e| e.assignment_name == entry.assignment_name)
        {
            Some(existing) => *existing = entry,
            None => self.fetched.push(entry),
        }
    }

    pub fn state(&self, assignment: &str) -> LifecycleState {
        let submissions = self.submission_count(assignment);
        if submissions > 0 {
            LifecycleState::Submitted(submissions)
        } else if self.fetched(assignment).is_some() {
            LifecycleState::Fetched
        } else if self.released(assignment).is_some() {
            LifecycleState::Released
        } else {
            LifecycleState::Unreleased
        }
    }

    /// Materialize one collection, sorted by name with insertion order on ties
    pub fn list(&self, kind: ListKind) -> Vec<Entry> {
        let mut entries: Vec<Entry> = match kind {
            ListKind::Released => self.released.iter().cloned().map(Entry::Released).collect(),
            ListKind::Fetched => self.fetched.iter().cloned().map(Entry::Fetched).collect(),
            ListKind::Submitted => self.submitted.iter().cloned().map(Entry::Submitted).collect(),
        };
        // sort_by is stable
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        entries
    }
}
