//! Listing view
//!
//! Read-only consumer of the tracker. Nothing is pushed to the view: after
//! any action the caller refreshes, and `wait_for` polls until a section
//! settles on the expected number of rows.

use crate::tracker::AssignmentTracker;
use coursework_common::{types::*, Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Shown in place of an empty section
pub const EMPTY_PLACEHOLDER: &str = "There are no assignments to display.";

/// One rendered row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    pub name: String,
    pub course: String,
    pub status: String,
    /// Notebook names, filled in while the row is expanded
    pub items: Option<Vec<String>>,
}

/// One of the released / fetched / submitted sections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListSection {
    pub kind: ListKind,
    pub rows: Vec<ListRow>,
    /// Set when there are no rows
    pub placeholder: Option<String>,
}

impl ListSection {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything the view shows for the active course
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseListing {
    /// `None` while no course has any assignment
    pub course: Option<String>,
    pub courses: Vec<String>,
    pub released: ListSection,
    pub fetched: ListSection,
    pub submitted: ListSection,
}

impl CourseListing {
    pub fn section(&self, kind: ListKind) -> &ListSection {
        match kind {
            ListKind::Released => &self.released,
            ListKind::Fetched => &self.fetched,
            ListKind::Submitted => &self.submitted,
        }
    }
}

/// Pull-based view over one course at a time
pub struct ListingView {
    tracker: AssignmentTracker,
    selected: Option<String>,
    expanded: BTreeSet<String>,
    poll_interval: Duration,
}

impl ListingView {
    /// Create a view with no explicit course selection
    pub fn new(tracker: AssignmentTracker) -> Self {
        let poll_interval = tracker.config().poll_interval();
        Self {
            tracker,
            selected: None,
            expanded: BTreeSet::new(),
            poll_interval,
        }
    }

    /// Switch the active course; the tracker is not touched
    pub fn select_course(&mut self, course: impl Into<String>) {
        let course = course.into();
        if self.selected.as_deref() != Some(course.as_str()) {
            self.expanded.clear();
        }
        debug!("Listing view switched to course {}", course);
        self.selected = Some(course);
    }

    /// The explicitly selected course, or the first known one
    pub fn active_course(&self) -> Option<String> {
        self.selected
            .clone()
            .or_else(|| self.tracker.courses().into_iter().next())
    }

    /// Expand a collapsed assignment or collapse an expanded one.
    /// Returns whether it is expanded afterwards.
    pub fn toggle_expanded(&mut self, assignment: &str) -> bool {
        if self.expanded.remove(assignment) {
            false
        } else {
            self.expanded.insert(assignment.to_string());
            true
        }
    }

    /// Re-query the tracker for the active course
    pub fn refresh(&self) -> CourseListing {
        let courses = self.tracker.courses();
        let course = self.active_course();

        let section = |kind: ListKind| match &course {
            Some(course) => self.section(course, kind),
            None => ListSection {
                kind,
                rows: Vec::new(),
                placeholder: Some(EMPTY_PLACEHOLDER.to_string()),
            },
        };

        CourseListing {
            released: section(ListKind::Released),
            fetched: section(ListKind::Fetched),
            submitted: section(ListKind::Submitted),
            course,
            courses,
        }
    }

    /// Refresh until the `kind` section has `rows` rows
    pub async fn wait_for(&self, kind: ListKind, rows: usize, timeout: Duration) -> Result<ListSection> {
        let start = Instant::now();

        loop {
            let listing = self.refresh();
            let section = listing.section(kind);
            if section.len() == rows {
                return Ok(section.clone());
            }

            if start.elapsed() > timeout {
                return Err(Error::Timeout {
                    millis: timeout.as_millis() as u64,
                });
            }

            trace!("{} list has {} rows, waiting for {}", kind, section.len(), rows);
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn section(&self, course: &str, kind: ListKind) -> ListSection {
        let rows: Vec<ListRow> = self
            .tracker
            .list(course, kind)
            .into_iter()
            .map(|entry| {
                let items = if kind == ListKind::Fetched && self.expanded.contains(entry.name()) {
                    self.tracker.expand(course, entry.name()).ok()
                } else {
                    None
                };
                ListRow {
                    name: entry.name().to_string(),
                    course: entry.course().to_string(),
                    status: entry.status(),
                    items,
                }
            })
            .collect();

        let placeholder = rows.is_empty().then(|| EMPTY_PLACEHOLDER.to_string());
        ListSection {
            kind,
            rows,
            placeholder,
        }
    }
}
