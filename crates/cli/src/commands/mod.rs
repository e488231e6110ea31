//! CLI Commands

pub mod assignment;
pub mod listing;

use anyhow::Result;
use coursework_common::Entry;
use serde::Serialize;

use crate::output::TableDisplay;

/// Entry display wrapper for serialization
#[derive(Serialize)]
pub struct EntryDisplay {
    pub name: String,
    pub course: String,
    pub status: String,
    pub detail: String,
}

impl From<&Entry> for EntryDisplay {
    fn from(entry: &Entry) -> Self {
        let detail = match entry {
            Entry::Released(e) => format!("{} notebooks", e.items.len()),
            Entry::Fetched(e) => e.local_path.display().to_string(),
            Entry::Submitted(e) => e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        Self {
            name: entry.name().to_string(),
            course: entry.course().to_string(),
            status: entry.status(),
            detail,
        }
    }
}

impl TableDisplay for EntryDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Course", "Status", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.course.clone(),
            self.status.clone(),
            self.detail.clone(),
        ]
    }
}

/// Lifecycle commands act on exactly one course
pub fn require_course(course: Option<String>) -> Result<String> {
    course.ok_or_else(|| anyhow::anyhow!("no course given; pass --course or set COURSEWORK_COURSE"))
}
