//! List, expand and course commands

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::time::Duration;

use coursework_common::ListKind;
use coursework_tracker::{listing::EMPTY_PLACEHOLDER, AssignmentTracker, ListSection, ListingView};

use super::require_course;
use crate::output::{print_document, print_heading, print_list, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ListArgs {
    /// Only show one collection (released, fetched, submitted)
    #[arg(short, long)]
    pub kind: Option<ListKind>,

    /// Show notebooks of this fetched assignment
    #[arg(short, long)]
    pub expand: Vec<String>,

    /// Poll until the selected collection has this many rows
    #[arg(long, requires = "kind")]
    pub wait_for: Option<usize>,

    /// Give up waiting after this many seconds
    #[arg(long, default_value = "10")]
    pub wait_secs: u64,
}

#[derive(Args)]
pub struct ExpandArgs {
    /// Assignment name
    pub assignment: String,
}

/// Row display wrapper for serialization
#[derive(Serialize)]
pub struct RowDisplay {
    pub name: String,
    pub course: String,
    pub status: String,
    pub notebooks: String,
}

impl TableDisplay for RowDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Course", "Status", "Notebooks"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.course.clone(),
            self.status.clone(),
            self.notebooks.clone(),
        ]
    }
}

/// Notebook name display wrapper for serialization
#[derive(Serialize)]
pub struct NotebookDisplay {
    pub assignment: String,
    pub notebook: String,
}

impl TableDisplay for NotebookDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Assignment", "Notebook"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.assignment.clone(), self.notebook.clone()]
    }
}

/// Course display wrapper for serialization
#[derive(Serialize)]
pub struct CourseDisplay {
    pub course: String,
    pub released: usize,
    pub fetched: usize,
    pub submitted: usize,
}

impl TableDisplay for CourseDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Course", "Released", "Fetched", "Submitted"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.course.clone(),
            self.released.to_string(),
            self.fetched.to_string(),
            self.submitted.to_string(),
        ]
    }
}

fn print_section(section: &ListSection, format: OutputFormat) {
    let rows: Vec<RowDisplay> = section
        .rows
        .iter()
        .map(|row| RowDisplay {
            name: row.name.clone(),
            course: row.course.clone(),
            status: row.status.clone(),
            notebooks: row.items.as_ref().map(|i| i.join(", ")).unwrap_or_default(),
        })
        .collect();

    print_heading(&format!("{} assignments", capitalize(&section.kind.to_string())), format);
    print_list(
        &rows,
        format,
        section.placeholder.as_deref().unwrap_or(EMPTY_PLACEHOLDER),
    );
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub async fn list(
    args: ListArgs,
    course: Option<String>,
    tracker: &AssignmentTracker,
    format: OutputFormat,
) -> Result<()> {
    let mut view = ListingView::new(tracker.clone());
    if let Some(course) = course {
        view.select_course(course);
    }
    for assignment in &args.expand {
        view.toggle_expanded(assignment);
    }

    if let (Some(kind), Some(rows)) = (args.kind, args.wait_for) {
        let section = view
            .wait_for(kind, rows, Duration::from_secs(args.wait_secs))
            .await?;
        if format.is_structured() {
            print_document(&section, format);
        } else {
            print_section(&section, format);
        }
        return Ok(());
    }

    let listing = view.refresh();
    if format.is_structured() {
        match args.kind {
            Some(kind) => print_document(listing.section(kind), format),
            None => print_document(&listing, format),
        }
        return Ok(());
    }

    if let Some(course) = &listing.course {
        print_heading(&format!("Course: {}", course), format);
    }

    let kinds: Vec<ListKind> = match args.kind {
        Some(kind) => vec![kind],
        None => ListKind::ALL.to_vec(),
    };
    for kind in kinds {
        print_section(listing.section(kind), format);
    }
    Ok(())
}

pub fn expand(
    args: ExpandArgs,
    course: Option<String>,
    tracker: &AssignmentTracker,
    format: OutputFormat,
) -> Result<()> {
    let course = require_course(course)?;

    let notebooks: Vec<NotebookDisplay> = tracker
        .expand(&course, &args.assignment)?
        .into_iter()
        .map(|notebook| NotebookDisplay {
            assignment: args.assignment.clone(),
            notebook,
        })
        .collect();
    print_list(&notebooks, format, "This assignment has no notebooks.");
    Ok(())
}

pub fn courses(tracker: &AssignmentTracker, format: OutputFormat) {
    let courses: Vec<CourseDisplay> = tracker
        .courses()
        .into_iter()
        .map(|course| {
            let records = tracker.course_records(&course);
            CourseDisplay {
                released: records.released.len(),
                fetched: records.fetched.len(),
                submitted: records.submitted.len(),
                course,
            }
        })
        .collect();
    print_list(&courses, format, "No courses found.");
}
