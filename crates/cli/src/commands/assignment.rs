//! Release, fetch, submit and validate

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use coursework_common::{exchange::discover_items, Entry};
use coursework_tracker::AssignmentTracker;

use super::{require_course, EntryDisplay};
use crate::output::{print_item, print_success, print_warning, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ReleaseArgs {
    /// Assignment name (a directory under the release source root)
    pub assignment: String,
}

#[derive(Args)]
pub struct FetchArgs {
    /// Assignment name
    pub assignment: String,

    /// Directory the assignment is copied into
    #[arg(short, long, default_value = ".")]
    pub dest: PathBuf,
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Assignment name
    pub assignment: String,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Assignment name
    pub assignment: String,

    /// Notebook name
    pub item: String,
}

/// Validation display wrapper for serialization
#[derive(Serialize)]
pub struct ValidationDisplay {
    pub assignment: String,
    pub item: String,
    pub success: bool,
    pub diagnostics: Vec<String>,
}

impl TableDisplay for ValidationDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Assignment", "Notebook", "Result", "Diagnostics"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.assignment.clone(),
            self.item.clone(),
            if self.success { "passed" } else { "failed" }.to_string(),
            self.diagnostics.join("\n"),
        ]
    }
}

pub async fn release(
    args: ReleaseArgs,
    course: Option<String>,
    tracker: &AssignmentTracker,
    format: OutputFormat,
) -> Result<()> {
    let course = require_course(course)?;
    let source = tracker.config().exchange.source_root.join(&args.assignment);
    let items = discover_items(&source).await?;
    if items.is_empty() {
        print_warning(&format!("No notebooks found in {}", source.display()));
    }

    let entry = tracker.release(&course, &args.assignment, items).await?;
    print_success(&format!("Released '{}' for {}", entry.assignment_name, entry.course));
    print_item(&EntryDisplay::from(&Entry::Released(entry)), format);
    Ok(())
}

pub async fn fetch(
    args: FetchArgs,
    course: Option<String>,
    tracker: &AssignmentTracker,
    format: OutputFormat,
) -> Result<()> {
    let course = require_course(course)?;

    let entry = tracker.fetch(&course, &args.assignment, &args.dest).await?;
    print_success(&format!(
        "Fetched '{}' into {}",
        entry.assignment_name,
        entry.local_path.display()
    ));
    print_item(&EntryDisplay::from(&Entry::Fetched(entry)), format);
    Ok(())
}

pub async fn submit(
    args: SubmitArgs,
    course: Option<String>,
    tracker: &AssignmentTracker,
    format: OutputFormat,
) -> Result<()> {
    let course = require_course(course)?;

    let entry = tracker.submit(&course, &args.assignment).await?;
    print_success(&format!(
        "Submitted '{}' as {}",
        entry.assignment_name, entry.submission_id
    ));
    print_item(&EntryDisplay::from(&Entry::Submitted(entry)), format);
    Ok(())
}

/// Prints the result and reports whether the notebook passed
pub async fn validate(
    args: ValidateArgs,
    course: Option<String>,
    tracker: &AssignmentTracker,
    format: OutputFormat,
) -> Result<bool> {
    let course = require_course(course)?;

    let result = tracker.validate(&course, &args.assignment, &args.item).await?;
    let display = ValidationDisplay {
        assignment: args.assignment,
        item: args.item,
        success: result.success,
        diagnostics: result.diagnostics,
    };
    print_item(&display, format);
    Ok(display.success)
}
