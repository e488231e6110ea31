//! Notebook validation
//!
//! Validation is advisory: it reports whether a notebook looks ready to hand
//! in, without executing it and without touching tracker state.

use crate::types::ValidationResult;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Checks a single assignment item
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, path: &Path) -> Result<ValidationResult>;
}

/// Static checks over an nbformat 4 notebook
#[derive(Debug, Clone, Default)]
pub struct NotebookValidator;

impl NotebookValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate notebook JSON already in memory
    pub fn check(&self, content: &str) -> ValidationResult {
        let notebook: Notebook = match serde_json::from_str(content) {
            Ok(nb) => nb,
            Err(e) => return ValidationResult::failure(vec![format!("invalid notebook: {}", e)]),
        };

        let mut diagnostics = Vec::new();

        for (index, cell) in notebook.cells.iter().enumerate() {
            if cell.cell_type != "code" {
                continue;
            }

            for output in &cell.outputs {
                if output.output_type == "error" {
                    diagnostics.push(format!(
                        "cell {}: {}: {}",
                        index,
                        output.ename.as_deref().unwrap_or("Error"),
                        output.evalue.as_deref().unwrap_or("")
                    ));
                }
            }

            let is_solution = cell
                .metadata
                .nbgrader
                .as_ref()
                .map_or(false, |m| m.solution);
            if is_solution && cell.source.text().contains("raise NotImplementedError") {
                diagnostics.push(format!("cell {}: solution has not been implemented", index));
            }
        }

        if diagnostics.is_empty() {
            ValidationResult::success()
        } else {
            ValidationResult::failure(diagnostics)
        }
    }
}

#[async_trait]
impl Validator for NotebookValidator {
    async fn validate(&self, path: &Path) -> Result<ValidationResult> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(ValidationResult::failure(vec![format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )]))
            }
        };

        let result = self.check(&content);
        debug!(
            "Validated {:?}: success={} ({} diagnostics)",
            path,
            result.success,
            result.diagnostics.len()
        );
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: Source,
    #[serde(default)]
    metadata: CellMetadata,
    #[serde(default)]
    outputs: Vec<Output>,
}

/// Cell source is stored either as one string or a list of lines
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Source {
    Text(String),
    Lines(Vec<String>),
}

impl Default for Source {
    fn default() -> Self {
        Source::Text(String::new())
    }
}

impl Source {
    fn text(&self) -> String {
        match self {
            Source::Text(s) => s.clone(),
            Source::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CellMetadata {
    nbgrader: Option<GraderMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct GraderMetadata {
    #[serde(default)]
    solution: bool,
}

#[derive(Debug, Deserialize)]
struct Output {
    output_type: String,
    ename: Option<String>,
    evalue: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const PASSING: &str = r##"{
        "cells": [
            {"cell_type": "markdown", "metadata": {}, "source": "# Problem 1"},
            {"cell_type": "code", "metadata": {"nbgrader": {"solution": true}},
             "source": ["def squares(n):\n", "    return [i * i for i in range(1, n + 1)]"],
             "outputs": []},
            {"cell_type": "code", "metadata": {"nbgrader": {"grade": true}},
             "source": "assert squares(1) == [1]",
             "outputs": [{"output_type": "stream", "name": "stdout", "text": "ok"}]}
        ],
        "metadata": {}, "nbformat": 4, "nbformat_minor": 0
    }"##;

    const UNIMPLEMENTED: &str = r##"{
        "cells": [
            {"cell_type": "code", "metadata": {"nbgrader": {"solution": true}},
             "source": "def squares(n):\n    raise NotImplementedError()",
             "outputs": []}
        ]
    }"##;

    const FAILED_TEST: &str = r##"{
        "cells": [
            {"cell_type": "code", "metadata": {"nbgrader": {"grade": true}},
             "source": "assert squares(1) == [1]",
             "outputs": [{"output_type": "error", "ename": "AssertionError", "evalue": "", "traceback": []}]}
        ]
    }"##;

    #[test]
    fn test_passing_notebook() {
        let result = NotebookValidator::new().check(PASSING);
        assert!(result.is_success());
        assert!(result.diagnostics.is_empty());
    }

    #[test_case(UNIMPLEMENTED, "solution has not been implemented" ; "unimplemented solution")]
    #[test_case(FAILED_TEST, "AssertionError" ; "error output")]
    #[test_case("not json", "invalid notebook" ; "malformed json")]
    fn test_failing_notebook(content: &str, expected: &str) {
        let result = NotebookValidator::new().check(content);
        assert!(!result.is_success());
        assert!(
            result.diagnostics.iter().any(|d| d.contains(expected)),
            "diagnostics {:?} should mention {}",
            result.diagnostics,
            expected
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_a_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = NotebookValidator::new()
            .validate(&tmp.path().join("missing.ipynb"))
            .await
            .unwrap();
        assert!(!result.is_success());
    }
}
