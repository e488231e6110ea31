//! Shared fixtures for tracker integration tests

#![allow(dead_code)]

use coursework_common::{FilesystemExchange, NotebookItem, NotebookValidator};
use coursework_tracker::{AssignmentTracker, TrackerConfig};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A course directory with release sources, an exchange and a student workspace
pub struct Classroom {
    pub tmp: TempDir,
    pub config: TrackerConfig,
}

impl Classroom {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();

        write_notebook(&tmp.path().join("release/ps.01/problem 1.ipynb"), true);
        write_notebook(&tmp.path().join("release/Problem Set 1/Problem 1.ipynb"), true);
        write_notebook(&tmp.path().join("release/Problem Set 1/Problem 2.ipynb"), false);

        let mut config = TrackerConfig::default();
        config.store_path = tmp.path().join("store");
        config.exchange.source_root = tmp.path().join("release");
        config.exchange.student_id = "student".to_string();
        config.timeouts.collaborator_ms = 5_000;
        config.listing.poll_interval_ms = 10;

        Self { tmp, config }
    }

    /// Student working directory that fetched assignments land in
    pub fn workspace(&self) -> PathBuf {
        self.tmp.path().join("work")
    }

    pub async fn exchange(&self) -> FilesystemExchange {
        FilesystemExchange::new(
            self.config.exchange_root(),
            &self.config.exchange.source_root,
            self.config.exchange.student_id.clone(),
        )
        .await
        .unwrap()
    }

    /// In-memory tracker over the filesystem exchange
    pub async fn tracker(&self) -> AssignmentTracker {
        AssignmentTracker::new(
            self.config.clone(),
            Arc::new(self.exchange().await),
            Arc::new(NotebookValidator::new()),
        )
    }
}

pub fn items(names: &[&str]) -> Vec<NotebookItem> {
    names.iter().map(|n| NotebookItem::new(*n)).collect()
}

/// Write a one-problem notebook; a broken one has a failing test cell
pub fn write_notebook(path: &Path, passing: bool) {
    let test_outputs = if passing {
        json!([])
    } else {
        json!([{
            "output_type": "error",
            "ename": "AssertionError",
            "evalue": "squares(2) should be [1, 4]",
            "traceback": []
        }])
    };

    let notebook = json!({
        "cells": [
            {
                "cell_type": "code",
                "metadata": {"nbgrader": {"solution": true, "grade": false}},
                "source": ["def squares(n):\n", "    return [i * i for i in range(1, n + 1)]\n"],
                "outputs": [],
                "execution_count": 1
            },
            {
                "cell_type": "code",
                "metadata": {"nbgrader": {"solution": false, "grade": true, "points": 1}},
                "source": "assert squares(2) == [1, 4]",
                "outputs": test_outputs,
                "execution_count": 2
            }
        ],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 0
    });

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec_pretty(&notebook).unwrap()).unwrap();
}
