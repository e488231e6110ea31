//! Assignment lifecycle tracking
//!
//! Every course owns three collections (released, fetched, submitted). An
//! assignment only ever moves forward through them:
//!
//! ```text
//! UNRELEASED -> RELEASED -> FETCHED -> SUBMITTED(n)
//! ```
//!
//! Operations on the same `(course, assignment)` key are serialized by a
//! per-key async mutex held for the whole operation, including the exchange
//! or validator call. State is only committed after the collaborator has
//! succeeded, so a failure or timeout leaves the collections as they were.

use crate::config::TrackerConfig;
use chrono::Utc;
use coursework_common::{
    exchange::dir_has_content,
    types::*,
    Database, Error, Exchange, FilesystemExchange, NotebookValidator, Result, Validator,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One course's collections plus the lock that serializes its commits
struct CourseSlot {
    records: RwLock<CourseRecords>,
    writer: parking_lot::Mutex<()>,
}

impl CourseSlot {
    fn new(records: CourseRecords) -> Arc<Self> {
        Arc::new(Self {
            records: RwLock::new(records),
            writer: parking_lot::Mutex::new(()),
        })
    }
}

/// Tracker for released, fetched and submitted assignments
#[derive(Clone)]
pub struct AssignmentTracker {
    config: TrackerConfig,
    exchange: Arc<dyn Exchange>,
    validator: Arc<dyn Validator>,
    store: Option<Database>,
    courses: Arc<DashMap<String, Arc<CourseSlot>>>,
    key_locks: Arc<DashMap<AssignmentKey, Arc<Mutex<()>>>>,
}

impl AssignmentTracker {
    /// Create an in-memory tracker
    pub fn new(
        config: TrackerConfig,
        exchange: Arc<dyn Exchange>,
        validator: Arc<dyn Validator>,
    ) -> Self {
        Self {
            config,
            exchange,
            validator,
            store: None,
            courses: Arc::new(DashMap::new()),
            key_locks: Arc::new(DashMap::new()),
        }
    }

    /// Create a persistent tracker over the filesystem exchange described by `config`
    pub async fn open(config: &TrackerConfig) -> Result<Self> {
        config.validate()?;

        let db = Database::open(config.db_path())?;
        let exchange = FilesystemExchange::new(
            config.exchange_root(),
            &config.exchange.source_root,
            config.exchange.student_id.clone(),
        )
        .await?;

        info!("Tracker store at {:?}", config.store_path);

        Self::new(config.clone(), Arc::new(exchange), Arc::new(NotebookValidator::new()))
            .with_store(db)
    }

    /// Restore state from `db` and write every later change through to it
    pub fn with_store(mut self, db: Database) -> Result<Self> {
        for records in db.load_all()? {
            debug!("Restored course {}", records.course);
            self.courses
                .insert(records.course.clone(), CourseSlot::new(records));
        }
        self.store = Some(db);
        Ok(self)
    }

    /// Get configuration
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    // ========================================================================
    // Lifecycle operations
    // ========================================================================

    /// Publish an assignment for a course
    pub async fn release(
        &self,
        course: &str,
        assignment_name: &str,
        mut items: Vec<NotebookItem>,
    ) -> Result<ReleasedEntry> {
        let key = AssignmentKey::new(course, assignment_name);
        key.validate()?;
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        for item in &items {
            item.validate()?;
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));

        if let Some(existing) = self.course_records(course).released(assignment_name) {
            if existing.items == items {
                return Err(Error::DuplicateRelease {
                    course: key.course,
                    assignment: key.assignment,
                });
            }
            debug!("Re-releasing {} with changed items", key);
        }

        self.call("release", self.exchange.release(&key, &items))
            .await?;

        let entry = ReleasedEntry {
            course: course.to_string(),
            assignment_name: assignment_name.to_string(),
            items,
            released_at: Utc::now(),
        };
        let stored = entry.clone();
        self.commit(course, move |records| records.upsert_released(stored))
            .await?;

        info!("Released {} ({} notebooks)", key, entry.items.len());
        Ok(entry)
    }

    /// Copy a released assignment to `destination/<assignment_name>`
    pub async fn fetch(
        &self,
        course: &str,
        assignment_name: &str,
        destination: &Path,
    ) -> Result<FetchedEntry> {
        let key = AssignmentKey::new(course, assignment_name);
        key.validate()?;
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let released = self
            .course_records(course)
            .released(assignment_name)
            .cloned()
            .ok_or_else(|| Error::NotReleased {
                course: key.course.clone(),
                assignment: key.assignment.clone(),
            })?;

        let target = destination.join(assignment_name);
        if !self.config.fetch.allow_overwrite && dir_has_content(&target).await? {
            return Err(Error::DestinationExists { path: target });
        }

        self.call("fetch", self.exchange.fetch(&key, &released.items, &target))
            .await?;

        let entry = FetchedEntry {
            course: course.to_string(),
            assignment_name: assignment_name.to_string(),
            local_path: target,
            items: released.items,
            fetched_at: Utc::now(),
        };
        let stored = entry.clone();
        self.commit(course, move |records| records.upsert_fetched(stored))
            .await?;

        info!("Fetched {} to {:?}", key, entry.local_path);
        Ok(entry)
    }

    /// Hand in the fetched copy of an assignment
    pub async fn submit(&self, course: &str, assignment_name: &str) -> Result<SubmittedEntry> {
        let key = AssignmentKey::new(course, assignment_name);
        key.validate()?;
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let records = self.course_records(course);
        let fetched = records
            .fetched(assignment_name)
            .cloned()
            .ok_or_else(|| Error::NotFetched {
                course: key.course.clone(),
                assignment: key.assignment.clone(),
            })?;
        let attempt = records.submission_count(assignment_name) + 1;

        let receipt = self
            .call("submit", self.exchange.submit(&key, &fetched.local_path))
            .await?;

        let entry = SubmittedEntry {
            course: course.to_string(),
            assignment_name: assignment_name.to_string(),
            submission_id: receipt.submission_id,
            timestamp: receipt.timestamp,
            attempt,
        };
        let stored = entry.clone();
        self.commit(course, move |records| records.submitted.push(stored))
            .await?;

        info!("Submitted {} ({})", key, entry.status());
        Ok(entry)
    }

    /// Entries of one collection, sorted by name
    pub fn list(&self, course: &str, kind: ListKind) -> Vec<Entry> {
        self.course_records(course).list(kind)
    }

    /// Notebook names of an assignment, sorted
    pub fn expand(&self, course: &str, assignment_name: &str) -> Result<Vec<String>> {
        let records = self.course_records(course);
        let items = assignment_items(&records, assignment_name).ok_or_else(|| {
            Error::UnknownAssignment {
                course: course.to_string(),
                assignment: assignment_name.to_string(),
            }
        })?;

        let mut names: Vec<String> = items.into_iter().map(|i| i.name).collect();
        names.sort();
        Ok(names)
    }

    /// Run the validator on one notebook of the fetched copy
    pub async fn validate(
        &self,
        course: &str,
        assignment_name: &str,
        item: &str,
    ) -> Result<ValidationResult> {
        let key = AssignmentKey::new(course, assignment_name);
        key.validate()?;
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let records = self.course_records(course);
        let fetched = match records.fetched(assignment_name) {
            Some(fetched) => fetched,
            None if records.state(assignment_name) == LifecycleState::Unreleased => {
                return Err(Error::UnknownAssignment {
                    course: key.course,
                    assignment: key.assignment,
                })
            }
            None => {
                return Err(Error::NotFetched {
                    course: key.course,
                    assignment: key.assignment,
                })
            }
        };

        let notebook = fetched
            .items
            .iter()
            .find(|i| i.name == item)
            .ok_or_else(|| Error::UnknownItem {
                assignment: assignment_name.to_string(),
                item: item.to_string(),
            })?;
        let path = fetched.local_path.join(&notebook.path);

        let result = self
            .call("validate", self.validator.validate(&path))
            .await?;

        debug!("Validated {} item {}: success={}", key, item, result.success);
        Ok(result)
    }

    /// Courses with at least one entry, sorted by name
    pub fn courses(&self) -> Vec<String> {
        let mut courses: Vec<String> = self
            .courses
            .iter()
            .filter(|slot| !slot.value().records.read().is_empty())
            .map(|slot| slot.key().clone())
            .collect();
        courses.sort();
        courses
    }

    /// Lifecycle position of one assignment
    pub fn state(&self, course: &str, assignment_name: &str) -> LifecycleState {
        self.course_records(course).state(assignment_name)
    }

    /// Copy of a course's collections (empty for an unknown course)
    pub fn course_records(&self, course: &str) -> CourseRecords {
        self.courses
            .get(course)
            .map(|slot| slot.records.read().clone())
            .unwrap_or_else(|| CourseRecords::new(course))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn key_lock(&self, key: &AssignmentKey) -> Arc<Mutex<()>> {
        self.key_locks.entry(key.clone()).or_default().clone()
    }

    /// Run a collaborator call under the configured timeout
    async fn call<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let limit = self.config.collaborator_timeout();
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} timed out after {:?}", operation, limit);
                Err(Error::CollaboratorTimeout {
                    operation: operation.to_string(),
                    millis: limit.as_millis() as u64,
                })
            }
        }
    }

    /// Apply `mutate` to a copy of the course, persist it, then swap it in.
    ///
    /// Runs on the blocking pool so the SQLite write stays off the runtime
    /// workers. Once started it completes even if the caller is dropped.
    /// Readers only wait for the final swap.
    async fn commit<F>(&self, course: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut CourseRecords) + Send + 'static,
    {
        let slot = self
            .courses
            .entry(course.to_string())
            .or_insert_with(|| CourseSlot::new(CourseRecords::new(course)))
            .clone();
        let store = self.store.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let _writer = slot.writer.lock();
            let mut next = slot.records.read().clone();
            mutate(&mut next);

            if let Some(db) = &store {
                db.save_course(&next)?;
            }
            *slot.records.write() = next;
            Ok(())
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }
}

/// Items of an assignment, preferring the fetched copy
fn assignment_items(records: &CourseRecords, assignment: &str) -> Option<Vec<NotebookItem>> {
    if let Some(fetched) = records.fetched(assignment) {
        return Some(fetched.items.clone());
    }
    if let Some(released) = records.released(assignment) {
        return Some(released.items.clone());
    }
    if records.submission_count(assignment) > 0 {
        return Some(Vec::new());
    }
    None
}
