//! Project/speaker synchronization with the external datastore
//!
//! Batch reconciliation: fetch external rows, look up local rows carrying a
//! matching external id, partition into updates and inserts, then write one
//! row at a time. There is no transaction across the batch. A failing row is
//! logged, recorded in the [`SyncReport`] and skipped; the run carries on.
//!
//! Full sync, webhook sync and ad-hoc import all run through [`SyncEngine`].

pub mod mapping;
pub mod webhook;

use chrono::Utc;
use portal_common::db::{Project, SyncTrigger};
use portal_common::events::{EventBus, PortalEvent};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{projects, sessions, sync_runs};
use crate::external::{DirectoryError, ExternalDirectory, ExternalProject, RejectedRow};
use mapping::{plan_project_upserts, project_fields, speaker_fields, ProjectUpsert};
use portal_common::{slugify, unique_slug};
use webhook::{WebhookPayload, WebhookTarget};

/// Errors that stop a run before any row is processed
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("External datastore unavailable: {0}")]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Local(#[from] portal_common::Error),
}

/// One row that could not be synced
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyncFailure {
    /// "project" or "speaker"
    pub entity: &'static str,
    pub external_id: String,
    pub message: String,
}

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: String,
    pub trigger: SyncTrigger,
    pub projects_inserted: usize,
    pub projects_updated: usize,
    pub speakers_inserted: usize,
    pub speakers_updated: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    fn new(run_id: String, trigger: SyncTrigger) -> Self {
        Self {
            run_id,
            trigger,
            projects_inserted: 0,
            projects_updated: 0,
            speakers_inserted: 0,
            speakers_updated: 0,
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, entity: &'static str, external_id: &str, message: impl Into<String>) {
        let message = message.into();
        warn!(entity, external_id, "Sync skipped row: {}", message);
        self.failures.push(SyncFailure {
            entity,
            external_id: external_id.to_string(),
            message,
        });
    }

    fn reject(&mut self, entity: &'static str, rejected: &[RejectedRow]) {
        for row in rejected {
            self.fail(entity, row.id.as_deref().unwrap_or("-"), row.message.clone());
        }
    }

    fn totals(&self) -> sync_runs::RunTotals {
        sync_runs::RunTotals {
            projects_inserted: self.projects_inserted,
            projects_updated: self.projects_updated,
            speakers_inserted: self.speakers_inserted,
            speakers_updated: self.speakers_updated,
            errors: self
                .failures
                .iter()
                .map(|f| format!("{} {}: {}", f.entity, f.external_id, f.message))
                .collect(),
        }
    }
}

/// Runs sync operations against one external directory
#[derive(Clone)]
pub struct SyncEngine {
    db: SqlitePool,
    directory: Arc<dyn ExternalDirectory>,
    event_bus: EventBus,
}

impl SyncEngine {
    pub fn new(db: SqlitePool, directory: Arc<dyn ExternalDirectory>, event_bus: EventBus) -> Self {
        Self {
            db,
            directory,
            event_bus,
        }
    }

    /// Full sync: every external project, then each synced project's speakers
    pub async fn sync_all(&self, trigger: SyncTrigger) -> Result<SyncReport, SyncError> {
        let mut report = self.begin(trigger).await?;
        let result = self.sync_all_inner(&mut report).await;
        self.complete(report, result).await
    }

    /// Sync one external project and its speakers
    ///
    /// An id the external datastore no longer knows is reported as a failure;
    /// the local copy is left as it is.
    pub async fn sync_project(
        &self,
        external_id: &str,
        trigger: SyncTrigger,
    ) -> Result<SyncReport, SyncError> {
        let mut report = self.begin(trigger).await?;
        let result = self.sync_ids(&[external_id.to_string()], &mut report).await;
        self.complete(report, result).await
    }

    /// Ad-hoc import of selected external projects
    pub async fn import_projects(&self, external_ids: &[String]) -> Result<SyncReport, SyncError> {
        let mut report = self.begin(SyncTrigger::Import).await?;
        let result = self.sync_ids(external_ids, &mut report).await;
        self.complete(report, result).await
    }

    /// Refresh the speaker roster of one external project
    ///
    /// When the project has not been synced yet it is imported first.
    pub async fn sync_speakers_of(
        &self,
        external_project_id: &str,
        trigger: SyncTrigger,
    ) -> Result<SyncReport, SyncError> {
        let mut report = self.begin(trigger).await?;
        let result = async {
            match projects::get_by_external_id(&self.db, external_project_id).await? {
                Some(project) => {
                    self.sync_speakers(&project, &mut report).await;
                    Ok(())
                }
                None => self.sync_ids(&[external_project_id.to_string()], &mut report).await,
            }
        }
        .await;
        self.complete(report, result).await
    }

    /// Dispatch a row-change webhook
    pub async fn handle_webhook(&self, payload: &WebhookPayload) -> Result<SyncReport, SyncError> {
        let target = payload.target();
        info!(
            event_type = payload.event_type.as_deref().unwrap_or("unknown"),
            table = payload.table.as_deref().unwrap_or("unknown"),
            "Webhook received, target {:?}",
            target
        );

        match target {
            WebhookTarget::Project(id) => self.sync_project(&id, SyncTrigger::Webhook).await,
            WebhookTarget::SpeakersOf(id) => self.sync_speakers_of(&id, SyncTrigger::Webhook).await,
            WebhookTarget::Everything => self.sync_all(SyncTrigger::Webhook).await,
        }
    }

    // ------------------------------------------------------------------------

    async fn begin(&self, trigger: SyncTrigger) -> Result<SyncReport, SyncError> {
        let run_id = sync_runs::start(&self.db, trigger).await?;
        info!(run_id = %run_id, %trigger, "Sync run started");

        self.event_bus.emit_lossy(PortalEvent::SyncStarted {
            run_id: run_id.clone(),
            trigger,
            timestamp: Utc::now(),
        });

        Ok(SyncReport::new(run_id, trigger))
    }

    /// Persist totals and emit the completion event, whether or not the run aborted
    async fn complete(
        &self,
        mut report: SyncReport,
        result: Result<(), SyncError>,
    ) -> Result<SyncReport, SyncError> {
        if let Err(e) = &result {
            report.fail("run", "-", e.to_string());
        }

        if let Err(e) = sync_runs::finish(&self.db, &report.run_id, &report.totals()).await {
            warn!(run_id = %report.run_id, "Failed to record sync run: {}", e);
        }

        info!(
            run_id = %report.run_id,
            projects_inserted = report.projects_inserted,
            projects_updated = report.projects_updated,
            speakers_inserted = report.speakers_inserted,
            speakers_updated = report.speakers_updated,
            failures = report.failures.len(),
            "Sync run finished"
        );

        self.event_bus.emit_lossy(PortalEvent::SyncCompleted {
            run_id: report.run_id.clone(),
            trigger: report.trigger,
            projects_inserted: report.projects_inserted,
            projects_updated: report.projects_updated,
            speakers_inserted: report.speakers_inserted,
            speakers_updated: report.speakers_updated,
            failures: report.failures.len(),
            timestamp: Utc::now(),
        });

        result.map(|_| report)
    }

    async fn sync_all_inner(&self, report: &mut SyncReport) -> Result<(), SyncError> {
        let batch = self.directory.list_projects().await?;
        info!(
            "Fetched {} external projects ({} unreadable)",
            batch.rows.len(),
            batch.rejected.len()
        );
        report.reject("project", &batch.rejected);

        let synced = self.upsert_projects(batch.rows, report).await?;

        if portal_common::db::settings::sync_speakers_on_full_sync(&self.db).await? {
            for project in &synced {
                self.sync_speakers(project, report).await;
            }
        }

        Ok(())
    }

    async fn sync_ids(&self, external_ids: &[String], report: &mut SyncReport) -> Result<(), SyncError> {
        let mut rows = Vec::with_capacity(external_ids.len());

        for id in external_ids {
            match self.directory.get_project(id).await {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => report.fail("project", id, "not found in external datastore"),
                Err(e) => report.fail("project", id, e.to_string()),
            }
        }

        let synced = self.upsert_projects(rows, report).await?;
        for project in &synced {
            self.sync_speakers(project, report).await;
        }

        Ok(())
    }

    /// Write project rows one at a time; returns the local rows that were written
    async fn upsert_projects(
        &self,
        rows: Vec<ExternalProject>,
        report: &mut SyncReport,
    ) -> Result<Vec<Project>, SyncError> {
        let known = projects::external_id_map(&self.db).await?;
        let mut taken_slugs = projects::all_slugs(&self.db).await?;
        let mut synced = Vec::new();

        for upsert in plan_project_upserts(rows, &known) {
            match upsert {
                ProjectUpsert::Update { local_id, row } => {
                    let fields = project_fields(&row);
                    match projects::update_from_sync(&self.db, &local_id, &fields).await {
                        Ok(project) => {
                            report.projects_updated += 1;
                            synced.push(project);
                        }
                        Err(e) => report.fail("project", &row.id, e.to_string()),
                    }
                }
                ProjectUpsert::Insert { row } => {
                    let fields = project_fields(&row);
                    let slug = unique_slug(&slugify(&fields.title), &taken_slugs);
                    match projects::insert(&self.db, &slug, &fields, Some(&row.id)).await {
                        Ok(project) => {
                            info!(external_id = %row.id, slug = %slug, "Imported project");
                            taken_slugs.insert(slug);
                            report.projects_inserted += 1;
                            synced.push(project);
                        }
                        Err(e) => report.fail("project", &row.id, e.to_string()),
                    }
                }
            }
        }

        Ok(synced)
    }

    /// Reconcile one project's speakers; failures are recorded, never returned
    async fn sync_speakers(&self, project: &Project, report: &mut SyncReport) {
        let Some(external_project_id) = project.external_project_id.as_deref() else {
            return;
        };

        let rows = match self.directory.list_speakers(external_project_id).await {
            Ok(batch) => {
                report.reject("speaker", &batch.rejected);
                batch.rows
            }
            Err(e) => {
                report.fail("project", external_project_id, format!("speaker fetch failed: {}", e));
                return;
            }
        };

        let local = match sessions::list_for_project(&self.db, &project.id).await {
            Ok(local) => local,
            Err(e) => {
                report.fail("project", external_project_id, e.to_string());
                return;
            }
        };

        // email -> (session id, external speaker id already attached)
        let mut by_external: HashMap<String, String> = HashMap::new();
        let mut by_email: HashMap<String, (String, Option<String>)> = HashMap::new();
        for session in local {
            if let Some(ext) = &session.external_speaker_id {
                by_external.insert(ext.clone(), session.id.clone());
            }
            by_email.insert(session.email, (session.id, session.external_speaker_id));
        }

        for row in rows {
            let fields = match speaker_fields(&row) {
                Ok(fields) => fields,
                Err(message) => {
                    report.fail("speaker", &row.id, message);
                    continue;
                }
            };

            // Known external id first, then adopt a session the speaker created themselves.
            // A session already linked to another roster row is never taken over.
            let existing = match by_external.get(&fields.external_id) {
                Some(session_id) => Some(session_id.clone()),
                None => match by_email.get(&fields.email) {
                    Some((_, Some(owner))) => {
                        report.fail(
                            "speaker",
                            &row.id,
                            format!("email {} already belongs to speaker {}", fields.email, owner),
                        );
                        continue;
                    }
                    Some((session_id, None)) => Some(session_id.clone()),
                    None => None,
                },
            };

            let result = match existing {
                Some(session_id) => sessions::update_synced(&self.db, &session_id, &fields)
                    .await
                    .map(|s| (s, false)),
                None => sessions::insert_synced(&self.db, &project.id, &fields)
                    .await
                    .map(|s| (s, true)),
            };

            match result {
                Ok((session, inserted)) => {
                    if inserted {
                        report.speakers_inserted += 1;
                    } else {
                        report.speakers_updated += 1;
                    }
                    by_external.insert(fields.external_id.clone(), session.id.clone());
                    by_email.insert(session.email, (session.id, Some(fields.external_id)));
                }
                Err(e) => report.fail("speaker", &row.id, e.to_string()),
            }
        }
    }
}
