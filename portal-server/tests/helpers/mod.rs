//! Shared fixtures for portal-server integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use portal_common::db::init_memory_database;
use portal_server::external::{
    id_to_string, DirectoryError, ExternalDirectory, ExternalProject, ExternalSpeaker, RowBatch,
};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Mutex;

/// External directory held in memory, with failure injection
///
/// Rows are kept as raw JSON so malformed rows can be served next to good ones.
#[derive(Default)]
pub struct InMemoryDirectory {
    projects: Mutex<Vec<Value>>,
    speakers: Mutex<Vec<Value>>,
    unavailable: Mutex<bool>,
    failing_rosters: Mutex<HashSet<String>>,
}

fn row_id(row: &Value, key: &str) -> Option<String> {
    row.get(key).and_then(id_to_string)
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(&self, project: ExternalProject) {
        self.add_raw_project(serde_json::to_value(project).unwrap());
    }

    /// Served as-is, even when it would not decode
    pub fn add_raw_project(&self, row: Value) {
        self.projects.lock().unwrap().push(row);
    }

    pub fn replace_project(&self, project: ExternalProject) {
        self.remove_project(&project.id);
        self.add_project(project);
    }

    pub fn remove_project(&self, id: &str) {
        self.projects
            .lock()
            .unwrap()
            .retain(|row| row_id(row, "id").as_deref() != Some(id));
    }

    pub fn add_speaker(&self, speaker: ExternalSpeaker) {
        self.add_raw_speaker(serde_json::to_value(speaker).unwrap());
    }

    pub fn add_raw_speaker(&self, row: Value) {
        self.speakers.lock().unwrap().push(row);
    }

    /// Every call fails with a network error
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// Speaker listing for this project fails
    pub fn fail_roster(&self, project_id: &str) {
        self.failing_rosters
            .lock()
            .unwrap()
            .insert(project_id.to_string());
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if *self.unavailable.lock().unwrap() {
            return Err(DirectoryError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ExternalDirectory for InMemoryDirectory {
    async fn list_projects(&self) -> Result<RowBatch<ExternalProject>, DirectoryError> {
        self.check_available()?;
        Ok(RowBatch::decode(self.projects.lock().unwrap().clone()))
    }

    async fn get_project(&self, id: &str) -> Result<Option<ExternalProject>, DirectoryError> {
        self.check_available()?;
        let row = self
            .projects
            .lock()
            .unwrap()
            .iter()
            .find(|row| row_id(row, "id").as_deref() == Some(id))
            .cloned();
        row.map(|row| {
            serde_json::from_value(row).map_err(|e| DirectoryError::Parse(e.to_string()))
        })
        .transpose()
    }

    async fn list_speakers(
        &self,
        project_id: &str,
    ) -> Result<RowBatch<ExternalSpeaker>, DirectoryError> {
        self.check_available()?;
        if self.failing_rosters.lock().unwrap().contains(project_id) {
            return Err(DirectoryError::Api(500, "roster query failed".to_string()));
        }
        let rows: Vec<Value> = self
            .speakers
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row_id(row, "project_id").as_deref() == Some(project_id))
            .cloned()
            .collect();
        Ok(RowBatch::decode(rows))
    }
}

pub fn external_project(id: &str, title: &str) -> ExternalProject {
    ExternalProject {
        id: id.to_string(),
        title: Some(title.to_string()),
        ..Default::default()
    }
}

pub fn external_speaker(id: &str, project_id: &str, name: &str, email: &str) -> ExternalSpeaker {
    ExternalSpeaker {
        id: id.to_string(),
        project_id: project_id.to_string(),
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        ..Default::default()
    }
}

pub async fn setup_db() -> SqlitePool {
    init_memory_database()
        .await
        .expect("Should create in-memory database")
}
