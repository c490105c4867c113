//! External row → local column mapping
//!
//! The single place where external field names are interpreted. Every sync
//! path (full, webhook, import) goes through these functions.

use std::collections::HashMap;

use crate::db::projects::ProjectFields;
use crate::db::sessions::SpeakerFields;
use crate::external::{ExternalProject, ExternalSpeaker};
use crate::validation::normalize_email;

fn first_non_blank<'a>(candidates: impl IntoIterator<Item = &'a Option<String>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Display title: `title`, then `project_name`, then `event_name`
pub fn display_title(project: &ExternalProject) -> String {
    first_non_blank([&project.title, &project.project_name, &project.event_name])
        .unwrap_or_else(|| format!("Project {}", project.id))
}

pub fn project_fields(project: &ExternalProject) -> ProjectFields {
    ProjectFields {
        title: display_title(project),
        description: first_non_blank([&project.description]).unwrap_or_default(),
        event_date: first_non_blank([&project.event_date, &project.start_date]),
        venue: first_non_blank([&project.venue, &project.location]),
    }
}

/// Roster fields for a speaker; rows without a usable email are rejected
pub fn speaker_fields(speaker: &ExternalSpeaker) -> Result<SpeakerFields, String> {
    let raw_email = first_non_blank([&speaker.email])
        .ok_or_else(|| format!("speaker {} has no email", speaker.id))?;
    let email = normalize_email(&raw_email)
        .map_err(|e| format!("speaker {}: {}", speaker.id, e))?;

    let name = first_non_blank([&speaker.name]).unwrap_or_else(|| {
        email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string()
    });

    Ok(SpeakerFields {
        external_id: speaker.id.clone(),
        email,
        name,
        phone: first_non_blank([&speaker.phone]),
        organization: first_non_blank([&speaker.organization, &speaker.affiliation]),
        job_title: first_non_blank([&speaker.job_title, &speaker.position]),
    })
}

/// One planned write for a project row
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectUpsert {
    /// External id already linked to this local project
    Update {
        local_id: String,
        row: ExternalProject,
    },
    /// Unknown external id; insert with a fresh slug
    Insert { row: ExternalProject },
}

/// Partition external rows into updates of known projects and inserts of unknown ones
///
/// Rows repeating an external id collapse to the last occurrence (last write
/// wins). Output keeps first-seen order.
pub fn plan_project_upserts(
    rows: Vec<ExternalProject>,
    known: &HashMap<String, String>,
) -> Vec<ProjectUpsert> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, ExternalProject> = HashMap::new();

    for row in rows {
        if !latest.contains_key(&row.id) {
            order.push(row.id.clone());
        }
        latest.insert(row.id.clone(), row);
    }

    order
        .into_iter()
        .filter_map(|id| latest.remove(&id))
        .map(|row| match known.get(&row.id) {
            Some(local_id) => ProjectUpsert::Update {
                local_id: local_id.clone(),
                row,
            },
            None => ProjectUpsert::Insert { row },
        })
        .collect()
}
