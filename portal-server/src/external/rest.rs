//! PostgREST-style client for the external datastore

use async_trait::async_trait;
use portal_common::config::ExternalConfig;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{DirectoryError, ExternalDirectory, ExternalProject, ExternalSpeaker, RowBatch};

const USER_AGENT: &str = concat!("speaker-portal/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for `{url}/rest/v1/{table}` endpoints
pub struct RestDirectoryClient {
    http_client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl RestDirectoryClient {
    pub fn new(config: &ExternalConfig) -> Result<Self, DirectoryError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Raw JSON rows; decoding happens per row so one bad row cannot sink a listing
    async fn fetch_rows(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<Value>, DirectoryError> {
        let url = self.table_url(table);
        debug!(table = %table, url = %url, "Querying external datastore");

        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
        query.extend(filters.iter().cloned());

        let response = self
            .http_client
            .get(&url)
            .query(&query)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DirectoryError::Api(
                status.as_u16(),
                "external datastore rejected the service key".to_string(),
            ));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Api(status.as_u16(), error_text));
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| DirectoryError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ExternalDirectory for RestDirectoryClient {
    async fn list_projects(&self) -> Result<RowBatch<ExternalProject>, DirectoryError> {
        let values = self
            .fetch_rows("projects", &[("order", "id.asc".to_string())])
            .await?;
        Ok(RowBatch::decode(values))
    }

    async fn get_project(&self, id: &str) -> Result<Option<ExternalProject>, DirectoryError> {
        let mut values = self
            .fetch_rows("projects", &[("id", format!("eq.{}", id))])
            .await?;
        values
            .pop()
            .map(|value| {
                serde_json::from_value(value).map_err(|e| DirectoryError::Parse(e.to_string()))
            })
            .transpose()
    }

    async fn list_speakers(
        &self,
        project_id: &str,
    ) -> Result<RowBatch<ExternalSpeaker>, DirectoryError> {
        let values = self
            .fetch_rows(
                "speakers",
                &[
                    ("project_id", format!("eq.{}", project_id)),
                    ("order", "id.asc".to_string()),
                ],
            )
            .await?;
        Ok(RowBatch::decode(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_strips_trailing_slash() {
        let client = RestDirectoryClient::new(&ExternalConfig {
            url: "https://ext.example.com/".to_string(),
            service_key: "k".to_string(),
        })
        .unwrap();
        assert_eq!(
            client.table_url("projects"),
            "https://ext.example.com/rest/v1/projects"
        );
    }
}
