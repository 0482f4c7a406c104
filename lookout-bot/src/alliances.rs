use crate::config::Config;
use crate::error::ApiError;
use async_trait::async_trait;
use lookout_core::{Alliance, AllianceDirectory, DirectoryError};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllianceRecord {
    alliance_name: String,
    #[serde(default)]
    nations: Vec<String>,
}

/// Community-maintained alliance listing.
pub struct AllianceClient {
    http: Client,
    url: String,
}

impl AllianceClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            http,
            url: config.alliance_api_url.clone(),
        })
    }

    pub async fn all(&self) -> Result<Vec<Alliance>, ApiError> {
        let response = self.http.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status(),
                url: self.url.clone(),
            });
        }
        let records: Vec<AllianceRecord> = response.json().await?;
        Ok(records
            .into_iter()
            .map(|r| Alliance {
                name: r.alliance_name,
                member_nations: r.nations,
            })
            .collect())
    }
}

#[async_trait]
impl AllianceDirectory for AllianceClient {
    async fn alliances_of(&self, nation: &str) -> Result<Vec<Alliance>, DirectoryError> {
        let alliances = self
            .all()
            .await
            .map_err(|err| DirectoryError(err.to_string()))?;
        Ok(alliances
            .into_iter()
            .filter(|a| a.member_nations.iter().any(|n| n.eq_ignore_ascii_case(nation)))
            .collect())
    }
}
