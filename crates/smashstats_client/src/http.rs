use crate::{ClientConfig, ClientError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use smashstats_core::prelude::*;
use tracing::{debug, info};

/// Length of a freshly issued upload key.
const KEY_LEN: usize = 36;
/// Length of a public player id.
const PLAYER_ID_LEN: usize = 8;

#[derive(Clone)]
pub struct SmashStatsClient {
    config: ClientConfig,
    client: Client,
}

#[derive(Serialize)]
struct NewPlayerRequest<'a> {
    code: &'a str,
}

#[derive(Deserialize)]
struct NewPlayerResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    code: String,
    #[serde(default)]
    key: String,
}

#[derive(Deserialize)]
struct PingResponse {
    time: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct HasUploadedResponse {
    #[serde(default)]
    uploaded: bool,
}

impl SmashStatsClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::ServerError(status, text));
        }
        Ok(response)
    }

    /// Whether the service answers its ping endpoint with a numeric time.
    pub async fn ping(&self) -> Result<()> {
        let url = format!("{}/api/misc/ping", self.config.server_url);
        let response = Self::check(self.client.get(&url).send().await?).await?;
        let data: PingResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Validation(format!("Failed to parse ping response: {e}")))?;

        match data.time {
            Some(time) if time.is_number() => Ok(()),
            _ => Err(ClientError::Validation(
                "Ping response has no server time".into(),
            )),
        }
    }

    /// Requests a new upload credential for `code`.
    pub async fn request_credential(&self, code: &str) -> Result<UploadCredential> {
        let url = format!("{}/api/player/new", self.config.server_url);
        let response = self
            .client
            .post(&url)
            .json(&NewPlayerRequest { code })
            .send()
            .await?;
        let data: NewPlayerResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|_| ClientError::Validation("Failed to parse new player response".into()))?;

        if data.id.is_empty() || data.code != code || data.key.len() != KEY_LEN {
            return Err(ClientError::Validation(
                "Could not get a new key from server".into(),
            ));
        }

        info!(%code, id = %data.id, "Issued upload credential");
        Ok(UploadCredential::new(data.key, data.id))
    }

    pub async fn has_uploaded(&self, id: &str) -> Result<bool> {
        let url = format!("{}/api/player/hasuploaded/{id}", self.config.server_url);
        let response = Self::check(self.client.get(&url).send().await?).await?;
        let data: HasUploadedResponse = response.json().await.map_err(|_| {
            ClientError::Validation("Failed to parse has-uploaded response".into())
        })?;
        Ok(data.uploaded)
    }

    /// Public link to the player's page, once they have uploaded games.
    pub async fn player_link(&self, id: &str) -> Result<Option<String>> {
        if id.len() != PLAYER_ID_LEN {
            debug!(%id, "Not a public player id");
            return Ok(None);
        }
        let uploaded = self.has_uploaded(id).await?;
        Ok(uploaded.then(|| format!("{}/{id}", self.config.frontend_url)))
    }
}

impl CredentialIssuer for SmashStatsClient {
    type Error = ClientError;

    async fn issue_credential(&self, code: &str) -> Result<UploadCredential> {
        self.request_credential(code).await
    }
}
