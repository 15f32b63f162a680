use std::fmt;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{FleetApi, MachineRecord};

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com/v1";
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct FleetCredentials {
    pub client_id: String,
    pub api_key: String,
}

impl fmt::Debug for FleetCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FleetCredentials")
            .field("client_id", &self.client_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Droplet listing client for the DigitalOcean v1 API.
pub struct DigitalOceanClient {
    http: Client,
    base_url: String,
    credentials: FleetCredentials,
}

#[derive(Debug, Deserialize)]
struct DropletListResponse {
    status: String,
    #[serde(default)]
    droplets: Vec<Droplet>,
    error_message: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Droplet {
    name: String,
    ip_address: Option<String>,
}

impl DigitalOceanClient {
    pub fn new(credentials: FleetCredentials, base_url: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self::with_client(http, credentials, base_url))
    }

    pub fn with_client(http: Client, credentials: FleetCredentials, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn droplets_url(&self) -> String {
        format!("{}/droplets/", self.base_url)
    }
}

#[async_trait]
impl FleetApi for DigitalOceanClient {
    async fn list_machines(&self) -> anyhow::Result<Vec<MachineRecord>> {
        let url = self.droplets_url();
        debug!(event = "fleet.http.request", url = %url, "requesting droplet list");
        // reqwest errors carry the full url, which includes the api key.
        let response = self
            .http
            .get(&url)
            .query(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("api_key", self.credentials.api_key.as_str()),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| err.without_url())
            .with_context(|| format!("failed to reach {url}"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| err.without_url())
            .context("failed to read droplet list")?;
        debug!(
            event = "fleet.http.response",
            status = status.as_u16(),
            body_len = body.len(),
            "droplet list received"
        );
        if !status.is_success() {
            let detail = parse_error_message(&body).unwrap_or_default();
            if detail.is_empty() {
                anyhow::bail!("droplet list returned http {}", status.as_u16());
            }
            anyhow::bail!("droplet list returned http {}: {}", status.as_u16(), detail);
        }
        parse_droplet_list(&body)
    }
}

fn parse_droplet_list(body: &str) -> anyhow::Result<Vec<MachineRecord>> {
    let response: DropletListResponse =
        serde_json::from_str(body).context("failed to parse droplet list")?;
    if response.status != "OK" {
        let detail = response
            .error_message
            .or(response.message)
            .unwrap_or_else(|| format!("status {}", response.status));
        anyhow::bail!("droplet list rejected: {detail}");
    }
    Ok(response
        .droplets
        .into_iter()
        .map(|droplet| MachineRecord::new(droplet.name, droplet.ip_address.unwrap_or_default()))
        .collect())
}

fn parse_error_message(body: &str) -> Option<String> {
    let response: DropletListResponse = serde_json::from_str(body).ok()?;
    response.error_message.or(response.message)
}
