use anyhow::Result;
use reqwest::Client;
use std::time::Duration;

use crate::settings::Settings;

/// Shared HTTP client for all feed fetches in a run. The timeout applies
/// per request, so a stalled source cannot hold up its siblings past it.
pub fn build_client(settings: &Settings) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(settings.http_timeout_secs))
        .user_agent(settings.user_agent.clone())
        .build()?;
    Ok(client)
}

pub async fn fetch_feed(client: &Client, url: &str) -> Result<String> {
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(body)
}
