use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;

use super::parse_address;
use crate::error::ResolutionError;

/// Asks a "what is my IP" service for the host's public address.
pub async fn get_external_ip(url: &str, timeout: Duration) -> Result<IpAddr, ResolutionError> {
    let transport = |source| ResolutionError::Transport {
        url: url.to_string(),
        source,
    };

    let client = Client::builder().timeout(timeout).build().map_err(transport)?;

    tracing::debug!("Querying IP resolver {}", url);
    let response = client.get(url).send().await.map_err(transport)?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(ResolutionError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(transport)?;

    parse_address(&body).ok_or_else(|| ResolutionError::InvalidAddress {
        origin: format!("resolver {}", url),
        value: body.trim().to_string(),
    })
}
