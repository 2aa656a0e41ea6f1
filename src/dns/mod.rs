mod cloudflare;
mod provider;

pub use cloudflare::{describe_status, CloudflareProvider};
pub use provider::{find_record_id, record_type_for, Credentials, DnsProvider, DnsRecord};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::config::ZoneConfig;

pub fn create_provider(
    zone: &ZoneConfig,
    credentials: Credentials,
    timeout: Duration,
) -> Result<Arc<dyn DnsProvider>> {
    match zone.provider.to_lowercase().as_str() {
        "cloudflare" => Ok(Arc::new(CloudflareProvider::new(
            &zone.api_url,
            &zone.name,
            credentials,
            timeout,
        )?)),
        _ => Err(anyhow!("Unknown DNS provider: {}", zone.provider)),
    }
}
