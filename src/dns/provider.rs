use std::fmt;
use std::net::IpAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, ProviderError};

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("api_key", &"********")
            .finish()
    }
}

/// A record as listed by the provider. Only used for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsRecord {
    pub id: String,
    pub name: String,
    pub record_type: Option<String>,
    pub content: Option<String>,
}

/// Address record type for `ip`.
pub fn record_type_for(ip: IpAddr) -> &'static str {
    match ip {
        IpAddr::V4(_) => "A",
        IpAddr::V6(_) => "AAAA",
    }
}

/// Looks up the ID of the record whose display name is exactly `hostname`.
pub fn find_record_id<'a>(records: &'a [DnsRecord], hostname: &str) -> Result<&'a str, AgentError> {
    records
        .iter()
        .find(|record| record.name == hostname)
        .map(|record| record.id.as_str())
        .ok_or_else(|| AgentError::RecordNotFound {
            hostname: hostname.to_string(),
        })
}

#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record in the configured zone
    async fn list_records(&self) -> Result<Vec<DnsRecord>, ProviderError>;

    /// Point the record `record_id` (named `hostname`) at `address`
    async fn update_record(
        &self,
        record_id: &str,
        hostname: &str,
        address: IpAddr,
    ) -> Result<(), ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
