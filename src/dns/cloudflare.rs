use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::provider::{record_type_for, Credentials, DnsProvider, DnsRecord};
use crate::error::ProviderError;

const LIST_ACTION: &str = "rec_load_all";
const EDIT_ACTION: &str = "rec_edit";

// Fixed per provider convention: automatic TTL, traffic proxied.
const RECORD_TTL: &str = "1";
const SERVICE_MODE: &str = "1";

pub struct CloudflareProvider {
    client: Client,
    api_url: String,
    zone: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    result: String,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    err_code: Option<Value>,
    #[serde(default)]
    response: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RecLoadAll {
    recs: RecordSet,
}

#[derive(Debug, Deserialize)]
struct RecordSet {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    objs: Vec<CloudflareRecord>,
}

#[derive(Debug, Deserialize)]
struct CloudflareRecord {
    #[serde(deserialize_with = "string_or_number")]
    rec_id: String,
    display_name: String,
    #[serde(default, rename = "type")]
    record_type: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl From<CloudflareRecord> for DnsRecord {
    fn from(record: CloudflareRecord) -> Self {
        DnsRecord {
            id: record.rec_id,
            name: record.display_name,
            record_type: record.record_type,
            content: record.content,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Human readable meaning of an HTTP status returned by the API.
pub fn describe_status(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorised",
        403 => "Forbidden",
        404 => "Not Found",
        410 => "Gone",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        550 => "Permission Denied",
        _ => "Unrecognised HTTP response code",
    }
}

fn describe_error_code(code: &str) -> Option<&'static str> {
    match code {
        "E_UNAUTH" => Some("authentication could not be completed"),
        "E_INVLDINPUT" => Some("some input was not valid"),
        "E_MAXAPI" => Some("allowed number of API calls exceeded"),
        _ => None,
    }
}

impl CloudflareProvider {
    pub fn new(
        api_url: &str,
        zone: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ProviderError::Transport {
                call: "client setup",
                source,
            })?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            zone: zone.to_string(),
            credentials,
        })
    }

    fn base_params(&self, action: &'static str) -> Vec<(&'static str, String)> {
        vec![
            ("a", action.to_string()),
            ("tkn", self.credentials.api_key.clone()),
            ("email", self.credentials.email.clone()),
            ("z", self.zone.clone()),
        ]
    }

    /// Issues one API call and returns its envelope once it reports success.
    async fn call(
        &self,
        action: &'static str,
        params: &[(&'static str, String)],
    ) -> Result<Envelope, ProviderError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(params)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                call: action,
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ProviderError::Status {
                call: action,
                status: status.as_u16(),
                reason: describe_status(status.as_u16()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ProviderError::Transport {
                call: action,
                source,
            })?;

        check_envelope(action, &body)
    }
}

fn check_envelope(action: &'static str, body: &str) -> Result<Envelope, ProviderError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|source| ProviderError::Decode {
            call: action,
            source,
        })?;

    if envelope.result != "success" {
        let code = match envelope.err_code {
            Some(Value::String(code)) => code,
            Some(Value::Null) | None => "unknown".to_string(),
            Some(other) => other.to_string(),
        };
        let message = envelope
            .msg
            .or_else(|| describe_error_code(&code).map(str::to_string))
            .unwrap_or_else(|| format!("result {:?}", envelope.result));

        return Err(ProviderError::Api {
            call: action,
            code,
            message,
        });
    }

    Ok(envelope)
}

/// Decodes the `response` member of a successful envelope.
fn decode_response<T: DeserializeOwned>(
    action: &'static str,
    envelope: Envelope,
) -> Result<T, ProviderError> {
    let response = match envelope.response {
        Some(Value::Null) | None => return Err(ProviderError::MissingResponse { call: action }),
        Some(response) => response,
    };

    serde_json::from_value(response).map_err(|source| ProviderError::Decode {
        call: action,
        source,
    })
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_records(&self) -> Result<Vec<DnsRecord>, ProviderError> {
        tracing::info!("Obtaining records for zone {}", self.zone);

        let params = self.base_params(LIST_ACTION);
        let envelope = self.call(LIST_ACTION, &params).await?;
        let loaded: RecLoadAll = decode_response(LIST_ACTION, envelope)?;

        let records: Vec<DnsRecord> = loaded
            .recs
            .objs
            .into_iter()
            .map(DnsRecord::from)
            .collect();

        if let Some(count) = loaded.recs.count {
            if count != records.len() as u64 {
                tracing::warn!(
                    "Provider reported {} records for {} but returned {}",
                    count,
                    self.zone,
                    records.len()
                );
            }
        }

        tracing::info!("Obtained {} records for zone {}", records.len(), self.zone);
        Ok(records)
    }

    async fn update_record(
        &self,
        record_id: &str,
        hostname: &str,
        address: IpAddr,
    ) -> Result<(), ProviderError> {
        tracing::info!("Updating record {} ({}) to {}", hostname, record_id, address);

        let mut params = self.base_params(EDIT_ACTION);
        params.extend([
            ("type", record_type_for(address).to_string()),
            ("id", record_id.to_string()),
            ("name", hostname.to_string()),
            ("content", address.to_string()),
            ("ttl", RECORD_TTL.to_string()),
            ("service_mode", SERVICE_MODE.to_string()),
        ]);

        // Only the result flag matters; the echoed record is not needed.
        self.call(EDIT_ACTION, &params).await?;

        tracing::info!("Updated record {} successfully", hostname);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
