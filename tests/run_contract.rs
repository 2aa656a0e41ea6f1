//! End-to-end runs against a fake IP resolver and a fake provider API.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cfddns::agent::{run_once, RunOptions, RunOutcome};
use cfddns::config::{AgentConfig, IpSource, Settings, ZoneConfig};
use cfddns::dns::{CloudflareProvider, Credentials};
use cfddns::{AgentError, ProviderError, ResolutionError};

const ADDRESS: &str = "203.0.113.7";

struct Harness {
    _dir: TempDir,
    server: MockServer,
    settings: Settings,
}

impl Harness {
    async fn new(hostnames: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;

        let settings = Settings {
            agent: AgentConfig {
                change_log: dir.path().join("last_ip"),
                ..Default::default()
            },
            credentials: Some(credentials()),
            zone: ZoneConfig {
                name: "example.com".to_string(),
                provider: "cloudflare".to_string(),
                api_url: format!("{}/api_json.html", server.uri()),
                hostnames: hostnames.iter().map(|h| h.to_string()).collect(),
            },
            ip: IpSource::Remote {
                resolver_url: format!("{}/ip", server.uri()),
            },
        };

        Self {
            _dir: dir,
            server,
            settings,
        }
    }

    fn change_log(&self) -> &PathBuf {
        &self.settings.agent.change_log
    }

    fn provider(&self) -> CloudflareProvider {
        CloudflareProvider::new(
            &self.settings.zone.api_url,
            &self.settings.zone.name,
            credentials(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    async fn resolver_returns(&self, body: &str) {
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}\n", body)))
            .mount(&self.server)
            .await;
    }

    async fn expect_list(&self, times: u64) {
        Mock::given(method("GET"))
            .and(path("/api_json.html"))
            .and(query_param("a", "rec_load_all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "success",
                "response": {
                    "recs": {
                        "count": 2,
                        "objs": [
                            {"rec_id": "100", "display_name": "example.com", "type": "A"},
                            {"rec_id": "101", "display_name": "www", "type": "A"}
                        ]
                    }
                }
            })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    async fn expect_edit(&self, id: &str, name: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path("/api_json.html"))
            .and(query_param("a", "rec_edit"))
            .and(query_param("id", id))
            .and(query_param("name", name))
            .and(query_param("content", ADDRESS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "success",
                "response": {"rec": {"obj": {"rec_id": id}}}
            })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    async fn edit_calls(&self) -> Vec<(String, String)> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.query_pairs().any(|(k, v)| k == "a" && v == "rec_edit"))
            .map(|r| {
                let get = |key: &str| {
                    r.url
                        .query_pairs()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| v.into_owned())
                        .unwrap_or_default()
                };
                (get("id"), get("name"))
            })
            .collect()
    }

    async fn provider_calls(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/api_json.html")
            .count()
    }
}

fn credentials() -> Credentials {
    Credentials {
        email: "me@example.com".to_string(),
        api_key: "key123".to_string(),
    }
}

#[tokio::test]
async fn first_run_updates_every_hostname_in_order() {
    let h = Harness::new(&["example.com", "www"]).await;
    h.resolver_returns(ADDRESS).await;
    h.expect_list(1).await;
    h.expect_edit("100", "example.com", 1).await;
    h.expect_edit("101", "www", 1).await;

    let outcome = run_once(&h.settings, &h.provider(), RunOptions::default())
        .await
        .unwrap();

    match outcome {
        RunOutcome::Updated { address, hostnames } => {
            assert_eq!(address.address.to_string(), ADDRESS);
            assert_eq!(hostnames, vec!["example.com", "www"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert_eq!(
        h.edit_calls().await,
        vec![
            ("100".to_string(), "example.com".to_string()),
            ("101".to_string(), "www".to_string()),
        ]
    );
    assert_eq!(std::fs::read_to_string(h.change_log()).unwrap().trim(), ADDRESS);
}

#[tokio::test]
async fn unchanged_address_makes_no_provider_calls() {
    let h = Harness::new(&["example.com", "www"]).await;
    h.resolver_returns(ADDRESS).await;
    std::fs::write(h.change_log(), format!("{}\n", ADDRESS)).unwrap();
    let before = std::fs::read(h.change_log()).unwrap();

    let outcome = run_once(&h.settings, &h.provider(), RunOptions::default())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Unchanged(_)));
    assert_eq!(h.provider_calls().await, 0);
    assert_eq!(std::fs::read(h.change_log()).unwrap(), before);
}

#[tokio::test]
async fn second_identical_run_is_a_no_op() {
    let h = Harness::new(&["www"]).await;
    h.resolver_returns(ADDRESS).await;
    h.expect_list(1).await;
    h.expect_edit("101", "www", 1).await;

    run_once(&h.settings, &h.provider(), RunOptions::default())
        .await
        .unwrap();
    let after_first = std::fs::read(h.change_log()).unwrap();

    let outcome = run_once(&h.settings, &h.provider(), RunOptions::default())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Unchanged(_)));
    assert_eq!(h.provider_calls().await, 2);
    assert_eq!(std::fs::read(h.change_log()).unwrap(), after_first);
}

#[tokio::test]
async fn corrupt_change_log_triggers_update() {
    let h = Harness::new(&["www"]).await;
    h.resolver_returns(ADDRESS).await;
    h.expect_list(1).await;
    h.expect_edit("101", "www", 1).await;
    std::fs::write(h.change_log(), "not an address at all").unwrap();

    let outcome = run_once(&h.settings, &h.provider(), RunOptions::default())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Updated { .. }));
    assert_eq!(std::fs::read_to_string(h.change_log()).unwrap().trim(), ADDRESS);
}

#[tokio::test]
async fn invalid_resolver_body_is_fatal_before_provider() {
    let h = Harness::new(&["www"]).await;
    h.resolver_returns("Service temporarily unavailable").await;

    let err = run_once(&h.settings, &h.provider(), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AgentError::Resolution(ResolutionError::InvalidAddress { .. })
    ));
    assert_eq!(h.provider_calls().await, 0);
    assert!(!h.change_log().exists());
}

#[tokio::test]
async fn missing_record_stops_before_later_hostnames() {
    let h = Harness::new(&["mail", "www"]).await;
    h.resolver_returns(ADDRESS).await;
    h.expect_list(1).await;
    h.expect_edit("101", "www", 0).await;

    let err = run_once(&h.settings, &h.provider(), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::RecordNotFound { ref hostname } if hostname == "mail"));
    assert!(h.edit_calls().await.is_empty());
}

#[tokio::test]
async fn error_envelope_is_a_failure() {
    let h = Harness::new(&["www"]).await;
    h.resolver_returns(ADDRESS).await;
    Mock::given(method("GET"))
        .and(path("/api_json.html"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "error",
            "msg": "Invalid zone",
            "err_code": "E_INVLDINPUT"
        })))
        .mount(&h.server)
        .await;

    let err = run_once(&h.settings, &h.provider(), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AgentError::Provider(ProviderError::Api { call: "rec_load_all", .. })
    ));
}

#[tokio::test]
async fn provider_http_error_is_a_failure() {
    let h = Harness::new(&["www"]).await;
    h.resolver_returns(ADDRESS).await;
    Mock::given(method("GET"))
        .and(path("/api_json.html"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    let err = run_once(&h.settings, &h.provider(), RunOptions::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("401"));
    assert!(err.to_string().contains("Unauthorised"));
}
