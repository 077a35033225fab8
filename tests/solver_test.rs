//! End-to-end tests for the solver: request decoding, credential lookup and
//! record reconciliation against a mocked Alidns endpoint.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{header, method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use alidns_solver::config::SecretKeySelector;
use alidns_solver::error::{ReconcileError, SolverError};
use alidns_solver::secrets::{SecretError, SecretSource};
use alidns_solver::solver::{AliDnsSolver, ChallengeRequest};

/// Secrets keyed by `namespace/name/key`.
#[derive(Default)]
struct StaticSecrets {
    values: HashMap<String, Vec<u8>>,
}

impl StaticSecrets {
    fn with(mut self, namespace: &str, name: &str, key: &str, value: &str) -> Self {
        self.values.insert(
            format!("{namespace}/{name}/{key}"),
            value.as_bytes().to_vec(),
        );
        self
    }
}

#[async_trait]
impl SecretSource for StaticSecrets {
    async fn secret_value(
        &self,
        namespace: &str,
        selector: &SecretKeySelector,
    ) -> Result<Vec<u8>, SecretError> {
        self.values
            .get(&format!("{namespace}/{}/{}", selector.name, selector.key))
            .cloned()
            .ok_or_else(|| SecretError::MissingKey {
                namespace: namespace.to_string(),
                name: selector.name.clone(),
                key: selector.key.clone(),
            })
    }
}

fn secrets() -> StaticSecrets {
    StaticSecrets::default()
        .with("cert-manager", "alidns-secrets", "access-key", "LTAI-test\n")
        .with("cert-manager", "alidns-secrets", "secret-key", "secret")
}

fn request(action: &str, key: &str) -> ChallengeRequest {
    serde_json::from_value(json!({
        "uid": "6a1f2b3c",
        "action": action,
        "type": "dns-01",
        "dnsName": "example.com",
        "key": key,
        "resourceNamespace": "cert-manager",
        "resolvedFQDN": "_acme-challenge.example.com.",
        "resolvedZone": "example.com.",
        "config": {
            "region": "cn-hangzhou",
            "accessKeySecretRef": {"name": "alidns-secrets", "key": "access-key"},
            "secretKeySecretRef": {"name": "alidns-secrets", "key": "secret-key"}
        }
    }))
    .unwrap()
}

async fn mount_describe(server: &MockServer, values: &[(&str, &str)]) {
    let records: Vec<_> = values
        .iter()
        .map(|(id, value)| {
            json!({
                "DomainName": "example.com",
                "RecordId": id,
                "RR": "_acme-challenge",
                "Type": "TXT",
                "Value": value,
                "TTL": 600
            })
        })
        .collect();

    Mock::given(method("POST"))
        .and(header("x-acs-action", "DescribeDomainRecords"))
        .and(query_param("DomainName", "example.com"))
        .and(query_param("RRKeyWord", "_acme-challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "RequestId": "req-list",
            "TotalCount": records.len(),
            "PageNumber": 1,
            "PageSize": 500,
            "DomainRecords": {"Record": records}
        })))
        .mount(server)
        .await;
}

fn ok_record(id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"RequestId": "req", "RecordId": id}))
}

#[tokio::test]
async fn test_present_creates_missing_record() {
    let server = MockServer::start().await;
    mount_describe(&server, &[]).await;

    Mock::given(method("POST"))
        .and(header("x-acs-action", "AddDomainRecord"))
        .and(query_param("RR", "_acme-challenge"))
        .and(query_param("Value", "abc"))
        .respond_with(ok_record("1"))
        .expect(1)
        .mount(&server)
        .await;

    let solver = AliDnsSolver::new(secrets()).with_endpoint(server.uri());
    assert_eq!(solver.name(), "alidns");
    solver.present(&request("Present", "abc")).await.unwrap();
}

#[tokio::test]
async fn test_two_challenges_for_one_name() {
    // abc is already served, xyz gets added, then abc is cleaned up
    let server = MockServer::start().await;
    mount_describe(&server, &[("1", "abc")]).await;

    Mock::given(method("POST"))
        .and(header("x-acs-action", "AddDomainRecord"))
        .and(query_param("Value", "xyz"))
        .respond_with(ok_record("2"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("x-acs-action", "DeleteDomainRecord"))
        .and(query_param("RecordId", "1"))
        .respond_with(ok_record("1"))
        .expect(1)
        .mount(&server)
        .await;

    let solver = AliDnsSolver::new(secrets()).with_endpoint(server.uri());
    solver.present(&request("Present", "xyz")).await.unwrap();
    solver.clean_up(&request("CleanUp", "abc")).await.unwrap();
}

#[tokio::test]
async fn test_solve_dispatches_on_request_action() {
    let server = MockServer::start().await;
    mount_describe(&server, &[("7", "abc")]).await;

    Mock::given(method("POST"))
        .and(header("x-acs-action", "DeleteDomainRecord"))
        .and(query_param("RecordId", "7"))
        .respond_with(ok_record("7"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("x-acs-action", "AddDomainRecord"))
        .respond_with(ok_record("8"))
        .expect(0)
        .mount(&server)
        .await;

    let solver = AliDnsSolver::new(secrets()).with_endpoint(server.uri());
    solver.solve(&request("CleanUp", "abc")).await.unwrap();
}

#[tokio::test]
async fn test_cleanup_of_absent_record_is_noop() {
    let server = MockServer::start().await;
    mount_describe(&server, &[("1", "other")]).await;

    Mock::given(method("POST"))
        .and(header("x-acs-action", "DeleteDomainRecord"))
        .respond_with(ok_record("1"))
        .expect(0)
        .mount(&server)
        .await;

    let solver = AliDnsSolver::new(secrets())
        .with_endpoint(server.uri())
        .with_timeout(Duration::from_secs(10));
    solver.clean_up(&request("CleanUp", "abc")).await.unwrap();
}

#[tokio::test]
async fn test_missing_secret_is_config_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_record("1"))
        .expect(0)
        .mount(&server)
        .await;

    let only_id = StaticSecrets::default().with(
        "cert-manager",
        "alidns-secrets",
        "access-key",
        "LTAI-test",
    );
    let solver = AliDnsSolver::new(only_id).with_endpoint(server.uri());
    let err = solver.present(&request("Present", "abc")).await.unwrap_err();

    match &err {
        SolverError::ConfigInvalid { step, .. } => assert_eq!(*step, "loading access key secret"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().starts_with("error loading access key secret"));

    let source = std::error::Error::source(&err)
        .and_then(|source| source.downcast_ref::<SecretError>())
        .expect("secret error in the source chain");
    match source {
        SecretError::MissingKey { key, .. } => assert_eq!(key, "secret-key"),
        other => panic!("unexpected secret error: {other}"),
    }
}

#[tokio::test]
async fn test_non_utf8_secret_is_config_error() {
    let mut secrets = secrets();
    secrets.values.insert(
        "cert-manager/alidns-secrets/access-key".to_string(),
        vec![0xff, 0xfe],
    );

    let solver = AliDnsSolver::new(secrets);
    let err = solver.present(&request("Present", "abc")).await.unwrap_err();

    assert!(matches!(
        err,
        SolverError::ConfigInvalid {
            step: "loading access key id",
            ..
        }
    ));
    let source = std::error::Error::source(&err)
        .and_then(|source| source.downcast_ref::<SecretError>());
    assert!(matches!(source, Some(SecretError::InvalidUtf8 { .. })));
}

#[tokio::test]
async fn test_malformed_config_is_config_error() {
    let mut req = request("Present", "abc");
    req.config = Some(json!({"region": ["not", "a", "string"]}));

    let solver = AliDnsSolver::new(secrets());
    let err = solver.present(&req).await.unwrap_err();
    assert!(matches!(
        err,
        SolverError::ConfigInvalid {
            step: "decoding solver config",
            ..
        }
    ));
}

#[tokio::test]
async fn test_provider_failure_surfaces_as_reconcile_error() {
    let server = MockServer::start().await;
    mount_describe(&server, &[]).await;

    Mock::given(method("POST"))
        .and(header("x-acs-action", "AddDomainRecord"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "RequestId": "req-err",
            "Code": "DomainRecordDuplicate",
            "Message": "The DNS record already exists."
        })))
        .mount(&server)
        .await;

    let solver = AliDnsSolver::new(secrets()).with_endpoint(server.uri());
    let err = solver.present(&request("Present", "abc")).await.unwrap_err();

    assert!(matches!(
        err,
        SolverError::Reconcile(ReconcileError::CreateFailed { .. })
    ));
    assert!(err.to_string().contains("DomainRecordDuplicate"));
}
