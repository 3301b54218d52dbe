// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end tests for the reconciliation cycle.
//!
//! These tests run the full pipeline against a local UDP TXT responder
//! and mocked directory/zone APIs; no external infrastructure is needed.

mod common;

use common::{make_settings, spawn_txt_responder};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zonesync::context::Context;
use zonesync::orchestrator::SyncOrchestrator;

/// Mount a directory API with one organization and one `app` resource
/// targeting 10.0.4.17:443 over https.
async fn mount_directory(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "org-1"}])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/organizations/org-1/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"items": [
                {"id": "r-1", "name": "app", "domain": "app.example.com"}
            ]}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/resources/r-1/targets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "targets": [
                {"address": "10.0.4.17", "port": 443, "method": "https", "enabled": true}
            ]
        })))
        .mount(server)
        .await;
}

/// Mount the zone lookup answering with zone `z-1` for `example.com`.
async fn mount_zone_lookup(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "zones": [{"id": "z-1", "name": "example.com"}]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_cycle_creates_cname_and_monitoring_config() {
    let resolver = spawn_txt_responder("alpha:10.0.4.5").await;
    let directory = MockServer::start().await;
    let zone = MockServer::start().await;
    mount_directory(&directory).await;
    mount_zone_lookup(&zone).await;

    // The zone starts empty; the cycle must create app -> on.alpha
    Mock::given(method("GET"))
        .and(path("/zones/z-1/rrsets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rrsets": [],
            "meta": {"pagination": {"page": 1, "last_page": 1}}
        })))
        .mount(&zone)
        .await;

    Mock::given(method("POST"))
        .and(path("/zones/z-1/rrsets"))
        .and(body_partial_json(json!({
            "name": "app",
            "type": "CNAME",
            "records": ["on.alpha.example.com."]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&zone)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("monitoring.yaml");
    let settings = make_settings(resolver, &directory.uri(), &zone.uri(), &output);
    let orchestrator = SyncOrchestrator::new(Context::new(settings));

    let outcome = orchestrator.run_cycle().await;

    assert!(outcome.success, "errors: {:?}", outcome.summary.errors);
    assert_eq!(outcome.summary.topology_hosts, 1);
    assert_eq!(outcome.summary.desired_pairs, 1);
    assert_eq!(outcome.summary.endpoints, 1);
    assert!(outcome.summary.config_written);

    let rendered = std::fs::read_to_string(&output).expect("monitoring config");
    assert!(rendered.contains("name: app"), "config was: {rendered}");
    assert!(rendered.contains("url: https://10.0.4.17:443"));
    assert!(rendered.contains("group: alpha"));
}

#[tokio::test]
async fn test_converged_cycle_is_idempotent() {
    let resolver = spawn_txt_responder("alpha:10.0.4.5").await;
    let directory = MockServer::start().await;
    let zone = MockServer::start().await;
    mount_directory(&directory).await;
    mount_zone_lookup(&zone).await;

    // The zone already matches the desired state
    Mock::given(method("GET"))
        .and(path("/zones/z-1/rrsets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rrsets": [
                {"name": "app", "type": "CNAME", "ttl": 300,
                 "records": ["on.alpha.example.com."]}
            ],
            "meta": {"pagination": {"page": 1, "last_page": 1}}
        })))
        .mount(&zone)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("monitoring.yaml");
    let settings = make_settings(resolver, &directory.uri(), &zone.uri(), &output);
    let orchestrator = SyncOrchestrator::new(Context::new(settings));

    let first = orchestrator.run_cycle().await;
    assert!(first.success);
    assert!(first.summary.config_written, "first run writes the config");

    let second = orchestrator.run_cycle().await;
    assert!(second.success);
    assert!(
        !second.summary.config_written,
        "unchanged inputs must not rewrite the config"
    );

    // Neither cycle may have issued a single zone mutation
    let requests = zone.received_requests().await.expect("request recording");
    let mutations: Vec<_> = requests
        .iter()
        .filter(|r| r.method.to_string() != "GET")
        .collect();
    assert!(
        mutations.is_empty(),
        "converged zone must see zero mutation calls, saw: {mutations:?}"
    );
}

#[tokio::test]
async fn test_unreachable_sources_degrade_gracefully() {
    let resolver = spawn_txt_responder("alpha:10.0.4.5").await;
    let directory = MockServer::start().await;
    let zone = MockServer::start().await;

    // Both APIs answer 500 on everything
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&directory)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&zone)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("monitoring.yaml");
    let settings = make_settings(resolver, &directory.uri(), &zone.uri(), &output);
    let orchestrator = SyncOrchestrator::new(Context::new(settings));

    let outcome = orchestrator.run_cycle().await;

    // Source unavailability is fail-soft: the cycle still completes
    assert!(outcome.success, "errors: {:?}", outcome.summary.errors);
    assert_eq!(outcome.summary.desired_pairs, 0);
    assert_eq!(outcome.summary.zone_records, 0);
    assert_eq!(outcome.summary.endpoints, 0);
}

#[tokio::test]
async fn test_failed_config_write_is_reported_not_raised() {
    let resolver = spawn_txt_responder("alpha:10.0.4.5").await;
    let directory = MockServer::start().await;
    let zone = MockServer::start().await;
    mount_directory(&directory).await;
    mount_zone_lookup(&zone).await;

    Mock::given(method("GET"))
        .and(path("/zones/z-1/rrsets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rrsets": [
                {"name": "app", "type": "CNAME", "ttl": 300,
                 "records": ["on.alpha.example.com."]}
            ],
            "meta": {"pagination": {"page": 1, "last_page": 1}}
        })))
        .mount(&zone)
        .await;

    // Output directory does not exist: the atomic write must fail
    let output = std::path::PathBuf::from("/nonexistent-zonesync-dir/monitoring.yaml");
    let settings = make_settings(resolver, &directory.uri(), &zone.uri(), &output);
    let orchestrator = SyncOrchestrator::new(Context::new(settings));

    let outcome = orchestrator.run_cycle().await;

    assert!(!outcome.success);
    assert!(
        !outcome.summary.errors.is_empty(),
        "the failure must be captured in the summary"
    );
}
