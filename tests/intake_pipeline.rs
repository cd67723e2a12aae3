mod common {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use axum::body::to_bytes;
    use axum::response::Response;
    use bd_surface::workflows::intake::{
        IntakeRouter, IntakeService, MemoryWorkspace, INTAKE_SUBMISSIONS,
    };
    use serde_json::{json, Value};

    pub const INTAKE_COLLECTION: &str = INTAKE_SUBMISSIONS;

    pub fn build_service() -> (Arc<IntakeService<MemoryWorkspace>>, Arc<MemoryWorkspace>) {
        let store = Arc::new(MemoryWorkspace::default());
        let service = Arc::new(IntakeService::new(IntakeRouter::default(), store.clone()));
        (service, store)
    }

    pub fn seed_new_submission(
        store: &MemoryWorkspace,
        fields: &[(&str, Value)],
    ) -> bd_surface::workflows::intake::StoreRecord {
        let mut map = BTreeMap::new();
        map.insert("status".to_string(), json!("New"));
        for (field, value) in fields {
            map.insert((*field).to_string(), value.clone());
        }
        store.seed(INTAKE_COLLECTION, map)
    }

    pub async fn json_body(response: Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }
}

mod http {
    use super::common::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bd_surface::workflows::intake::{intake_router, WorkspaceStore, FUNNEL_TRACKER};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn post_json(uri: &str, payload: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_vec(payload).expect("serialize payload"),
            ))
            .expect("request")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let (service, _store) = build_service();
        let router = intake_router(service);

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload.get("status"), Some(&json!("ok")));
    }

    #[tokio::test]
    async fn route_endpoint_returns_the_full_decision() {
        let (service, _store) = build_service();
        let router = intake_router(service);

        let submission = json!({
            "id": "sub-001",
            "org_name": "Acme Corp",
            "email": "ceo@acme.com",
            "source": "inbound",
            "intent_signal": "demo_request",
            "estimated_deal_size": 500_000.0,
        });

        let response = router
            .oneshot(post_json("/api/v1/intake/route", &submission))
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload.get("decision"), Some(&json!("standard_triage")));
        assert_eq!(payload.get("matched_rule"), Some(&json!("inbound_clear_intent")));
        assert_eq!(payload.get("target_stage"), Some(&json!("contact")));
        assert_eq!(payload.get("assigned_team"), Some(&json!("outreach")));
        assert!(payload
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .contains("Matched rule"));
    }

    #[tokio::test]
    async fn route_endpoint_tolerates_sparse_payloads() {
        let (service, _store) = build_service();
        let router = intake_router(service);

        let response = router
            .oneshot(post_json("/api/v1/intake/route", &json!({})))
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload.get("decision"), Some(&json!("escalate")));
    }

    #[tokio::test]
    async fn score_endpoint_honors_the_reference_time() {
        let (service, _store) = build_service();
        let router = intake_router(service);

        let request = json!({
            "contact_id": "contact-1",
            "org_id": "org-1",
            "reference_time": "2026-08-01T12:00:00Z",
            "signals": [
                { "signal_type": "inbound_request", "timestamp": "2026-07-30T12:00:00Z" },
                { "signal_type": "meeting_completed", "timestamp": "2026-07-27T12:00:00Z" },
                { "signal_type": "email_reply", "timestamp": "2026-07-22T12:00:00Z" },
            ],
        });

        let response = router
            .oneshot(post_json("/api/v1/leads/score", &request))
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload.get("contact_id"), Some(&json!("contact-1")));
        assert_eq!(payload.get("raw_score"), Some(&json!(75.0)));
        assert_eq!(payload.get("tier"), Some(&json!("hot")));
        assert_eq!(payload.get("signal_count"), Some(&json!(3)));
        assert_eq!(payload.get("calculated_at"), Some(&json!("2026-08-01T12:00:00Z")));
    }

    #[tokio::test]
    async fn process_endpoint_triages_the_backlog() {
        let (service, store) = build_service();

        seed_new_submission(
            &store,
            &[
                ("org_name", json!("Globex")),
                ("email", json!("jordan@globex.com")),
                ("source", json!("referral")),
            ],
        );
        seed_new_submission(
            &store,
            &[
                ("email", json!("winner@tempmail.example")),
                ("message", json!("crypto airdrop inside")),
            ],
        );

        let router = intake_router(service);
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/intake/process")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        let results = payload.as_array().expect("results array");
        assert_eq!(results.len(), 2);

        let decisions: Vec<&str> = results
            .iter()
            .filter_map(|r| r.get("decision").and_then(Value::as_str))
            .collect();
        assert!(decisions.contains(&"auto_qualify"));
        assert!(decisions.contains(&"reject"));

        // The accepted referral lands in the funnel tracker; the rejected
        // submission leaves no trace there.
        let funnel = store
            .query(FUNNEL_TRACKER, &Default::default())
            .expect("memory query");
        assert_eq!(funnel.len(), 1);
        assert_eq!(funnel[0].text("name"), Some("Globex"));
        assert_eq!(funnel[0].text("stage"), Some("B–Qualification"));
    }

    #[tokio::test]
    async fn processed_submissions_do_not_reprocess() {
        let (service, store) = build_service();
        seed_new_submission(&store, &[("source", json!("referral"))]);

        let first = service.process_new_submissions().expect("first pass");
        assert_eq!(first.len(), 1);
        let second = service.process_new_submissions().expect("second pass");
        assert!(second.is_empty());
    }
}

mod audit {
    use std::sync::Arc;

    use bd_surface::workflows::intake::{
        IntakeRouter, IntakeService, JsonlAuditLog, MemoryWorkspace, Submission,
    };
    use serde_json::Value;

    #[tokio::test]
    async fn routing_decisions_append_to_the_jsonl_audit_log() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("audit/decisions.jsonl");

        let audit = Arc::new(JsonlAuditLog::open(&path).expect("open audit log"));
        let router = IntakeRouter::default().with_audit(audit);
        let service = IntakeService::new(router, Arc::new(MemoryWorkspace::default()));

        let submission = Submission {
            id: "sub-audit".to_string(),
            org_name: Some("Globex".to_string()),
            source: Some("referral".to_string()),
            ..Submission::default()
        };
        service.route_submission(&submission);
        service.route_submission(&submission);

        let contents = std::fs::read_to_string(&path).expect("read audit log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in lines {
            let entry: Value = serde_json::from_str(line).expect("jsonl entry");
            assert!(entry.get("timestamp").is_some());
            assert_eq!(
                entry.pointer("/entry/action"),
                Some(&serde_json::json!("auto_qualify"))
            );
            assert_eq!(
                entry.pointer("/entry/session_id"),
                Some(&serde_json::json!("sub-audit"))
            );
        }
    }
}
