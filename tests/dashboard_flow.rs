use httptest::matchers::{all_of, contains, eq, json_decoded, request, url_decoded};
use httptest::responders::{json_encoded, status_code};
use httptest::{Expectation, Server};
use serde_json::json;
use tempfile::tempdir;

use appeals_triage::{
    default_municipalities, project, AppConfig, DashboardSession, FileAttachment,
};

fn config_for(server: &Server) -> AppConfig {
    AppConfig {
        api_base: server.url("/api").to_string(),
        request_timeout_secs: 5,
        fallback_municipalities: default_municipalities(),
    }
}

fn analytics_payload() -> serde_json::Value {
    json!({
        "by_category": [{ "name": "Дороги", "value": 2 }],
        "by_date": [{ "date": "2025-05-02", "count": 2 }],
        "per_category": [{
            "category": "Дороги",
            "count": 2,
            "sentiment": -0.5,
            "topics": ["яма", "асфальт"],
            "hotspots": [{ "address": "ул. Ленина, 5", "count": 2 }]
        }]
    })
}

#[tokio::test]
async fn refresh_populates_the_session_from_the_backend() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/api/appeals/municipalities",
        ))
        .respond_with(json_encoded(json!({
            "items": [
                { "id": 1, "name": "Раменский" },
                { "id": 5, "name": "Котельники" }
            ]
        }))),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/api/appeals/analytics"))
            .respond_with(json_encoded(analytics_payload())),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/api/appeals/plans"))
            .respond_with(json_encoded(json!({
                "items": [{
                    "category": "Дороги",
                    "municipality_name": "Раменский",
                    "created_at": "2025-05-01 09:00",
                    "summary": "План действий на месяц — Дороги — Раменский",
                    "docx_url": "/api/appeals/file/plan.docx",
                    "pdf_url": "/api/appeals/file/plan.pdf"
                }]
            }))),
    );

    let session = DashboardSession::new(&config_for(&server)).expect("session");
    session.refresh().await;

    let state = session.snapshot();
    assert_eq!(state.municipalities.len(), 2);
    assert_eq!(state.municipalities[1].name, "Котельники");
    let analytics = state.analytics.as_ref().expect("analytics applied");
    assert_eq!(analytics.per_category[0].hotspots[0].count, 2);
    assert!(state.analytics_refreshed_at.is_some());
    assert_eq!(state.plans.len(), 1);
    assert_eq!(
        state.plans[0].docx_url,
        server.url("/api/appeals/file/plan.docx").to_string()
    );
    assert_eq!(
        state.plans[0].pdf_url,
        server.url("/api/appeals/file/plan.pdf").to_string()
    );
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn upload_commits_the_result_and_refreshes_analytics_exactly_once() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/api/appeals/municipalities",
        ))
        .respond_with(json_encoded(json!({ "items": [{ "id": 1, "name": "Раменский" }] }))),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/api/appeals/plans"))
            .respond_with(json_encoded(json!({ "items": [] }))),
    );
    // one call from the initial refresh, exactly one more after the upload
    server.expect(
        Expectation::matching(request::method_path("GET", "/api/appeals/analytics"))
            .times(2)
            .respond_with(json_encoded(analytics_payload())),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method("POST"),
            request::path("/api/appeals/upload"),
        ])
        .respond_with(json_encoded(json!({
            "items": [{
                "source": "выгрузка.xlsx",
                "date": "2025-05-02",
                "address": "ул. Ленина, 5",
                "text": "Яма на дороге у дома 5",
                "category": "Дороги",
                "lat": 55.12345,
                "lng": 37.54321
            }],
            "export_url": "/api/appeals/export/unified.xlsx"
        }))),
    );

    let session = DashboardSession::new(&config_for(&server)).expect("session");
    session.refresh().await;

    let dir = tempdir().expect("tempdir");
    let first = dir.path().join("выгрузка.xlsx");
    let second = dir.path().join("жалобы.csv");
    std::fs::write(&first, b"fake workbook bytes").expect("write");
    std::fs::write(&second, "дата;адрес;текст\n").expect("write");
    session.select_files(vec![
        FileAttachment::from_path(&first).expect("attach"),
        FileAttachment::from_path(&second).expect("attach"),
    ]);

    let result = session.upload().await.expect("upload");
    assert_eq!(
        result.export_url.as_deref(),
        Some(server.url("/api/appeals/export/unified.xlsx").to_string().as_str())
    );

    let state = session.snapshot();
    assert!(!state.busy);
    assert!(state.last_error.is_none());
    assert!(state.upload.is_some());

    let view = project(&state);
    assert_eq!(view.upload_rows[0].geotag, "55.12345,37.54321");
    assert_eq!(view.upload_rows[0].category, "Дороги");
    assert_eq!(view.category_series[0].name, "Дороги");
}

#[tokio::test]
async fn generate_plan_escapes_the_category_and_takes_the_fetched_list() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method("POST"),
            request::path("/api/appeals/generate-plan/%D0%96%D0%9A%D0%A5"),
            request::body(json_decoded(eq(json!({ "municipality_id": 1 })))),
        ])
        .respond_with(json_encoded(json!({
            "ok": true,
            // deliberately different from the list below: the client must
            // not trust the POST response's item
            "item": { "category": "ЖКХ", "summary": "черновик" }
        }))),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/api/appeals/plans"))
            .respond_with(json_encoded(json!({
                "items": [{
                    "category": "ЖКХ",
                    "municipality_name": "Раменский",
                    "created_at": "2025-05-02 12:00",
                    "summary": "План действий на месяц — ЖКХ — Раменский",
                    "docx_url": "appeals/file/plan_zhkh.docx",
                    "pdf_url": "/api/appeals/file/plan_zhkh.pdf"
                }]
            }))),
    );

    let session = DashboardSession::new(&config_for(&server)).expect("session");
    let plans = session.generate_plan("ЖКХ").await.expect("plan generation");

    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].summary, "План действий на месяц — ЖКХ — Раменский");
    // bare-relative link resolved under the api prefix, rooted one at origin
    assert_eq!(
        plans[0].docx_url,
        server.url("/api/appeals/file/plan_zhkh.docx").to_string()
    );
    assert_eq!(
        plans[0].pdf_url,
        server.url("/api/appeals/file/plan_zhkh.pdf").to_string()
    );

    let state = session.snapshot();
    assert_eq!(state.plans.len(), 1);
    assert!(!state.busy);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn municipality_switch_refetches_and_replaces_scoped_data() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/api/appeals/municipalities",
        ))
        .times(2)
        .respond_with(json_encoded(json!({
            "items": [
                { "id": 1, "name": "Раменский" },
                { "id": 2, "name": "Жуковский" }
            ]
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/appeals/analytics"),
            request::query(url_decoded(contains(("municipality_id", "1")))),
        ])
        .respond_with(json_encoded(json!({
            "by_category": [{ "name": "Дороги", "value": 7 }],
            "by_date": [],
            "per_category": []
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/appeals/analytics"),
            request::query(url_decoded(contains(("municipality_id", "2")))),
        ])
        .respond_with(json_encoded(json!({
            "by_category": [{ "name": "ЖКХ", "value": 3 }],
            "by_date": [],
            "per_category": []
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/appeals/plans"),
            request::query(url_decoded(contains(("municipality_id", "1")))),
        ])
        .respond_with(json_encoded(json!({
            "items": [{
                "category": "Дороги",
                "municipality_name": "Раменский",
                "created_at": "2025-05-01 09:00",
                "summary": "для Раменского",
                "docx_url": "/api/f/a.docx",
                "pdf_url": "/api/f/a.pdf"
            }]
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/appeals/plans"),
            request::query(url_decoded(contains(("municipality_id", "2")))),
        ])
        .respond_with(json_encoded(json!({
            "items": [{
                "category": "ЖКХ",
                "municipality_name": "Жуковский",
                "created_at": "2025-05-03 10:00",
                "summary": "для Жуковского",
                "docx_url": "/api/f/b.docx",
                "pdf_url": "/api/f/b.pdf"
            }]
        }))),
    );

    let session = DashboardSession::new(&config_for(&server)).expect("session");
    session.refresh().await;
    assert_eq!(session.snapshot().plans[0].summary, "для Раменского");

    session.select_municipality(2).await;

    let state = session.snapshot();
    assert_eq!(state.municipality_id, 2);
    let analytics = state.analytics.as_ref().expect("analytics for new selection");
    assert_eq!(analytics.by_category[0].name, "ЖКХ");
    assert_eq!(state.plans.len(), 1);
    assert_eq!(state.plans[0].summary, "для Жуковского");
}

#[tokio::test]
async fn failed_upload_surfaces_the_error_and_keeps_prior_state() {
    let server = Server::run();
    // no analytics expectation: a failed upload must not trigger the refetch
    server.expect(
        Expectation::matching(all_of![
            request::method("POST"),
            request::path("/api/appeals/upload"),
        ])
        .respond_with(
            status_code(400)
                .append_header("content-type", "application/json")
                .body(r#"{"detail":"Файлы не переданы"}"#),
        ),
    );

    let session = DashboardSession::new(&config_for(&server)).expect("session");

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, "").expect("write");
    session.select_files(vec![FileAttachment::from_path(&path).expect("attach")]);

    let err = session.upload().await.expect_err("upload must fail");
    assert_eq!(err.to_string(), "Файлы не переданы");

    let state = session.snapshot();
    assert!(!state.busy);
    assert_eq!(state.last_error.as_deref(), Some("Файлы не переданы"));
    assert!(state.upload.is_none());
    // the selection is kept in memory; retrying is the operator's call
    assert_eq!(state.pending_files.len(), 1);
}
