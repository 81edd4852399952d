use chrono::Utc;
use flowdeck_api::app::services::{AppConfig, build_services};
use flowdeck_auth::AccessClaims;
use flowdeck_infra::DEMO_PASSWORD;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod) with the in-memory demo fixture,
        // bound to an ephemeral port.
        let services = build_services(&AppConfig {
            jwt_secret: JWT_SECRET.to_string(),
            token_ttl_minutes: 60,
            database_url: None,
        })
        .await
        .expect("failed to build services");
        let app = flowdeck_api::app::build_app(services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_token(sub: &str, iat: i64, exp: i64) -> String {
    let claims = AccessClaims {
        sub: sub.to_string(),
        org_id: None,
        org_code: None,
        team_id: None,
        iat,
        exp,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn try_login(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("{base_url}/api/v1/auth/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap()
}

async fn login(client: &reqwest::Client, base_url: &str, username: &str) -> String {
    let res = try_login(client, base_url, username, DEMO_PASSWORD).await;
    assert_eq!(res.status(), StatusCode::OK, "login failed for {username}");
    let body: serde_json::Value = res.json().await.unwrap();
    body["access_token"].as_str().unwrap().to_string()
}

async fn api_get(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    path: &str,
) -> reqwest::Response {
    client
        .get(format!("{base_url}/api/v1{path}"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
}

async fn api_post(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    path: &str,
    body: &serde_json::Value,
) -> reqwest::Response {
    client
        .post(format!("{base_url}/api/v1{path}"))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .unwrap()
}

async fn api_put(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    path: &str,
    body: &serde_json::Value,
) -> reqwest::Response {
    client
        .put(format!("{base_url}/api/v1{path}"))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .unwrap()
}

async fn api_delete(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    path: &str,
) -> reqwest::Response {
    client
        .delete(format!("{base_url}/api/v1{path}"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
}

async fn items(res: reqwest::Response) -> Vec<serde_json::Value> {
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["items"].as_array().unwrap().clone()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Health stays open.
    let res = client.get(&srv.base_url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["service"], "flowdeck");

    let res = client
        .get(format!("{}/api/v1/whoami", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_inactive_accounts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = try_login(&client, &srv.base_url, "dev", DEMO_PASSWORD).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["token_type"], "bearer");
    assert!(!body["access_token"].as_str().unwrap().is_empty());

    // Wrong password and unknown account share one body.
    let res = try_login(&client, &srv.base_url, "dev", "wrong").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "incorrect username or password");

    let res = try_login(&client, &srv.base_url, "nobody", DEMO_PASSWORD).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "incorrect username or password");

    let res = try_login(&client, &srv.base_url, "ghost", DEMO_PASSWORD).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "inactive_user");
}

#[tokio::test]
async fn minted_tokens_for_inactive_or_unknown_accounts_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let now = Utc::now().timestamp();

    // A valid signature does not help a deactivated account.
    let token = mint_token("ghost", now - 60, now + 600);
    let res = api_get(&client, &srv.base_url, &token, "/whoami").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "inactive_user");

    let token = mint_token("phantom", now - 60, now + 600);
    let res = api_get(&client, &srv.base_url, &token, "/whoami").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "invalid authentication credentials");
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let now = Utc::now().timestamp();

    let token = mint_token("dev", now - 3600, now - 60);
    let res = api_get(&client, &srv.base_url, &token, "/whoami").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "invalid authentication credentials");
}

#[tokio::test]
async fn profile_aggregates_global_and_team_capabilities() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = login(&client, &srv.base_url, "dev").await;

    let res = api_get(&client, &srv.base_url, &token, "/auth/me").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();

    assert_eq!(body["username"], "dev");
    assert_eq!(body["role"], "DPE_DEVELOPER");
    assert_eq!(body["org_code"], "ACME");
    assert_eq!(body["default_team_id"], 1);
    assert_eq!(
        body["global_capabilities"],
        json!(["view-telemetry", "edit-pipelines"])
    );
    assert_eq!(
        body["team_capabilities"]["1"],
        json!(["view-telemetry", "edit-pipelines"])
    );

    // The lead aggregates a different set per team.
    let token = login(&client, &srv.base_url, "lead").await;
    let res = api_get(&client, &srv.base_url, &token, "/auth/me").await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(
        body["team_capabilities"]["1"],
        json!([
            "view-telemetry",
            "edit-pipelines",
            "manage-connections",
            "manage-users"
        ])
    );
    assert_eq!(
        body["team_capabilities"]["2"],
        json!(["view-telemetry", "edit-pipelines"])
    );
}

#[tokio::test]
async fn team_focus_comes_from_the_token_and_the_override_header() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // dev's default team travels in the token.
    let token = login(&client, &srv.base_url, "dev").await;
    let res = api_get(&client, &srv.base_url, &token, "/whoami").await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["username"], "dev");
    assert_eq!(body["focused_team"], 1);

    // analyst has no default team.
    let token = login(&client, &srv.base_url, "analyst").await;
    let res = api_get(&client, &srv.base_url, &token, "/whoami").await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["focused_team"].is_null());

    // The header wins over the token claim.
    let token = login(&client, &srv.base_url, "lead").await;
    let res = client
        .get(format!("{}/api/v1/whoami", srv.base_url))
        .bearer_auth(&token)
        .header("X-Team-Id", "2")
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["focused_team"], 2);
}

#[tokio::test]
async fn invalid_focus_overrides_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = login(&client, &srv.base_url, "dev").await;

    // dev has no membership in Analytics.
    let res = client
        .get(format!("{}/api/v1/whoami", srv.base_url))
        .bearer_auth(&token)
        .header("X-Team-Id", "2")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_team_focus");
    assert_eq!(
        body["message"],
        "team 2 is not an active membership of the caller"
    );

    let res = client
        .get(format!("{}/api/v1/whoami", srv.base_url))
        .bearer_auth(&token)
        .header("X-Team-Id", "abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn lists_are_scoped_to_the_callers_teams() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let analyst = login(&client, &srv.base_url, "analyst").await;
    let rows = items(api_get(&client, &srv.base_url, &analyst, "/connections").await).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "events-s3");

    let dev = login(&client, &srv.base_url, "dev").await;
    let rows = items(api_get(&client, &srv.base_url, &dev, "/connections").await).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "warehouse-prod");

    let admin = login(&client, &srv.base_url, "admin").await;
    let rows = items(api_get(&client, &srv.base_url, &admin, "/connections").await).await;
    assert_eq!(rows.len(), 2);

    // lead defaults to Data Ops; the focus header narrows to Analytics.
    let lead = login(&client, &srv.base_url, "lead").await;
    let rows = items(api_get(&client, &srv.base_url, &lead, "/pipelines").await).await;
    let names: Vec<&str> = rows.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["orders_daily", "customer_dimension"]);

    let res = client
        .get(format!("{}/api/v1/pipelines", srv.base_url))
        .bearer_auth(&lead)
        .header("X-Team-Id", "2")
        .send()
        .await
        .unwrap();
    let rows = items(res).await;
    let names: Vec<&str> = rows.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["events_hourly"]);

    let rows = items(api_get(&client, &srv.base_url, &analyst, "/schedules").await).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["slug"], "events-hourly");

    let rows = items(api_get(&client, &srv.base_url, &admin, "/repositories").await).await;
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn direct_lookups_outside_the_callers_scope_read_as_absent() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let analyst = login(&client, &srv.base_url, "analyst").await;
    for path in ["/connections/1", "/pipelines/1", "/schedules/1", "/repositories/1"] {
        let res = api_get(&client, &srv.base_url, &analyst, path).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "expected 404 for {path}");
    }

    let admin = login(&client, &srv.base_url, "admin").await;
    let res = api_get(&client, &srv.base_url, &admin, "/connections/1").await;
    assert_eq!(res.status(), StatusCode::OK);

    // Direct lookups ignore the focus: lead reaches both teams' rows.
    let lead = login(&client, &srv.base_url, "lead").await;
    let res = api_get(&client, &srv.base_url, &lead, "/connections/2").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/api/v1/connections/1", srv.base_url))
        .bearer_auth(&lead)
        .header("X-Team-Id", "2")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = api_get(&client, &srv.base_url, &admin, "/connections/abc").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");

    let res = api_get(&client, &srv.base_url, &admin, "/connections/999").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pipeline_writes_need_edit_rights_in_the_owning_team() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // A read-only analyst cannot create, and the denial names the team.
    let analyst = login(&client, &srv.base_url, "analyst").await;
    let res = api_post(
        &client,
        &srv.base_url,
        &analyst,
        "/pipelines",
        &json!({ "name": "sneaky", "team_id": 2 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "missing capability 'edit-pipelines' for team 2");

    // An update on a visible row is denied the same way.
    let res = api_put(
        &client,
        &srv.base_url,
        &analyst,
        "/pipelines/3",
        &json!({ "name": "renamed" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let dev = login(&client, &srv.base_url, "dev").await;
    let res = api_post(
        &client,
        &srv.base_url,
        &dev,
        "/pipelines",
        &json!({ "name": "ad_hoc_backfill", "team_id": 1 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["team_id"], 1);
    assert_eq!(body["org_id"], 1);

    // Edit rights in one team do not reach into another.
    let res = api_post(
        &client,
        &srv.base_url,
        &dev,
        "/pipelines",
        &json!({ "name": "cross_team", "team_id": 2 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "missing capability 'edit-pipelines' for team 2");

    // A row dev cannot see reads as absent even for writes.
    let res = api_put(
        &client,
        &srv.base_url,
        &dev,
        "/pipelines/3",
        &json!({ "description": "tuned" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // lead holds read-write in Analytics and may edit there.
    let lead = login(&client, &srv.base_url, "lead").await;
    let res = api_put(
        &client,
        &srv.base_url,
        &lead,
        "/pipelines/3",
        &json!({ "description": "tuned" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["description"], "tuned");

    let res = api_delete(&client, &srv.base_url, &dev, "/pipelines/1").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn pipeline_references_must_stay_in_the_team() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let dev = login(&client, &srv.base_url, "dev").await;

    // Location 2 and schedule 2 belong to Analytics.
    let res = api_post(
        &client,
        &srv.base_url,
        &dev,
        "/pipelines",
        &json!({ "name": "bad_loc", "team_id": 1, "location_id": 2 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "code location is not in the target team");

    let res = api_post(
        &client,
        &srv.base_url,
        &dev,
        "/pipelines",
        &json!({ "name": "bad_sched", "team_id": 1, "schedule_id": 2 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "schedule is not in the target team");

    let res = api_put(
        &client,
        &srv.base_url,
        &dev,
        "/pipelines/2",
        &json!({ "schedule_id": 2 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = api_post(
        &client,
        &srv.base_url,
        &dev,
        "/pipelines",
        &json!({ "name": "good", "team_id": 1, "location_id": 1, "schedule_id": 1 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn connection_and_repository_management_need_lead_rights() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let dev = login(&client, &srv.base_url, "dev").await;
    let res = api_post(
        &client,
        &srv.base_url,
        &dev,
        "/connections",
        &json!({ "name": "scratch", "kind": "duckdb", "team_id": 1 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "missing capability 'manage-connections'");

    let lead = login(&client, &srv.base_url, "lead").await;
    let res = api_post(
        &client,
        &srv.base_url,
        &lead,
        "/connections",
        &json!({ "name": "scratch", "kind": "duckdb", "team_id": 1 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["config"], json!({}));

    // Read-write in Analytics is not enough to manage its connections.
    let res = api_post(
        &client,
        &srv.base_url,
        &lead,
        "/connections",
        &json!({ "name": "nope", "kind": "s3", "team_id": 2 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = api_put(
        &client,
        &srv.base_url,
        &lead,
        "/connections/1",
        &json!({ "name": "warehouse-prod-eu" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["name"], "warehouse-prod-eu");

    let admin = login(&client, &srv.base_url, "admin").await;
    let res = api_delete(&client, &srv.base_url, &admin, "/connections/2").await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = api_get(&client, &srv.base_url, &admin, "/connections/2").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Code locations follow the same capability.
    let res = api_post(
        &client,
        &srv.base_url,
        &dev,
        "/repositories",
        &json!({ "name": "etl-repo", "repo_url": "https://git.acme.test/etl.git", "team_id": 1 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = api_post(
        &client,
        &srv.base_url,
        &lead,
        "/repositories",
        &json!({ "name": "etl-repo", "repo_url": "https://git.acme.test/etl.git", "team_id": 1 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["branch"], "main");
}

#[tokio::test]
async fn schedules_follow_pipeline_edit_rights() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let analyst = login(&client, &srv.base_url, "analyst").await;
    let res = api_post(
        &client,
        &srv.base_url,
        &analyst,
        "/schedules",
        &json!({ "slug": "sneaky", "cron": "* * * * *", "team_id": 2 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "missing capability 'edit-pipelines'");

    let dev = login(&client, &srv.base_url, "dev").await;
    let res = api_post(
        &client,
        &srv.base_url,
        &dev,
        "/schedules",
        &json!({ "slug": "weekly-rollup", "cron": "0 3 * * 1", "team_id": 1 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["timezone"], "UTC");

    let lead = login(&client, &srv.base_url, "lead").await;
    let res = api_put(
        &client,
        &srv.base_url,
        &lead,
        "/schedules/2",
        &json!({ "cron": "30 * * * *" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["cron"], "30 * * * *");

    let res = api_delete(&client, &srv.base_url, &dev, "/schedules/1").await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = api_get(&client, &srv.base_url, &dev, "/schedules/1").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn org_administration_is_platform_admin_only() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let dev = login(&client, &srv.base_url, "dev").await;
    let res = api_get(&client, &srv.base_url, &dev, "/management/orgs").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "missing capability 'platform-admin'");

    let admin = login(&client, &srv.base_url, "admin").await;
    let rows = items(api_get(&client, &srv.base_url, &admin, "/management/orgs").await).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["code"], "ACME");

    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/management/orgs",
        &json!({ "name": "Globex Data", "code": "GLOBEX" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/management/orgs",
        &json!({ "name": "Globex Again", "code": "GLOBEX" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    // Members can read their own org by id; other orgs read as absent.
    let res = api_get(&client, &srv.base_url, &dev, "/management/orgs/1").await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = api_get(&client, &srv.base_url, &dev, "/management/orgs/2").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn team_creation_provisions_default_roles() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv.base_url, "admin").await;

    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/management/teams",
        &json!({ "name": "Platform Eng", "org_id": 1 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["team"]["name"], "Platform Eng");
    let roles: Vec<&str> = body["provisioned_roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        roles,
        vec!["PLATFORM_ENG_LEAD", "PLATFORM_ENG_RW", "PLATFORM_ENG_READER"]
    );
    assert!(
        body["provisioned_roles"]
            .as_array()
            .unwrap()
            .iter()
            .all(|r| r["created_by"] == "SYSTEM")
    );

    // A platform-wide caller must say which org the team belongs to.
    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/management/teams",
        &json!({ "name": "Orphan" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "org_id is required for platform-wide callers");

    let dev = login(&client, &srv.base_url, "dev").await;
    let res = api_post(
        &client,
        &srv.base_url,
        &dev,
        "/management/teams",
        &json!({ "name": "Shadow" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "missing capability 'manage-teams'");
}

#[tokio::test]
async fn cross_org_rows_are_invisible_to_other_orgs() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv.base_url, "admin").await;

    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/management/orgs",
        &json!({ "name": "Globex Data", "code": "GLOBEX" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/management/teams",
        &json!({ "name": "Core", "org_id": 2 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["team"]["id"], 3);

    // Team lists follow the caller's scope.
    let dev = login(&client, &srv.base_url, "dev").await;
    let rows = items(api_get(&client, &srv.base_url, &dev, "/management/teams").await).await;
    let names: Vec<&str> = rows.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Data Ops"]);

    let res = api_get(&client, &srv.base_url, &dev, "/management/teams/3").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Targeting a foreign org's team reads as a missing team, not a denial.
    let res = api_post(
        &client,
        &srv.base_url,
        &dev,
        "/pipelines",
        &json!({ "name": "intruder", "team_id": 3 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Team not found");

    let res = api_get(&client, &srv.base_url, &admin, "/management/teams/3").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn membership_changes_enforce_directory_rules() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv.base_url, "admin").await;

    // analyst joins Data Ops as read-write.
    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/management/teams/1/members",
        &json!({ "user_id": 3, "role_id": 5 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["username"], "analyst");
    assert_eq!(body["role"], "DATA_OPS_RW");

    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/management/teams/1/members",
        &json!({ "user_id": 3, "role_id": 5 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // A role provisioned for another team cannot be granted here.
    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/management/teams/1/members",
        &json!({ "user_id": 4, "role_id": 8 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "role is bound to a different team");

    // The platform admin account belongs to no org and cannot join teams.
    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/management/teams/1/members",
        &json!({ "user_id": 1, "role_id": 5 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "user does not belong to the team's organization");

    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/management/teams/1/members",
        &json!({ "user_id": 99, "role_id": 5 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Removal deactivates; the row stays in the history.
    let res = api_delete(&client, &srv.base_url, &admin, "/management/teams/1/members/3").await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = api_delete(&client, &srv.base_url, &admin, "/management/teams/1/members/3").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let lead = login(&client, &srv.base_url, "lead").await;
    let rows = items(api_get(&client, &srv.base_url, &lead, "/management/teams/1/members").await)
        .await;
    assert_eq!(rows.len(), 3);
    let analyst_row = rows.iter().find(|m| m["username"] == "analyst").unwrap();
    assert_eq!(analyst_row["active"], false);

    // Team leads manage their team; plain members do not.
    let dev = login(&client, &srv.base_url, "dev").await;
    let res = api_post(
        &client,
        &srv.base_url,
        &dev,
        "/management/teams/1/members",
        &json!({ "user_id": 3, "role_id": 6 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let analyst = login(&client, &srv.base_url, "analyst").await;
    let res = api_get(&client, &srv.base_url, &analyst, "/management/teams/2/members").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn user_administration_requires_manage_users() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let dev = login(&client, &srv.base_url, "dev").await;
    let res = api_get(&client, &srv.base_url, &dev, "/users").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "missing capability 'manage-users'");

    // The lead sees the org's accounts but not platform-wide ones.
    let lead = login(&client, &srv.base_url, "lead").await;
    let rows = items(api_get(&client, &srv.base_url, &lead, "/users").await).await;
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|u| u["username"] != "admin"));

    let res = api_get(&client, &srv.base_url, &lead, "/users/1").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let admin = login(&client, &srv.base_url, "admin").await;
    let rows = items(api_get(&client, &srv.base_url, &admin, "/users").await).await;
    assert_eq!(rows.len(), 5);

    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/users",
        &json!({
            "username": "newbie",
            "full_name": "New Bee",
            "email": "newbie@acme.test",
            "password": "long-enough-pw",
            "role_id": 3,
            "org_id": 1
        }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["role"], "DPE_DATA_ANALYST");
    assert!(body.get("password_hash").is_none());

    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/users",
        &json!({
            "username": "newbie",
            "full_name": "New Bee",
            "email": "newbie@acme.test",
            "password": "long-enough-pw",
            "role_id": 3
        }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = api_post(
        &client,
        &srv.base_url,
        &admin,
        "/users",
        &json!({
            "username": "shorty",
            "full_name": "Short Pw",
            "email": "shorty@acme.test",
            "password": "short",
            "role_id": 3
        }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = api_put(
        &client,
        &srv.base_url,
        &admin,
        "/users/2",
        &json!({ "full_name": "Devon R." }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["full_name"], "Devon R.");

    let res = api_put(
        &client,
        &srv.base_url,
        &admin,
        "/users/2",
        &json!({ "role_id": 99 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "unknown role");

    // Deactivation locks the account out.
    let res = api_delete(&client, &srv.base_url, &admin, "/users/2").await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = try_login(&client, &srv.base_url, "dev", DEMO_PASSWORD).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "inactive_user");
}

#[tokio::test]
async fn role_catalog_is_scoped_to_the_callers_org() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let admin = login(&client, &srv.base_url, "admin").await;
    let rows = items(api_get(&client, &srv.base_url, &admin, "/users/roles").await).await;
    assert_eq!(rows.len(), 9);

    let lead = login(&client, &srv.base_url, "lead").await;
    let rows = items(api_get(&client, &srv.base_url, &lead, "/users/roles").await).await;
    // Three global roles plus both ACME teams' provisioned roles.
    assert_eq!(rows.len(), 9);
    assert!(rows.iter().any(|r| r["name"] == "DPE_PLATFORM_ADMIN"));
    assert!(rows.iter().any(|r| r["name"] == "ANALYTICS_READER"));

    let dev = login(&client, &srv.base_url, "dev").await;
    let res = api_get(&client, &srv.base_url, &dev, "/users/roles").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn password_rotation_invalidates_the_old_password() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = login(&client, &srv.base_url, "dev").await;

    let res = api_post(
        &client,
        &srv.base_url,
        &token,
        "/auth/password",
        &json!({ "current_password": "wrong", "new_password": "rotated-pass-1" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "current password is incorrect");

    let res = api_post(
        &client,
        &srv.base_url,
        &token,
        "/auth/password",
        &json!({ "current_password": DEMO_PASSWORD, "new_password": "short" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = api_post(
        &client,
        &srv.base_url,
        &token,
        "/auth/password",
        &json!({ "current_password": DEMO_PASSWORD, "new_password": "rotated-pass-1" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = try_login(&client, &srv.base_url, "dev", DEMO_PASSWORD).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let res = try_login(&client, &srv.base_url, "dev", "rotated-pass-1").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_summary_counts_only_visible_rows() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let admin = login(&client, &srv.base_url, "admin").await;
    let res = api_get(&client, &srv.base_url, &admin, "/status/summary").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["connections"], 2);
    assert_eq!(body["pipelines"], 3);
    assert_eq!(body["schedules"], 2);
    assert_eq!(body["active_runs"], 1);
    assert_eq!(body["failed_today"], 1);

    let analyst = login(&client, &srv.base_url, "analyst").await;
    let res = api_get(&client, &srv.base_url, &analyst, "/status/summary").await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["connections"], 1);
    assert_eq!(body["pipelines"], 1);
    assert_eq!(body["schedules"], 1);
    assert_eq!(body["active_runs"], 1);
    assert_eq!(body["failed_today"], 0);

    // dev is focused on Data Ops: no running batch there, one failure.
    let dev = login(&client, &srv.base_url, "dev").await;
    let res = api_get(&client, &srv.base_url, &dev, "/status/summary").await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["pipelines"], 2);
    assert_eq!(body["active_runs"], 0);
    assert_eq!(body["failed_today"], 1);
}

#[tokio::test]
async fn recent_runs_are_newest_first_and_limited() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let admin = login(&client, &srv.base_url, "admin").await;
    let rows = items(api_get(&client, &srv.base_url, &admin, "/status/runs").await).await;
    let batches: Vec<i64> = rows.iter().map(|r| r["batch"].as_i64().unwrap()).collect();
    assert_eq!(batches, vec![91, 119, 118, 90]);

    let rows = items(api_get(&client, &srv.base_url, &admin, "/status/runs?limit=2").await).await;
    let batches: Vec<i64> = rows.iter().map(|r| r["batch"].as_i64().unwrap()).collect();
    assert_eq!(batches, vec![91, 119]);

    let analyst = login(&client, &srv.base_url, "analyst").await;
    let rows = items(api_get(&client, &srv.base_url, &analyst, "/status/runs").await).await;
    let batches: Vec<i64> = rows.iter().map(|r| r["batch"].as_i64().unwrap()).collect();
    assert_eq!(batches, vec![91, 90]);
    assert_eq!(rows[0]["state"], "running");
}

#[tokio::test]
async fn access_matrix_lists_every_grant_in_scope() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let analyst = login(&client, &srv.base_url, "analyst").await;
    let res = api_get(&client, &srv.base_url, &analyst, "/reports/access-matrix").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let admin = login(&client, &srv.base_url, "admin").await;
    let res = api_get(&client, &srv.base_url, &admin, "/reports/access-matrix").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let rows = body["rows"].as_array().unwrap();
    // 5 accounts, one Global row each, plus 4 active membership rows.
    assert_eq!(rows.len(), 9);

    let find = |username: &str, scope: &str| {
        rows.iter()
            .find(|r| r["username"] == username && r["scope"] == scope)
            .unwrap_or_else(|| panic!("no row for {username} / {scope}"))
    };
    assert_eq!(find("admin", "Global")["level"], "Admin");
    assert_eq!(find("dev", "Global")["level"], "User");
    assert_eq!(find("dev", "Data Ops")["role"], "DATA_OPS_RW");
    assert_eq!(find("dev", "Data Ops")["level"], "Write");
    assert_eq!(find("analyst", "Global")["level"], "Viewer");
    assert_eq!(find("analyst", "Analytics")["level"], "Read");
    assert_eq!(find("lead", "Data Ops")["level"], "Write");
    assert_eq!(find("lead", "Analytics")["level"], "Write");
    assert_eq!(find("ghost", "Global")["level"], "Viewer");

    // An org-scoped lead gets the same report without platform accounts.
    let lead = login(&client, &srv.base_url, "lead").await;
    let res = api_get(&client, &srv.base_url, &lead, "/reports/access-matrix").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 8);
    assert!(rows.iter().all(|r| r["username"] != "admin"));
}

#[tokio::test]
async fn access_matrix_exports_as_csv() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let admin = login(&client, &srv.base_url, "admin").await;
    let res = api_get(&client, &srv.base_url, &admin, "/reports/access-matrix.csv").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("content-type").unwrap().to_str().unwrap(),
        "text/csv"
    );
    assert!(
        res.headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("access_matrix_platform.csv")
    );
    let body = res.text().await.unwrap();
    assert_eq!(body.lines().next(), Some("username,full_name,scope,role,level"));
    assert!(body.contains("dev,Devon Rivera,Data Ops,DATA_OPS_RW,Write"));

    let lead = login(&client, &srv.base_url, "lead").await;
    let res = api_get(&client, &srv.base_url, &lead, "/reports/access-matrix.csv").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(
        res.headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("access_matrix_acme.csv")
    );
}
