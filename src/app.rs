use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, qa};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(qa::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut b = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut b = Request::builder().uri(uri);
        if let Some(t) = token {
            b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(Body::empty()).unwrap()
    }

    fn login_form(username: &str, password: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/login/access-token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={username}&password={password}")))
            .unwrap()
    }

    async fn register_and_login(app: &Router, username: &str) -> String {
        let resp = send(
            app,
            post_json(
                "/api/register",
                json!({"username": username, "password": "password-1", "age": 20}),
                None,
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!("SUCCESS"));

        let resp = send(app, login_form(username, "password-1")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["expires_in"], 30 * 60);
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health() {
        let app = build_app(AppState::fake());
        let resp = send(&app, get("/api/health", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_login_and_profile() {
        let app = build_app(AppState::fake());
        let token = register_and_login(&app, "alice").await;

        let resp = send(&app, get("/api/profile", Some(&token))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let profile = body_json(resp).await;
        assert_eq!(profile["username"], "alice");
        assert_eq!(profile["age"], 20);
        assert!(profile.get("password_hash").is_none());
        assert!(profile.get("password").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_conflict() {
        let app = build_app(AppState::fake());
        register_and_login(&app, "alice").await;
        let resp = send(
            &app,
            post_json(
                "/api/register",
                json!({"username": "alice", "password": "password-2"}),
                None,
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["error"]["code"], "DUPLICATE_USER");
    }

    #[tokio::test]
    async fn bad_login_and_missing_token_are_unauthorized() {
        let app = build_app(AppState::fake());
        register_and_login(&app, "alice").await;

        let resp = send(&app, login_form("alice", "nope-nope")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");

        let resp = send(&app, get("/api/profile", None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = send(&app, get("/api/profile", Some("not-a-token"))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_upload_requires_auth_and_targets_self() {
        let app = build_app(AppState::fake());
        let token = register_and_login(&app, "alice").await;

        let body = json!({"username": "alice", "sex": "f", "age": 31, "phone": "555-0100"});
        let resp = send(&app, post_json("/api/profile/upload", body.clone(), None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = send(&app, post_json("/api/profile/upload", body, Some(&token))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated = body_json(resp).await;
        assert_eq!(updated["age"], 31);
        assert_eq!(updated["phone"], "555-0100");

        let other = json!({"username": "bob", "sex": "m", "age": 1, "phone": "0"});
        let resp = send(&app, post_json("/api/profile/upload", other, Some(&token))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn question_and_answer_flow() {
        let app = build_app(AppState::fake());

        let resp = send(
            &app,
            post_json(
                "/api/questions/add",
                json!({
                    "qId": "client-chosen",
                    "title": "How do lifetimes work?",
                    "description": "Elision rules confuse me",
                    "author": {"username": "alice"}
                }),
                None,
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let location = resp
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(body_json(resp).await, json!(true));
        let q_id = location.trim_start_matches("/api/questions/").to_string();
        assert_ne!(q_id, "client-chosen");

        let resp = send(&app, get("/api/questions", None)).await;
        let list = body_json(resp).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["qId"], q_id.as_str());
        assert!(list[0].get("answerList").is_none());

        let resp = send(&app, get(&location, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let summary = body_json(resp).await;
        assert_eq!(summary["title"], "How do lifetimes work?");
        assert_eq!(summary["description"], "Elision rules confuse me");

        let mut answer_ids = Vec::new();
        for body in ["Read the nomicon", "Draw the scopes"] {
            let resp = send(
                &app,
                post_json(
                    &format!("/api/questions/{q_id}/answers/add"),
                    json!({"body": body, "author": {"username": "bob"}}),
                    None,
                ),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let loc = resp.headers()[header::LOCATION].to_str().unwrap().to_string();
            answer_ids.push(loc.rsplit('/').next().unwrap().to_string());
        }

        let resp = send(&app, get(&format!("/api/questions/{q_id}/answers"), None)).await;
        let answers = body_json(resp).await;
        assert_eq!(answers.as_array().unwrap().len(), 2);
        assert_eq!(answers[0]["body"], "Read the nomicon");

        let resp = send(
            &app,
            get(&format!("/api/questions/{q_id}/answers/{}", answer_ids[1]), None),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["body"], "Draw the scopes");
    }

    #[tokio::test]
    async fn missing_resources_are_not_found() {
        let app = build_app(AppState::fake());
        let resp = send(&app, get("/api/questions/nope", None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(&app, get("/api/questions/nope/answers", None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(&app, get("/api/questions/nope/answers/x", None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(
            &app,
            post_json(
                "/api/questions/nope/answers/add",
                json!({"body": "hi", "author": {"username": "bob"}}),
                None,
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn authenticated_author_is_denormalized_from_token() {
        let app = build_app(AppState::fake());
        let token = register_and_login(&app, "carol").await;
        let resp = send(
            &app,
            post_json(
                "/api/questions/add",
                json!({"title": "t", "description": "d", "author": {"username": "someone-else"}}),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = send(&app, post_json("/api/search", json!({"query": "CAROL"}), None)).await;
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);
        let resp = send(&app, post_json("/api/search", json!({"query": "someone"}), None)).await;
        assert!(body_json(resp).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_matches_fields_and_empty_query_matches_all() {
        let app = build_app(AppState::fake());
        for (title, author) in [("Tokio runtime", "alice"), ("Serde derive", "bob")] {
            let resp = send(
                &app,
                post_json(
                    "/api/questions/add",
                    json!({"title": title, "description": "", "author": {"username": author}}),
                    None,
                ),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let resp = send(&app, post_json("/api/search", json!({"query": "ALICE"}), None)).await;
        let hits = body_json(resp).await;
        assert_eq!(hits.as_array().unwrap().len(), 1);
        assert_eq!(hits[0]["title"], "Tokio runtime");

        let resp = send(&app, post_json("/api/search", json!({"query": ""}), None)).await;
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn malformed_body_is_validation_error() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .method("POST")
            .uri("/api/questions/add")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["code"], "VALIDATION_ERROR");
    }
}
