//! vault-server — HTTP front end for the relationship vault.
//!
//! Serves:
//! - Chat pages: server-rendered HTML with create, edit and delete via forms.
//! - JSON API under `/api`: orders, customers that reference orders (returned
//!   populated), users with embedded addresses, posts that reference an author.
//! - `/data`: a route behind a query-string token check.
//!
//! Storage is in-memory or SQLite (file) when the `sqlite` feature is enabled.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p vault-server
//!
//! # throwaway store with sample records
//! STORAGE_PROVIDER=memory SEED_DEMO=1 cargo run -p vault-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod chats;
mod config;
mod error;
mod middleware;
mod relations;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::Request,
    routing::{get, post},
    Router,
};
use domain::id::Base62IdGenerator;
use domain::service::Vault;
use domain::StdClock;
use tower::util::MapRequest;
use tower::Layer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::AppError;
use crate::store::AnyStore;

type AppVault = Vault<AnyStore, Base62IdGenerator, StdClock>;

#[derive(Clone)]
pub struct AppState {
    vault: Arc<AppVault>,
    access_token: Arc<str>,
}

impl AppState {
    fn new(vault: AppVault, access_token: &str) -> Self {
        Self {
            vault: Arc::new(vault),
            access_token: Arc::from(access_token),
        }
    }
}

type App = MapRequest<Router, fn(Request) -> Request>;

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_insecure();

    let store = match build_store(&cfg) {
        Ok(s) => s,
        Err(e) => {
            error!(err = %e, "failed to open store");
            std::process::exit(1);
        }
    };
    info!(backend = store.backend(), "store ready");

    let vault = Vault::new(store, Base62IdGenerator::default(), StdClock);
    if cfg.seed_demo {
        match vault.seed_demo() {
            Ok(report) => info!(
                chats = report.chats,
                orders = report.orders,
                customers = report.customers,
                "demo records seeded"
            ),
            Err(e) => {
                error!(err = %e, "seeding failed");
                std::process::exit(1);
            }
        }
    }
    let state = AppState::new(vault, &cfg.access_token);

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PATCH,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    let app = build_app(state, cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, "vault-server listening");
    if let Err(e) = axum::serve(listener, axum::ServiceExt::<Request>::into_make_service(app)).await
    {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct the store selected by config and feature flags.
fn build_store(cfg: &config::Config) -> Result<AnyStore, domain::CoreError> {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => AnyStore::sqlite(&cfg.db_path),
        #[cfg(not(feature = "sqlite"))]
        config::StorageProvider::Sqlite => {
            tracing::warn!("built without the sqlite feature; using memory store");
            Ok(AnyStore::memory())
        }
        config::StorageProvider::Memory => Ok(AnyStore::memory()),
    }
}

async fn root() -> &'static str {
    "Hi, I am root"
}

async fn data() -> &'static str {
    "data"
}

async fn page_not_found() -> AppError {
    AppError::PageNotFound
}

fn router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/data", get(data))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_token,
        ));

    Router::new()
        .route("/", get(root))
        .route("/chats", get(chats::index).post(chats::create))
        .route("/chats/new", get(chats::new_form))
        .route(
            "/chats/:id",
            get(chats::show)
                .patch(chats::update)
                .delete(chats::destroy),
        )
        .route("/chats/:id/edit", get(chats::edit_form))
        .route(
            "/api/orders",
            post(relations::create_order).get(relations::list_orders),
        )
        .route(
            "/api/orders/:id",
            axum::routing::delete(relations::delete_order),
        )
        .route(
            "/api/customers",
            post(relations::create_customer).get(relations::list_customers),
        )
        .route(
            "/api/customers/:id",
            get(relations::get_customer).delete(relations::delete_customer),
        )
        .route("/api/customers/:id/orders", post(relations::attach_order))
        .route(
            "/api/users",
            post(relations::create_user).get(relations::list_users),
        )
        .route("/api/users/:id", get(relations::get_user))
        .route("/api/users/:id/addresses", post(relations::add_address))
        .route("/api/users/:id/posts", get(relations::list_user_posts))
        .route("/api/posts", post(relations::create_post))
        .route("/api/posts/:id", get(relations::get_post))
        .merge(guarded)
        .fallback(page_not_found)
        .with_state(state)
}

/// Router plus tracing, request ids and CORS, wrapped so the form method
/// override runs before routing.
fn build_app(state: AppState, cors: CorsLayer) -> App {
    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let routes = router(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(cors);

    tower::util::MapRequestLayer::new(middleware::method_override as fn(Request) -> Request)
        .layer(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use domain::RecordId;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        let vault = Vault::new(AnyStore::memory(), Base62IdGenerator::default(), StdClock);
        AppState::new(vault, "giveaccess")
    }

    fn app(state: AppState) -> App {
        build_app(state, CorsLayer::permissive())
    }

    async fn send(app: &App, req: Request) -> (StatusCode, String) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get_req(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn form(uri: &str, body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json_req(method: &str, uri: &str, body: Value) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send_json(app: &App, req: Request) -> (StatusCode, Value) {
        let (status, body) = send(app, req).await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn root_greets() {
        let app = app(test_state());
        let (status, body) = send(&app, get_req("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hi, I am root");
    }

    #[tokio::test]
    async fn chat_create_edit_delete_through_forms() {
        let state = test_state();
        let app = app(state.clone());

        let (status, _) = send(&app, form("/chats", "from=neha&to=preeti&msg=send+me+notes")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let chats = state.vault.list_chats().unwrap();
        assert_eq!(chats.len(), 1);
        let id = chats[0].id.clone();

        let (status, body) = send(&app, get_req("/chats")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("send me notes"));
        assert!(body.contains(&format!("/chats/{}?_method=DELETE", id)));

        let (status, body) = send(&app, get_req(&format!("/chats/{}/edit", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(&format!("/chats/{}?_method=PATCH", id)));

        let (status, _) = send(
            &app,
            form(&format!("/chats/{}?_method=PATCH", id), "msg=notes+sent"),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        let updated = state.vault.get_chat(&id).unwrap().unwrap();
        assert_eq!(updated.message, "notes sent");
        assert_eq!(updated.from, "neha");
        assert_eq!(updated.date, chats[0].date);

        let (status, _) = send(&app, form(&format!("/chats/{}?_method=DELETE", id), "")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert!(state.vault.list_chats().unwrap().is_empty());

        let (status, _) = send(&app, get_req(&format!("/chats/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn overlong_chat_message_is_rejected() {
        let state = test_state();
        let app = app(state.clone());
        let msg = "x".repeat(51);
        let (status, _) = send(&app, form("/chats", &format!("from=a&to=b&msg={}", msg))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(state.vault.list_chats().unwrap().is_empty());

        let msg = "x".repeat(50);
        let (status, _) = send(&app, form("/chats", &format!("from=a&to=b&msg={}", msg))).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn data_requires_token() {
        let app = app(test_state());

        let (status, body) = send(&app, get_req("/data")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "ACCESS DENIED");

        let (status, _) = send(&app, get_req("/data?token=nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, get_req("/data?token=giveaccess")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "data");
    }

    #[tokio::test]
    async fn token_with_reserved_characters_is_decoded() {
        let vault = Vault::new(AnyStore::memory(), Base62IdGenerator::default(), StdClock);
        let app = app(AppState::new(vault, "s3cr+t&x"));

        let (status, body) = send(&app, get_req("/data?token=s3cr%2Bt%26x")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "data");

        // A bare `+` decodes to a space, so it does not match.
        let (status, _) = send(&app, get_req("/data?token=s3cr+t&x")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_path_is_page_not_found() {
        let app = app(test_state());
        let (status, body) = send(&app, get_req("/nowhere/at/all")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Page Not Found");
    }

    async fn create_order(app: &App, item: &str, price: f64) -> String {
        let (status, body) = send_json(
            app,
            json_req("POST", "/api/orders", json!({"item": item, "price": price})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn customer_is_populated_in_reference_order() {
        let app = app(test_state());
        let samosa = create_order(&app, "Samosa", 12.0).await;
        let chips = create_order(&app, "Chips", 10.0).await;

        let (status, customer) = send_json(
            &app,
            json_req(
                "POST",
                "/api/customers",
                json!({"name": "Rahul Kumar", "orders": [chips, samosa]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(customer["orders"], json!([chips, samosa]));
        let cid = customer["id"].as_str().unwrap().to_string();

        let (status, populated) =
            send_json(&app, get_req(&format!("/api/customers/{}", cid))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(populated["name"], "Rahul Kumar");
        assert_eq!(populated["orders"][0]["item"], "Chips");
        assert_eq!(populated["orders"][1]["item"], "Samosa");
        assert_eq!(populated["missing_orders"], json!([]));

        let (status, _) = send(
            &app,
            json_req("DELETE", &format!("/api/orders/{}", chips), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, populated) = send_json(&app, get_req(&format!("/api/customers/{}", cid))).await;
        assert_eq!(populated["orders"].as_array().unwrap().len(), 1);
        assert_eq!(populated["orders"][0]["id"], samosa.as_str());
        assert_eq!(populated["missing_orders"], json!([chips]));
    }

    #[tokio::test]
    async fn attaching_orders_enforces_reference_rules() {
        let app = app(test_state());
        let samosa = create_order(&app, "Samosa", 12.0).await;
        let (_, customer) = send_json(
            &app,
            json_req("POST", "/api/customers", json!({"name": "Rahul"})),
        )
        .await;
        let cid = customer["id"].as_str().unwrap().to_string();
        let attach = format!("/api/customers/{}/orders", cid);

        let (status, body) =
            send_json(&app, json_req("POST", &attach, json!({"order_id": samosa}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["orders"], json!([samosa]));

        let (status, body) =
            send_json(&app, json_req("POST", &attach, json!({"order_id": samosa}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "duplicate_reference");

        let (status, body) =
            send_json(&app, json_req("POST", &attach, json!({"order_id": "zzzz9999"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "unknown_reference");

        let (status, _) = send(
            &app,
            json_req("POST", "/api/customers/zzzz9999/orders", json!({"order_id": samosa})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_customer_removes_its_orders() {
        let state = test_state();
        let app = app(state.clone());
        let samosa = create_order(&app, "Samosa", 12.0).await;
        let chocolate = create_order(&app, "Chocolate", 40.0).await;
        let (_, customer) = send_json(
            &app,
            json_req("POST", "/api/customers", json!({"name": "Rahul", "orders": [samosa]})),
        )
        .await;
        let cid = customer["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            json_req("DELETE", &format!("/api/customers/{}", cid), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let remaining: Vec<RecordId> = state
            .vault
            .list_orders()
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(remaining, vec![RecordId::new(chocolate).unwrap()]);

        let (status, _) = send(&app, get_req(&format!("/api/customers/{}", cid))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreadable_json_bodies_get_json_errors() {
        let state = test_state();
        let app = app(state.clone());

        let (status, body) = send_json(
            &app,
            json_req(
                "POST",
                "/api/customers",
                json!({"name": "Rahul", "orders": ["not-an-id!"]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(body["error"]["message"].as_str().unwrap().contains("orders"));

        let (status, body) =
            send_json(&app, json_req("POST", "/api/orders", json!({"item": "tea"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(body["error"]["message"].as_str().unwrap().contains("price"));

        let (status, body) = send_json(
            &app,
            json_req("POST", "/api/posts", json!({"content": "hi", "likes": -1, "author": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");

        assert!(state.vault.list_customers().unwrap().is_empty());
        assert!(state.vault.list_orders().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let app = app(test_state());
        let (status, body) = send_json(&app, get_req("/api/customers/not-an-id")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_id");
    }

    #[tokio::test]
    async fn post_is_populated_with_author() {
        let app = app(test_state());
        let (status, user) = send_json(
            &app,
            json_req(
                "POST",
                "/api/users",
                json!({
                    "username": "sherlockholmes",
                    "addresses": [{"location": "221B Baker Street", "city": "London"}]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let uid = user["id"].as_str().unwrap().to_string();

        let (status, user) = send_json(
            &app,
            json_req(
                "POST",
                &format!("/api/users/{}/addresses", uid),
                json!({"location": "P32 WallStreet", "city": "London"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["addresses"].as_array().unwrap().len(), 2);
        assert_eq!(user["addresses"][1]["location"], "P32 WallStreet");

        let (status, post) = send_json(
            &app,
            json_req(
                "POST",
                "/api/posts",
                json!({"content": "Hello world", "likes": 7, "author": uid}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let pid = post["id"].as_str().unwrap().to_string();

        let (status, populated) = send_json(&app, get_req(&format!("/api/posts/{}", pid))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(populated["likes"], 7);
        assert_eq!(populated["author"]["username"], "sherlockholmes");

        let (status, posts) =
            send_json(&app, get_req(&format!("/api/users/{}/posts", uid))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(posts.as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            json_req(
                "POST",
                "/api/posts",
                json!({"content": "orphan", "author": "zzzz9999"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let app = app(test_state());
        let resp = app.clone().oneshot(get_req("/")).await.unwrap();
        assert!(resp.headers().contains_key("x-request-id"));
    }
}
