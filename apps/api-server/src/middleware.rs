//! Request middleware: the demo token guard and HTML-form method override.

use axum::{
    extract::{Query, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tracing::warn;

use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[derive(Deserialize)]
struct OverrideQuery {
    #[serde(rename = "_method")]
    method: Option<String>,
}

/// Let `/data` through only when `?token=` matches the configured token.
pub async fn require_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = Query::<TokenQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(q)| q.token);
    if token.as_deref() == Some(&*state.access_token) {
        return Ok(next.run(req).await);
    }
    warn!(path = %req.uri().path(), "access token missing or wrong");
    Err(AppError::AccessDenied)
}

/// Rewrite `POST ...?_method=PATCH|PUT|DELETE` into that method.
///
/// Browsers only submit forms with GET and POST. This must run before routing,
/// so it wraps the router rather than being added with `Router::layer`.
pub fn method_override(mut req: Request) -> Request {
    if req.method() != Method::POST {
        return req;
    }
    let Some(wanted) = Query::<OverrideQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(q)| q.method)
    else {
        return req;
    };
    let method = match wanted.to_ascii_uppercase().as_str() {
        "PATCH" => Method::PATCH,
        "PUT" => Method::PUT,
        "DELETE" => Method::DELETE,
        _ => return req,
    };
    *req.method_mut() = method;
    req
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn post(uri: &str) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn override_rewrites_post_only() {
        assert_eq!(method_override(post("/chats/1?_method=PATCH")).method(), Method::PATCH);
        assert_eq!(method_override(post("/chats/1?_method=delete")).method(), Method::DELETE);
        assert_eq!(method_override(post("/chats/1?_method=TRACE")).method(), Method::POST);
        assert_eq!(method_override(post("/chats")).method(), Method::POST);
        assert_eq!(
            method_override(post("/chats/1?page=2&_method=%50ATCH")).method(),
            Method::PATCH
        );

        let get = Request::builder()
            .uri("/chats/1?_method=DELETE")
            .body(Body::empty())
            .unwrap();
        assert_eq!(method_override(get).method(), Method::GET);
    }
}
