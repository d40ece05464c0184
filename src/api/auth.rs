use std::sync::Arc;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::core::AppState;

/// HTTP basic auth for the admin surface. Open when credentials are not
/// configured; both username and password must be set to arm it.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let (Some(username), Some(password)) = (
        state.env.admin_username.as_deref(),
        state.env.admin_password.as_deref(),
    ) else {
        return next.run(request).await;
    };

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| BASE64.decode(encoded).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .and_then(|credentials| {
            credentials
                .split_once(':')
                .map(|(user, pass)| user == username && pass == password)
        })
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header(header::WWW_AUTHENTICATE, "Basic realm=\"Admin Panel\"")
            .body(Body::from("Unauthorized"))
            .unwrap()
    }
}
