use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use subtle::ConstantTimeEq;

use crate::admin::AdminState;

pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(key) if keys_match(key, &state.api_key) => Ok(next.run(request).await),
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Compares in time independent of where the keys differ. A length
/// mismatch folds into the same result.
fn keys_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    let width = a.len().max(b.len());
    let mut left = vec![0u8; width];
    let mut right = vec![0u8; width];
    left[..a.len()].copy_from_slice(a);
    right[..b.len()].copy_from_slice(b);

    (a.len().ct_eq(&b.len()) & left.ct_eq(&right)).into()
}
