//! Buyer identity extractor.
//!
//! The authenticating gateway in front of this service resolves the session
//! and forwards the buyer's id in `X-User-ID`. This core trusts that header
//! but manages no sessions or tokens itself.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

#[derive(Debug, Clone)]
pub struct BuyerContext {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for BuyerContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-ID")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::AuthError(anyhow::anyhow!(
                    "Missing X-User-ID header (required from the auth gateway)"
                ))
            })?;

        tracing::Span::current().record("user_id", user_id);

        Ok(BuyerContext {
            user_id: user_id.to_string(),
        })
    }
}
