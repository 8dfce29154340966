//! Path extractor for wallet account addresses.
//!
//! Rejects malformed addresses with a structured 400 before any handler or
//! store access runs.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use wrapped_core::AccountId;

use crate::error::ApiError;

/// A validated account address taken from the `address` path segment.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_summary(AccountPath(account): AccountPath) -> ApiResult<Json<WalletSummary>> {
///     // account is already a well-formed AccountId
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AccountPath(pub AccountId);

#[async_trait]
impl<S> FromRequestParts<S> for AccountPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(address): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_input(format!("Missing account address: {}", e)))?;

        AccountId::parse(address).map(AccountPath).map_err(ApiError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    async fn echo(AccountPath(account): AccountPath) -> String {
        account.to_string()
    }

    fn router() -> Router {
        Router::new().route("/wallet/:address", get(echo))
    }

    #[tokio::test]
    async fn test_valid_address_extracted() {
        let address = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";
        let response = router()
            .oneshot(
                Request::builder()
                    .uri(format!("/wallet/{}", address))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], address.as_bytes());
    }

    #[tokio::test]
    async fn test_short_address_rejected() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/wallet/GSHORT")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(error.code, ErrorCode::InvalidFormat);
    }
}
