use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use shared::MAX_USER_ID_LENGTH;
use validator::Validate;

use crate::errors::AppError;

/// Header set by the upstream gateway once the caller is authenticated
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity taken from the trusted gateway header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", USER_ID_HEADER)))?;

        if user_id.len() > MAX_USER_ID_LENGTH {
            return Err(AppError::Unauthorized(format!(
                "{} header exceeds {} characters",
                USER_ID_HEADER, MAX_USER_ID_LENGTH
            )));
        }

        Ok(AuthenticatedUser(user_id.to_string()))
    }
}

/// JSON body extractor that runs `validator` rules after deserializing
///
/// Both malformed bodies and rule violations are rejected with the standard
/// error body instead of axum's plain-text rejection.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    let detail = rejection.body_text();

    if let Some(field) = missing_field(&detail) {
        return AppError::MissingField(field.to_string());
    }

    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::Validation("Expected a JSON body with content-type application/json".to_string())
        }
        JsonRejection::JsonSyntaxError(_) => {
            AppError::Validation("Invalid request body: failed to parse JSON".to_string())
        }
        _ => {
            // serde's message names the offending field; drop the position suffix
            let message = detail
                .split(" at line")
                .next()
                .unwrap_or(detail.as_str())
                .trim()
                .to_string();
            AppError::Validation(format!("Invalid request body: {}", message))
        }
    }
}

fn missing_field(detail: &str) -> Option<&str> {
    detail
        .split("missing field `")
        .nth(1)
        .and_then(|rest| rest.split('`').next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_extraction() {
        let detail = "Failed to deserialize the JSON body into the target type: missing field `bet_amount` at line 1 column 2";
        assert_eq!(missing_field(detail), Some("bet_amount"));
        assert_eq!(missing_field("expected value at line 1"), None);
    }
}
