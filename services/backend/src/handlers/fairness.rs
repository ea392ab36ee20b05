use axum::Json;

use crate::{
    domain::{VerifyRequest, VerifyResponse},
    errors::Result,
    extractors::ValidatedJson,
    fairness,
};

/// Public: recompute an outcome from revealed seeds
pub async fn verify(ValidatedJson(req): ValidatedJson<VerifyRequest>) -> Result<Json<VerifyResponse>> {
    let response = fairness::verify(&req)?;
    Ok(Json(response))
}
