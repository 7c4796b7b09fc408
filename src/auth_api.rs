use crate::api_client::{ApiClient, RequestOptions};
use crate::error::{ClientError, ClientResult};
use crate::models::{
    ApiEnvelope, AuthResponse, RefreshTokenRequest, SendOtpRequest, SessionTokens,
    VerifyOtpRequest,
};
use crate::validation::{
    validate_age, validate_answer_code, validate_country_code, validate_name, validate_otp,
    validate_phone, validate_positive, validate_token,
};
use serde_json::Value;

pub const OTP_REQUEST_PATH: &str = "/auth/otp/request";
pub const OTP_VERIFY_PATH: &str = "/auth/otp/verify";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";

fn validated(result: Result<(), String>) -> ClientResult<()> {
    result.map_err(ClientError::Validation)
}

fn check_verify_request(req: &VerifyOtpRequest) -> ClientResult<()> {
    validated(validate_phone(&req.phone))?;
    validated(validate_country_code(&req.country_code))?;
    validated(validate_otp(&req.otp))?;
    validated(validate_name(&req.name))?;
    validate_age(&req.age).map_err(ClientError::Validation)?;
    validated(validate_positive("Height", req.height_in_cm))?;
    validated(validate_positive("Weight", req.weight_in_kg))?;
    validated(validate_answer_code("q1", req.q1))?;
    validated(validate_answer_code("q2", req.q2))?;
    validated(validate_answer_code("q3", req.q3))
}

/// Accepts `{accessToken, refreshToken}` at the top level or under `data`.
fn parse_session_tokens(body: Value) -> ClientResult<SessionTokens> {
    let wrapped = body
        .get("data")
        .filter(|data| data.get("accessToken").is_some())
        .cloned();
    let tokens: SessionTokens = serde_json::from_value(wrapped.unwrap_or(body))?;
    if tokens.access_token.trim().is_empty() || tokens.refresh_token.trim().is_empty() {
        return Err(ClientError::Decode(
            "Refresh response is missing tokens".to_string(),
        ));
    }
    Ok(tokens)
}

impl ApiClient {
    /// Asks the backend to text a one-time password to the phone.
    pub async fn send_otp(&self, req: &SendOtpRequest) -> ClientResult<ApiEnvelope> {
        validated(validate_phone(&req.phone))?;
        validated(validate_country_code(&req.country_code))?;
        tracing::debug!(country_code = %req.country_code, "requesting OTP");
        self.public_request(OTP_REQUEST_PATH, RequestOptions::post().json(req)?)
            .await
    }

    /// Verifies the OTP and returns the new session. Nothing is persisted;
    /// pass the result to [`persist_session`](crate::persist_session).
    pub async fn verify_otp(&self, req: &VerifyOtpRequest) -> ClientResult<AuthResponse> {
        check_verify_request(req)?;
        self.public_request(OTP_VERIFY_PATH, RequestOptions::post().json(req)?)
            .await
    }

    /// Exchanges a refresh token for a new token pair. Never sends a bearer
    /// header and never retries.
    pub async fn refresh_token(&self, refresh_token: &str) -> ClientResult<SessionTokens> {
        validated(validate_token(refresh_token))?;
        let raw = self
            .public_post(REFRESH_PATH, &RefreshTokenRequest { refresh_token })
            .await?;
        if !raw.is_success() {
            return Err(ClientError::RefreshRejected {
                status: raw.status.as_u16(),
            });
        }
        let body = raw.body.ok_or_else(|| {
            ClientError::Decode("Refresh response is not JSON".to_string())
        })?;
        parse_session_tokens(body)
    }

    /// Revokes the refresh token on the backend. Local state is left alone;
    /// callers clear it with [`clear_all_auth_data`](crate::clear_all_auth_data).
    pub async fn logout(&self, refresh_token: &str) -> ClientResult<ApiEnvelope> {
        validated(validate_token(refresh_token))?;
        let options = RequestOptions::post().json(&RefreshTokenRequest { refresh_token })?;
        self.request(LOGOUT_PATH, options).await
    }
}
