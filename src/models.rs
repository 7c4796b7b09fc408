//! Wire types exchanged with the ZeeFit backend.
//!
//! Field names follow the backend's JSON (camelCase, plus the snake_case
//! `status_code` and Mongo-style `_id`). Unknown fields are ignored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Generic response wrapper used by every non-auth endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T = Value> {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

/// Returned by OTP verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
    #[serde(rename = "status_code", default)]
    pub status_code: u16,
}

impl AuthResponse {
    pub fn tokens(&self) -> SessionTokens {
        SessionTokens {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Lenient parse of free-form input ("Male", "female", ...).
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

fn loose_number(value: Option<Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn loose_integer(value: Option<Value>, max: u32) -> Option<u32> {
    loose_number(value)
        .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(max))
        .map(|n| n as u32)
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(loose_integer(Option::deserialize(d)?, u32::MAX))
}

fn lenient_u8<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    Ok(loose_integer(Option::deserialize(d)?, u32::from(u8::MAX)).map(|n| n as u8))
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(loose_number(Option::deserialize(d)?))
}

fn lenient_gender<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Gender>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Gender::parse(&s),
        _ => None,
    })
}

/// Profile as the backend returns it. Decoding is lenient: missing identity
/// fields become empty strings, and numbers may arrive as strings. Values
/// that cannot be read are dropped rather than failing the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_gender",
        skip_serializing_if = "Option::is_none"
    )]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub height_in_cm: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight_in_kg: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_u8",
        skip_serializing_if = "Option::is_none"
    )]
    pub q1: Option<u8>,
    #[serde(
        default,
        deserialize_with = "lenient_u8",
        skip_serializing_if = "Option::is_none"
    )]
    pub q2: Option<u8>,
    #[serde(
        default,
        deserialize_with = "lenient_u8",
        skip_serializing_if = "Option::is_none"
    )]
    pub q3: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub phone: String,
    pub country_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub phone: String,
    pub country_code: String,
    pub otp: String,
    pub name: String,
    /// Sent as entered; the backend accepts the string form.
    pub age: String,
    pub gender: Gender,
    pub height_in_cm: f64,
    pub weight_in_kg: f64,
    pub q1: u8,
    pub q2: u8,
    pub q3: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Partial profile update; unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_in_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_in_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q1: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q2: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q3: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &ProfileUpdate::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_id: String,
    pub os: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUpdate {
    pub device: DeviceInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Draft,
    Active,
    Archived,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    WeightLoss,
    Calories,
    Consistency,
    Steps,
    Marathon,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Invite,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_steps: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_logs: Option<Vec<String>>,
    #[serde(default)]
    pub proof_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    #[serde(rename = "_id")]
    pub id: String,
    pub slug: String,
    pub name: String,
    pub status: ChallengeStatus,
    pub starts_at: String,
    pub ends_at: String,
    pub goal_type: GoalType,
    #[serde(default)]
    pub rules: ChallengeRules,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeParticipant {
    #[serde(rename = "_id")]
    pub id: String,
    pub challenge_id: String,
    pub user_id: String,
    pub joined_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_metrics: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spirit_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Query parameters shared by the challenge listing endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ChallengeQuery {
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengePage<T = Challenge> {
    #[serde(default = "Vec::new")]
    pub challenges: Vec<T>,
    #[serde(default)]
    pub pagination: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedChallenge {
    pub participant: ChallengeParticipant,
    pub challenge: Challenge,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub total_days: i64,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    pub challenge: Challenge,
    pub participation: ChallengeParticipant,
    pub progress: ProgressSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_metrics: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spirit_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency_pct: Option<f64>,
}

/// Outcome of joining several challenges at once. Individual failures are
/// reported here rather than failing the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSummary {
    pub successful: Vec<ApiEnvelope<JoinedChallenge>>,
    pub failed: Vec<JoinFailure>,
    pub total_requested: usize,
    pub total_successful: usize,
    pub total_failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinFailure {
    pub challenge_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeData {
    pub user: User,
    #[serde(default)]
    pub challenges: Vec<Challenge>,
    #[serde(default)]
    pub stats: Value,
}
