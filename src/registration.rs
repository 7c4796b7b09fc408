//! Onboarding answers kept between sending the OTP and verifying it.
//!
//! The draft lives in the session store under `registrationData` with no
//! expiry. Loading is lenient: any field that is missing, empty or zero falls
//! back to its default, so a partial draft still produces a valid
//! verification request.

use crate::error::{ClientError, ClientResult};
use crate::models::{Gender, VerifyOtpRequest};
use crate::session_store::{SessionStore, REGISTRATION_DATA_KEY};
use crate::validation::{validate_age, validate_name, validate_phone, validate_positive};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_COUNTRY_CODE: &str = "+91";

const DEFAULT_NAME: &str = "User";
const DEFAULT_AGE: &str = "25";
const DEFAULT_HEIGHT_CM: f64 = 175.0;
const DEFAULT_WEIGHT_KG: f64 = 70.0;
const DEFAULT_ANSWERS: (u8, u8, u8) = (1, 2, 3);

const CM_PER_FOOT: f64 = 30.48;
const CM_PER_INCH: f64 = 2.54;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeightInput {
    Centimeters(f64),
    FeetInches { feet: f64, inches: f64 },
}

impl HeightInput {
    /// Height in whole centimeters.
    pub fn to_cm(self) -> f64 {
        let cm = match self {
            HeightInput::Centimeters(cm) => cm,
            HeightInput::FeetInches { feet, inches } => feet * CM_PER_FOOT + inches * CM_PER_INCH,
        };
        cm.round()
    }
}

/// "What's holding you back?"
pub fn holding_back_code(answer: &str) -> u8 {
    match answer {
        "Motivation" => 1,
        "Disciplined" => 2,
        "Time" => 3,
        _ => 4,
    }
}

/// "What do you want to improve?"
pub fn improvement_code(answer: &str) -> u8 {
    match answer {
        "better_health" => 1,
        "more_energy" => 2,
        "increased_focus" => 3,
        _ => 4,
    }
}

/// "What's your biggest challenge?"
pub fn challenge_code(answer: &str) -> u8 {
    match answer {
        "lose_weight" => 1,
        "gain_muscles" => 2,
        "discipline" => 3,
        _ => 4,
    }
}

/// Raw onboarding answers as a user enters them.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationAnswers {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub height: HeightInput,
    pub weight_kg: f64,
    pub holding_back: String,
    pub improve: String,
    pub challenge: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDraft {
    pub name: String,
    pub age: String,
    pub gender: Gender,
    pub height_in_cm: f64,
    pub weight_in_kg: f64,
    pub q1: u8,
    pub q2: u8,
    pub q3: u8,
    pub phone: String,
    pub country_code: String,
}

impl Default for RegistrationDraft {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            age: DEFAULT_AGE.to_string(),
            gender: Gender::Male,
            height_in_cm: DEFAULT_HEIGHT_CM,
            weight_in_kg: DEFAULT_WEIGHT_KG,
            q1: DEFAULT_ANSWERS.0,
            q2: DEFAULT_ANSWERS.1,
            q3: DEFAULT_ANSWERS.2,
            phone: String::new(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
        }
    }
}

impl RegistrationDraft {
    /// Validates the answers and converts them into the stored form.
    pub fn from_answers(answers: &RegistrationAnswers) -> ClientResult<Self> {
        let invalid = ClientError::Validation;
        validate_name(&answers.name).map_err(invalid)?;
        validate_age(&answers.age).map_err(invalid)?;
        let gender = Gender::parse(&answers.gender)
            .ok_or_else(|| invalid(format!("Unknown gender: {}", answers.gender)))?;
        let height_in_cm = answers.height.to_cm();
        validate_positive("Height", height_in_cm).map_err(invalid)?;
        validate_positive("Weight", answers.weight_kg).map_err(invalid)?;
        validate_phone(&answers.phone).map_err(invalid)?;

        Ok(Self {
            name: answers.name.trim().to_string(),
            age: answers.age.trim().to_string(),
            gender,
            height_in_cm,
            weight_in_kg: answers.weight_kg,
            q1: holding_back_code(&answers.holding_back),
            q2: improvement_code(&answers.improve),
            q3: challenge_code(&answers.challenge),
            phone: answers.phone.clone(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationDraftRaw {
    name: Option<String>,
    age: Option<Value>,
    gender: Option<String>,
    height_in_cm: Option<f64>,
    weight_in_kg: Option<f64>,
    q1: Option<u8>,
    q2: Option<u8>,
    q3: Option<u8>,
    phone: Option<String>,
    country_code: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_zero<T: PartialEq + Default>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v != T::default())
}

fn normalize_draft(raw: RegistrationDraftRaw) -> RegistrationDraft {
    let base = RegistrationDraft::default();
    let age = match raw.age {
        Some(Value::String(s)) => non_empty(Some(s)),
        Some(Value::Number(n)) => n.as_u64().filter(|n| *n > 0).map(|n| n.to_string()),
        _ => None,
    };
    RegistrationDraft {
        name: non_empty(raw.name).unwrap_or(base.name),
        age: age.unwrap_or(base.age),
        gender: raw
            .gender
            .as_deref()
            .and_then(Gender::parse)
            .unwrap_or(base.gender),
        height_in_cm: non_zero(raw.height_in_cm).unwrap_or(base.height_in_cm),
        weight_in_kg: non_zero(raw.weight_in_kg).unwrap_or(base.weight_in_kg),
        q1: non_zero(raw.q1).unwrap_or(base.q1),
        q2: non_zero(raw.q2).unwrap_or(base.q2),
        q3: non_zero(raw.q3).unwrap_or(base.q3),
        phone: non_empty(raw.phone).unwrap_or(base.phone),
        country_code: non_empty(raw.country_code).unwrap_or(base.country_code),
    }
}

pub fn save_draft(store: &dyn SessionStore, draft: &RegistrationDraft) -> ClientResult<()> {
    let body = serde_json::to_string(draft)
        .map_err(|e| ClientError::Store(format!("Failed to serialize registration data: {e}")))?;
    store.set(REGISTRATION_DATA_KEY, &body, None)
}

/// The stored draft, or `None` when nothing usable is stored.
pub fn load_draft(store: &dyn SessionStore) -> Option<RegistrationDraft> {
    let raw = store.get(REGISTRATION_DATA_KEY)?;
    match serde_json::from_str::<RegistrationDraftRaw>(&raw) {
        Ok(parsed) => Some(normalize_draft(parsed)),
        Err(e) => {
            tracing::warn!("ignoring unreadable registration data: {e}");
            None
        }
    }
}

pub fn clear_draft(store: &dyn SessionStore) -> ClientResult<()> {
    store.delete(REGISTRATION_DATA_KEY)
}

/// Builds the OTP verification body from the draft, or from defaults when
/// there is none. `phone` and `country_code` always come from the caller.
pub fn verify_request(
    draft: Option<&RegistrationDraft>,
    phone: &str,
    country_code: &str,
    otp: &str,
    device: Option<String>,
) -> VerifyOtpRequest {
    let fallback;
    let draft = match draft {
        Some(d) => d,
        None => {
            fallback = RegistrationDraft::default();
            &fallback
        }
    };
    VerifyOtpRequest {
        phone: phone.to_string(),
        country_code: country_code.to_string(),
        otp: otp.to_string(),
        name: draft.name.clone(),
        age: draft.age.clone(),
        gender: draft.gender,
        height_in_cm: draft.height_in_cm,
        weight_in_kg: draft.weight_in_kg,
        q1: draft.q1,
        q2: draft.q2,
        q3: draft.q3,
        device,
        fcm_token: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_store::MemorySessionStore;

    fn answers() -> RegistrationAnswers {
        RegistrationAnswers {
            name: " Ravi ".into(),
            age: "31".into(),
            gender: "Male".into(),
            height: HeightInput::FeetInches {
                feet: 5.0,
                inches: 10.0,
            },
            weight_kg: 78.5,
            holding_back: "Time".into(),
            improve: "more_energy".into(),
            challenge: "Phone".into(),
            phone: "9876543210".into(),
        }
    }

    #[test]
    fn height_converts_and_rounds() {
        // 5 * 30.48 + 10 * 2.54 = 177.8
        assert_eq!(HeightInput::FeetInches { feet: 5.0, inches: 10.0 }.to_cm(), 178.0);
        assert_eq!(HeightInput::Centimeters(170.4).to_cm(), 170.0);
    }

    #[test]
    fn answer_codes_fall_back_to_four() {
        assert_eq!(holding_back_code("Motivation"), 1);
        assert_eq!(holding_back_code("Disciplined"), 2);
        assert_eq!(holding_back_code("Time"), 3);
        assert_eq!(holding_back_code("motivation"), 4);
        assert_eq!(improvement_code("better_health"), 1);
        assert_eq!(improvement_code("increased_focus"), 3);
        assert_eq!(improvement_code(""), 4);
        assert_eq!(challenge_code("gain_muscles"), 2);
        assert_eq!(challenge_code("Phone"), 4);
    }

    #[test]
    fn answers_become_draft() {
        let draft = RegistrationDraft::from_answers(&answers()).unwrap();
        assert_eq!(draft.name, "Ravi");
        assert_eq!(draft.gender, Gender::Male);
        assert_eq!(draft.height_in_cm, 178.0);
        assert_eq!((draft.q1, draft.q2, draft.q3), (3, 2, 4));
        assert_eq!(draft.country_code, DEFAULT_COUNTRY_CODE);
    }

    #[test]
    fn invalid_answers_are_rejected() {
        let mut bad = answers();
        bad.age = "abc".into();
        assert!(matches!(
            RegistrationDraft::from_answers(&bad),
            Err(ClientError::Validation(_))
        ));

        let mut bad = answers();
        bad.phone = "123".into();
        assert!(RegistrationDraft::from_answers(&bad).is_err());
    }

    #[test]
    fn draft_survives_store_and_clear() {
        let store = MemorySessionStore::new();
        let draft = RegistrationDraft::from_answers(&answers()).unwrap();
        save_draft(&store, &draft).unwrap();
        assert_eq!(load_draft(&store), Some(draft));
        clear_draft(&store).unwrap();
        assert_eq!(load_draft(&store), None);
    }

    #[test]
    fn partial_draft_uses_defaults_per_field() {
        let store = MemorySessionStore::new();
        store
            .set(
                REGISTRATION_DATA_KEY,
                r#"{"name":"","age":40,"gender":"female","heightInCm":0,"q2":3}"#,
                None,
            )
            .unwrap();
        let draft = load_draft(&store).unwrap();
        assert_eq!(draft.name, "User");
        assert_eq!(draft.age, "40");
        assert_eq!(draft.gender, Gender::Female);
        assert_eq!(draft.height_in_cm, 175.0);
        assert_eq!(draft.weight_in_kg, 70.0);
        assert_eq!((draft.q1, draft.q2, draft.q3), (1, 3, 3));
    }

    #[test]
    fn verify_request_without_draft_uses_defaults() {
        let req = verify_request(None, "9876543210", "+91", "123456", Some("zeefit-cli".into()));
        assert_eq!(req.name, "User");
        assert_eq!(req.age, "25");
        assert_eq!(req.gender, Gender::Male);
        assert_eq!(req.height_in_cm, 175.0);
        assert_eq!(req.weight_in_kg, 70.0);
        assert_eq!((req.q1, req.q2, req.q3), (1, 2, 3));
        assert_eq!(req.device.as_deref(), Some("zeefit-cli"));
    }
}
