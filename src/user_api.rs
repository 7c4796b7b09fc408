use crate::api_client::{ApiClient, RequestOptions};
use crate::error::{ClientError, ClientResult};
use crate::models::{ApiEnvelope, DeviceUpdate, HomeData, ProfileUpdate, User};
use crate::validation::{validate_answer_code, validate_name, validate_positive};

pub const CURRENT_USER_PATH: &str = "/users/me";
pub const DEVICE_PATH: &str = "/users/device";
pub const HOME_PATH: &str = "/home";

fn check_profile_update(update: &ProfileUpdate) -> Result<(), String> {
    if update.is_empty() {
        return Err("Profile update has no fields".to_string());
    }
    if let Some(name) = &update.name {
        validate_name(name)?;
    }
    if let Some(age) = update.age {
        if !(1..150).contains(&age) {
            return Err("Age must be between 1 and 149".to_string());
        }
    }
    if let Some(height) = update.height_in_cm {
        validate_positive("Height", height)?;
    }
    if let Some(weight) = update.weight_in_kg {
        validate_positive("Weight", weight)?;
    }
    for (label, code) in [("q1", update.q1), ("q2", update.q2), ("q3", update.q3)] {
        if let Some(code) = code {
            validate_answer_code(label, code)?;
        }
    }
    Ok(())
}

impl ApiClient {
    pub async fn get_current_user(&self) -> ClientResult<ApiEnvelope<User>> {
        self.request(CURRENT_USER_PATH, RequestOptions::get()).await
    }

    /// Sends only the fields set on `update`.
    pub async fn update_user_profile(&self, update: &ProfileUpdate) -> ClientResult<ApiEnvelope<User>> {
        check_profile_update(update).map_err(ClientError::Validation)?;
        self.request(CURRENT_USER_PATH, RequestOptions::put().json(update)?)
            .await
    }

    pub async fn update_device_info(&self, update: &DeviceUpdate) -> ClientResult<ApiEnvelope<User>> {
        if update.device.device_id.trim().is_empty() {
            return Err(ClientError::Validation("Device id is required".to_string()));
        }
        self.request(DEVICE_PATH, RequestOptions::put().json(update)?)
            .await
    }

    pub async fn delete_user(&self) -> ClientResult<ApiEnvelope> {
        self.request(CURRENT_USER_PATH, RequestOptions::delete()).await
    }

    /// Dashboard payload: the user, their challenges and summary stats.
    pub async fn get_home_data(&self) -> ClientResult<ApiEnvelope<HomeData>> {
        self.request(HOME_PATH, RequestOptions::get()).await
    }
}
