//! Client for the ZeeFit fitness backend.
//!
//! [`ApiClient`] issues JSON requests against the REST API, attaches the
//! stored bearer token and recovers once from an expired token by refreshing
//! it. Session state lives behind the [`SessionStore`] trait so the same
//! client works with an in-memory store, a session file or anything else.

pub mod api_client;
pub mod auth_api;
pub mod challenge_api;
pub mod config;
pub mod error;
pub mod file_store;
pub mod models;
pub mod registration;
pub mod session_store;
pub mod token_refresh;
pub mod user_api;
pub mod validation;

pub use api_client::{ApiClient, ApiClientBuilder, RequestOptions};
pub use config::{ClientConfig, Environment};
pub use error::{ClientError, ClientResult, ErrorCategory, AUTH_FAILED_MESSAGE};
pub use file_store::FileSessionStore;
pub use models::*;
pub use registration::{
    clear_draft, load_draft, save_draft, verify_request, HeightInput, RegistrationAnswers,
    RegistrationDraft, DEFAULT_COUNTRY_CODE,
};
pub use session_store::{
    cached_user, clear_all_auth_data, clear_session, is_authenticated, persist_session,
    persist_tokens, MemorySessionStore, SessionStore, SharedSessionStore,
};
