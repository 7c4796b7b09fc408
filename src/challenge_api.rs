use crate::api_client::{build_query, encode_component, ApiClient, RequestOptions};
use crate::error::{ClientError, ClientResult};
use crate::models::{
    ApiEnvelope, Challenge, ChallengePage, ChallengeParticipant, ChallengeProgress,
    ChallengeQuery, JoinFailure, JoinSummary, JoinedChallenge, ProgressUpdate,
};
use crate::validation::validate_path_segment;
use futures::future::join_all;
use serde_json::Value;

const CHALLENGES_PATH: &str = "/challenges";
pub const JOIN_SUMMARY_MESSAGE: &str = "Challenges joined successfully";

impl ChallengeQuery {
    /// Query string for the listing endpoints, `status`, `page`, `limit` in
    /// that order. Empty status and zero page/limit are left out.
    pub fn to_query_string(&self) -> String {
        let mut pairs = Vec::new();
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("status", status.to_string()));
        }
        if let Some(page) = self.page.filter(|p| *p > 0) {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            pairs.push(("limit", limit.to_string()));
        }
        build_query(&pairs)
    }
}

fn segment(label: &str, value: &str) -> ClientResult<String> {
    validate_path_segment(label, value).map_err(ClientError::Validation)?;
    Ok(encode_component(value))
}

impl ApiClient {
    pub async fn get_all_challenges(
        &self,
        query: &ChallengeQuery,
    ) -> ClientResult<ApiEnvelope<ChallengePage<Challenge>>> {
        let endpoint = format!("{CHALLENGES_PATH}/get-all{}", query.to_query_string());
        self.request(&endpoint, RequestOptions::get()).await
    }

    /// Challenges the current user has joined. Entries are returned as the
    /// backend shapes them.
    pub async fn get_my_challenges(
        &self,
        query: &ChallengeQuery,
    ) -> ClientResult<ApiEnvelope<ChallengePage<Value>>> {
        let endpoint = format!("{CHALLENGES_PATH}/my-challenges{}", query.to_query_string());
        self.request(&endpoint, RequestOptions::get()).await
    }

    pub async fn get_challenge_by_id(&self, id: &str) -> ClientResult<ApiEnvelope<Challenge>> {
        let endpoint = format!("{CHALLENGES_PATH}/{}", segment("Challenge id", id)?);
        self.request(&endpoint, RequestOptions::get()).await
    }

    pub async fn get_challenge_by_slug(&self, slug: &str) -> ClientResult<ApiEnvelope<Challenge>> {
        let endpoint = format!("{CHALLENGES_PATH}/slug/{}", segment("Challenge slug", slug)?);
        self.request(&endpoint, RequestOptions::get()).await
    }

    pub async fn join_challenge(&self, id: &str) -> ClientResult<ApiEnvelope<JoinedChallenge>> {
        let endpoint = format!("{CHALLENGES_PATH}/{}/join", segment("Challenge id", id)?);
        self.request(&endpoint, RequestOptions::post()).await
    }

    /// Joins every challenge concurrently. A failed join is recorded in the
    /// summary; the batch itself never fails.
    ///
    /// Refreshes are not shared between in-flight requests, so a batch first
    /// makes one authenticated call to settle an expired token before fanning
    /// out.
    pub async fn join_multiple_challenges(&self, ids: &[String]) -> ApiEnvelope<JoinSummary> {
        if ids.len() > 1 {
            if let Err(e) = self.get_current_user().await {
                tracing::debug!("session check before joining failed: {e}");
            }
        }
        let results = join_all(ids.iter().map(|id| self.join_challenge(id))).await;

        let mut successful = Vec::new();
        let mut failed = Vec::new();
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(envelope) => successful.push(envelope),
                Err(e) => {
                    tracing::warn!(challenge_id = %id, "joining challenge failed: {e}");
                    failed.push(JoinFailure {
                        challenge_id: id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let summary = JoinSummary {
            total_requested: ids.len(),
            total_successful: successful.len(),
            total_failed: failed.len(),
            successful,
            failed,
        };
        ApiEnvelope {
            message: JOIN_SUMMARY_MESSAGE.to_string(),
            status_code: 200,
            data: Some(summary),
        }
    }

    pub async fn get_challenge_progress(
        &self,
        id: &str,
    ) -> ClientResult<ApiEnvelope<ChallengeProgress>> {
        let endpoint = format!("{CHALLENGES_PATH}/{}/progress", segment("Challenge id", id)?);
        self.request(&endpoint, RequestOptions::get()).await
    }

    pub async fn update_challenge_progress(
        &self,
        id: &str,
        update: &ProgressUpdate,
    ) -> ClientResult<ApiEnvelope<ChallengeParticipant>> {
        let endpoint = format!(
            "{CHALLENGES_PATH}/{}/update-progress",
            segment("Challenge id", id)?
        );
        self.request(&endpoint, RequestOptions::put().json(update)?)
            .await
    }
}
