use crate::api_client::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::session_store::{
    clear_session, persist_tokens, read_token, SessionStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
};
use zeroize::Zeroize;

/// Exchanges the stored refresh token for a new pair and persists it.
///
/// Any failure (no refresh token, transport error, rejected refresh, bad
/// payload) clears the session and maps to
/// [`ClientError::AuthenticationFailed`].
pub async fn do_refresh(client: &ApiClient) -> ClientResult<()> {
    let store = client.session_store().as_ref();
    let Some(mut refresh_tok) = read_token(store, REFRESH_TOKEN_KEY) else {
        tracing::warn!("no refresh token stored, clearing session");
        discard_session(store);
        return Err(ClientError::AuthenticationFailed);
    };

    let result = client.refresh_token(&refresh_tok).await;
    refresh_tok.zeroize();

    let mut tokens = match result {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!(category = ?e.category(), "token refresh failed, clearing session: {e}");
            discard_session(store);
            return Err(ClientError::AuthenticationFailed);
        }
    };

    let persisted = persist_tokens(store, &tokens);
    tokens.access_token.zeroize();
    tokens.refresh_token.zeroize();
    persisted?;

    tracing::info!("session tokens refreshed");
    Ok(())
}

/// Refreshes after an HTTP 401 and returns the access token now in the store.
pub(crate) async fn refresh_after_unauthorized(client: &ApiClient) -> ClientResult<String> {
    do_refresh(client).await?;
    read_token(client.session_store().as_ref(), ACCESS_TOKEN_KEY).ok_or_else(|| {
        ClientError::Store("Access token not found after refresh".to_string())
    })
}

fn discard_session(store: &dyn SessionStore) {
    if let Err(e) = clear_session(store) {
        tracing::warn!("failed to clear session: {e}");
    }
}
