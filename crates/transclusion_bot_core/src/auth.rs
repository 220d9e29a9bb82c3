use anyhow::anyhow;
use serde::Deserialize;
use tracing::info;

use crate::api::{WikiSession, decode};
use crate::client::MediaWikiClient;
use crate::config::Credentials;
use crate::error::{BotError, BotResult};

pub const BOT_GROUP: &str = "bot";

/// Log the client's cookie session in with a bot password or account password.
pub fn login(client: &MediaWikiClient, credentials: &Credentials) -> BotResult<()> {
    let token_response = client
        .request_json_get(&[
            ("action", "query".to_string()),
            ("meta", "tokens".to_string()),
            ("type", "login".to_string()),
        ])
        .map_err(|error| BotError::authentication(&error))?;
    let login_token = decode::<TokenQueryResponse>(token_response)
        .into_result()
        .and_then(|payload| {
            payload
                .query
                .tokens
                .and_then(|tokens| tokens.logintoken)
                .ok_or_else(|| anyhow!("failed to get MediaWiki login token"))
        })
        .map_err(|error| BotError::authentication(&error))?;

    let login_response = client
        .request_json_post(&[
            ("action", "login".to_string()),
            ("lgname", credentials.username.clone()),
            ("lgpassword", credentials.password.clone()),
            ("lgtoken", login_token),
        ])
        .map_err(|error| BotError::authentication(&error))?;

    let payload = decode::<LoginResponse>(login_response)
        .into_result()
        .map_err(|error| BotError::authentication(&error))?;
    match payload.login.result.as_deref() {
        Some("Success") => {
            info!("logged in as {}", credentials.username);
            Ok(())
        }
        other => Err(BotError::Authentication(format!(
            "MediaWiki login failed: {}",
            payload
                .login
                .reason
                .clone()
                .or_else(|| other.map(ToString::to_string))
                .unwrap_or_else(|| "unknown error".to_string())
        ))),
    }
}

/// Whether the session's account is a member of the `bot` group.
pub fn has_bot_rights<S: WikiSession>(session: &S) -> BotResult<bool> {
    let response = session
        .query(&[
            ("meta", "userinfo".to_string()),
            ("uiprop", "groups".to_string()),
        ])
        .map_err(|error| BotError::authentication(&error))?;
    let payload = decode::<UserInfoResponse>(response)
        .into_result()
        .map_err(|error| BotError::authentication(&error))?;
    Ok(payload
        .query
        .userinfo
        .groups
        .iter()
        .any(|group| group == BOT_GROUP))
}

/// Fails with [`BotError::Authentication`] unless the account holds bot rights.
pub fn require_bot_rights<S: WikiSession>(session: &S) -> BotResult<()> {
    if has_bot_rights(session)? {
        info!("account has bot rights");
        Ok(())
    } else {
        Err(BotError::Authentication(
            "account does not have bot rights".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize, Default)]
struct TokenQueryResponse {
    #[serde(default)]
    query: TokenQueryPayload,
}

#[derive(Debug, Deserialize, Default)]
struct TokenQueryPayload {
    tokens: Option<TokenPayload>,
}

#[derive(Debug, Deserialize, Default)]
struct TokenPayload {
    logintoken: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LoginResponse {
    #[serde(default)]
    login: LoginPayload,
}

#[derive(Debug, Deserialize, Default)]
struct LoginPayload {
    result: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    query: UserInfoQuery,
}

#[derive(Debug, Deserialize)]
struct UserInfoQuery {
    userinfo: UserInfoPayload,
}

#[derive(Debug, Deserialize)]
struct UserInfoPayload {
    #[serde(default)]
    groups: Vec<String>,
}
