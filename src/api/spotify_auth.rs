use crate::config::Config;
use crate::error::{ReorderError, Result};
use base64::{engine::general_purpose, Engine as _};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::info;
use url::Url;

/// Authorization-code helpers for a terminal session:
/// 1. Build the authorize URL (with a random `state`) and print it.
/// 2. The user approves and gets redirected to the redirect URI.
/// 3. The user pastes the full redirect URL back; the `code` is extracted
///    after checking `state`.
/// 4. The code is exchanged for an access token + refresh token.
///
/// Nothing is persisted; the tokens are handed back to the caller.
pub const SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "playlist-read-private",
    "playlist-modify-public",
    "playlist-modify-private",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".into()
}

fn auth_base() -> String {
    env::var("SPOTIFY_AUTH_BASE").unwrap_or_else(|_| "https://accounts.spotify.com".into())
}

/// Random alphanumeric string used as the OAuth `state` value.
pub fn generate_state(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn authorize_url(cfg: &Config, state: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/authorize", auth_base()))
        .map_err(|e| ReorderError::Config(format!("invalid auth base: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &cfg.client_id)
        .append_pair("scope", &SCOPES.join(" "))
        .append_pair("redirect_uri", &cfg.redirect_uri)
        .append_pair("state", state);
    Ok(url)
}

/// Pull the authorization code out of a pasted redirect URL.
pub fn code_from_redirect(redirect: &str, expected_state: &str) -> Result<String> {
    let parsed = Url::parse(redirect.trim())
        .map_err(|e| ReorderError::Auth(format!("invalid redirect url: {}", e)))?;
    let param = |name: &str| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };
    if let Some(err) = param("error") {
        return Err(ReorderError::Auth(err));
    }
    match param("state") {
        Some(s) if s == expected_state => {}
        _ => return Err(ReorderError::Auth("state_mismatch".into())),
    }
    param("code").ok_or_else(|| ReorderError::Auth("no code in redirect URL".into()))
}

async fn token_request(cfg: &Config, params: &[(&str, &str)]) -> Result<TokenResponse> {
    if !cfg.has_client_credentials() {
        return Err(ReorderError::Config("client_id and client_secret are required".into()));
    }
    let auth_header = format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", cfg.client_id, cfg.client_secret))
    );
    let url = format!("{}/api/token", auth_base());
    let resp = Client::new()
        .post(&url)
        .header("Authorization", auth_header)
        .form(params)
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(ReorderError::Auth(super::spotify::error_message(status, &txt)));
    }
    Ok(resp.json().await?)
}

pub async fn exchange_code(cfg: &Config, code: &str) -> Result<TokenResponse> {
    let tr = token_request(
        cfg,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", cfg.redirect_uri.as_str()),
        ],
    )
    .await?;
    info!("Exchanged authorization code for tokens (scope {:?})", tr.scope);
    Ok(tr)
}

pub async fn refresh_access_token(cfg: &Config, refresh_token: &str) -> Result<TokenResponse> {
    let tr = token_request(
        cfg,
        &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
    )
    .await?;
    info!("Refreshed access token, expires in {}s", tr.expires_in);
    Ok(tr)
}

/// Interactive flow used by the `auth` command.
pub async fn run_spotify_auth(cfg: &Config) -> Result<TokenResponse> {
    use std::io;

    let state = generate_state(16);
    let url = authorize_url(cfg, &state)?;
    println!(
        "Open this URL in your browser and authorize the application:\n\n{}\n",
        url
    );
    println!("After authorizing, you'll be redirected to {}. Copy the full redirect URL and paste it here.", cfg.redirect_uri);
    println!("Paste redirect URL:");
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| ReorderError::Auth(format!("reading stdin: {}", e)))?;
    let code = code_from_redirect(&input, &state)?;
    exchange_code(cfg, &code).await
}
