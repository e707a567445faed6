//! Keeps the stored OAuth access token usable.
//!
//! The consent flow that produces `token.json` happens outside of this library. Here we only load
//! the client credentials and the token, and exchange the refresh token for a new access token
//! when the stored one has expired.

use crate::api::files::{File, SecretFile, TokenFile};
use crate::Result;
use anyhow::Context;
use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use std::path::Path;
use tracing::{debug, info};

/// Used when Google leaves out the lifetime of a refreshed token.
const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 60;

/// Hands out access tokens, refreshing and persisting them as needed.
#[derive(Debug, Clone)]
pub(crate) struct TokenProvider {
    secret: File<SecretFile>,
    token: File<TokenFile>,
}

impl TokenProvider {
    /// Loads the client credentials and the stored token. Fails when either file is missing or
    /// unreadable, or when the token lacks a required scope.
    pub(crate) async fn load(secret_path: &Path, token_path: &Path) -> Result<Self> {
        let secret = File::<SecretFile>::load(secret_path)
            .await
            .with_context(|| {
                format!(
                    "Unable to load the OAuth client secret from {}",
                    secret_path.display()
                )
            })?;
        let token = File::<TokenFile>::load(token_path).await.with_context(|| {
            format!(
                "Unable to load the OAuth token from {}. Authorize access to the sheet first",
                token_path.display()
            )
        })?;
        token.data().validate_scopes()?;
        debug!("Token loaded, expires at {}", token.data().expires_at());
        Ok(Self { secret, token })
    }

    /// The current access token, which may have expired.
    pub(crate) fn token(&self) -> &str {
        self.token.data().access_token()
    }

    /// The current access token, refreshed first if it has expired or is about to.
    pub(crate) async fn token_with_refresh(&mut self) -> Result<&str> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token())
    }

    /// Exchanges the refresh token for a new access token and saves it to `token.json`.
    pub(crate) async fn refresh(&mut self) -> Result<()> {
        info!("Refreshing the OAuth access token");
        let secret = self.secret.data();
        let client = BasicClient::new(ClientId::new(secret.client_id().to_string()))
            .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
            .set_auth_uri(
                AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth URI")?,
            )
            .set_token_uri(
                TokenUrl::new(secret.token_uri().to_string()).context("Invalid token URI")?,
            );

        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Unable to create the HTTP client")?;

        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        let response = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&http_client)
            .await
            .context("Unable to refresh the OAuth access token")?;

        let lifetime = response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .unwrap_or_else(|| chrono::Duration::minutes(DEFAULT_TOKEN_LIFETIME_MINUTES));
        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            Utc::now() + lifetime,
            response.refresh_token().map(|rt| rt.secret().to_string()),
        );
        self.token.save().await?;
        debug!(
            "Saved the refreshed token to {}",
            self.token.path().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils;
    use chrono::DateTime;
    use tempfile::TempDir;

    const SECRET: &str = r#"{
        "installed": {
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "secret",
            "redirect_uris": ["http://localhost"],
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token"
        }
    }"#;

    #[tokio::test]
    async fn test_load_and_valid_token() {
        let tmp = TempDir::new().unwrap();
        let secret_path = tmp.path().join("client_secret.json");
        let token_path = tmp.path().join("token.json");
        utils::write(&secret_path, SECRET).await.unwrap();
        let expires_at: DateTime<Utc> = Utc::now() + chrono::Duration::hours(1);
        File::new(&token_path, TokenFile::new("access", "refresh", expires_at))
            .save()
            .await
            .unwrap();

        let mut provider = TokenProvider::load(&secret_path, &token_path)
            .await
            .unwrap();
        // Not expired, so no network call is made.
        assert_eq!(provider.token_with_refresh().await.unwrap(), "access");
    }

    #[tokio::test]
    async fn test_load_without_token_fails() {
        let tmp = TempDir::new().unwrap();
        let secret_path = tmp.path().join("client_secret.json");
        utils::write(&secret_path, SECRET).await.unwrap();
        let result = TokenProvider::load(&secret_path, &tmp.path().join("token.json")).await;
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Unable to load the OAuth token"));
    }

    #[tokio::test]
    async fn test_load_without_secret_fails() {
        let tmp = TempDir::new().unwrap();
        let result = TokenProvider::load(
            &tmp.path().join("client_secret.json"),
            &tmp.path().join("token.json"),
        )
        .await;
        assert!(result.is_err());
    }
}
