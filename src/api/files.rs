//! Serialization and deserialization structures for the Google OAuth credential files.
//! - `client_secret.json`: OAuth 2.0 client credentials from Google Cloud Console
//! - `token.json`: the access and refresh tokens we received for those credentials

use crate::api::OAUTH_SCOPES;
use crate::{utils, Result};
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// This redirect needs to be present in the OAuth credential file, or else OAuth will not work.
const REDIRECT: &str = "http://localhost";

/// A token this close to its expiry is treated as expired.
const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// Holds the contents of a JSON file together with the path it was read from, so that changes can
/// be written back.
#[derive(Default, Debug, Clone)]
pub(super) struct File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    path: PathBuf,
    data: F,
}

impl<F> File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    pub(super) async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data: F = utils::deserialize(&path).await?;
        Ok(Self { path, data })
    }

    #[cfg(test)]
    pub(super) fn new(path: impl Into<PathBuf>, data: F) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Writes the data back to `path`, readable only by the owner on Unix.
    pub(super) async fn save(&self) -> Result<()> {
        let json =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize data to JSON")?;
        utils::write(&self.path, json).await?;

        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, Permissions::from_mode(0o600))
                .context("Failed to set file permissions")?;
        }

        Ok(())
    }

    pub(super) fn data(&self) -> &F {
        &self.data
    }

    pub(super) fn data_mut(&mut self) -> &mut F {
        &mut self.data
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }
}

/// Represents the structure of the `client_secret.json` file downloaded from Google Cloud Console.
///
/// This file contains OAuth 2.0 Desktop Application credentials. The standard format from Google
/// has an "installed" wrapper around the actual credentials.
///
/// Example:
/// ```json
/// {
///   "installed": {
///     "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
///     "client_secret": "YOUR_CLIENT_SECRET",
///     "redirect_uris": ["http://localhost"],
///     "auth_uri": "https://accounts.google.com/o/oauth2/auth",
///     "token_uri": "https://oauth2.googleapis.com/token"
///   }
/// }
/// ```
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) struct SecretFile {
    installed: InstalledCredentials,
}

impl SecretFile {
    pub(super) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(super) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(super) fn auth_uri(&self) -> &str {
        &self.installed.auth_uri
    }

    pub(super) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }
}

/// The OAuth credentials nested within the `client_secret.json` file.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,

    /// Should contain "http://localhost" (without a port number).
    redirect_uris: RedirectUris,

    /// Google's OAuth authorization endpoint
    auth_uri: String,

    /// Google's OAuth token endpoint
    token_uri: String,
}

#[derive(Default, Debug, Clone)]
struct RedirectUris(Vec<String>);

impl Serialize for RedirectUris {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RedirectUris {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let vec = Vec::<String>::deserialize(deserializer)?;
        if !vec.iter().any(|s| is_valid_redirect(s)) {
            return Err(D::Error::custom(format!(
                "At least one of the redirects needs to be {REDIRECT}, but this was not found. \
                When creating the OAuth client for the finance sheet, you must include \
                '{REDIRECT}'"
            )));
        }
        Ok(RedirectUris(vec))
    }
}

fn is_valid_redirect(s: &str) -> bool {
    s == REDIRECT || s == "http://127.0.0.1"
}

/// The token information we keep from Google OAuth, in our own shape rather than Google's.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) struct TokenFile {
    scopes: Vec<String>,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    id_token: Option<String>,
}

impl TokenFile {
    #[cfg(test)]
    pub(super) fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scopes: OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            id_token: None,
        }
    }

    /// Fails when the token was not granted every scope we need.
    pub(super) fn validate_scopes(&self) -> Result<()> {
        let found_scopes: HashSet<&str> = self.scopes.iter().map(|s| s.as_str()).collect();
        for &required_scope in OAUTH_SCOPES {
            if !found_scopes.contains(required_scope) {
                bail!("OAuth scope '{required_scope}' is missing.");
            }
        }
        Ok(())
    }

    pub(super) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(super) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub(super) fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the token is expired or will expire within a few minutes.
    pub(super) fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + chrono::Duration::minutes(EXPIRY_BUFFER_MINUTES)
    }

    /// Replaces the access token. Google does not always send a new refresh token, the old one is
    /// kept when `refresh_token` is `None`.
    pub(super) fn update(
        &mut self,
        access_token: String,
        expires_at: DateTime<Utc>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token;
        self.expires_at = expires_at;
        if let Some(rt) = refresh_token {
            self.refresh_token = rt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_json(dir: &TempDir, json: &str) -> PathBuf {
        let p = dir.path().join("file.json");
        utils::write(&p, json).await.unwrap();
        p
    }

    fn secret_json(redirects: &str) -> String {
        format!(
            r#"
{{
    "installed": {{
        "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
        "client_secret": "YOUR_CLIENT_SECRET",
        "redirect_uris": {redirects},
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token"
    }}
}}
"#
        )
    }

    #[tokio::test]
    async fn test_client_secret_good_redirect() {
        let tmp = TempDir::new().unwrap();
        let p = write_json(
            &tmp,
            &secret_json(r#"["http://localhost", "https://example.com:4040/whatever"]"#),
        )
        .await;
        let secret = File::<SecretFile>::load(&p).await.unwrap();
        assert_eq!(
            secret.data().client_id(),
            "YOUR_CLIENT_ID.apps.googleusercontent.com"
        );
        assert_eq!(
            secret.data().token_uri(),
            "https://oauth2.googleapis.com/token"
        );
    }

    #[tokio::test]
    async fn test_client_secret_loopback_redirect() {
        let tmp = TempDir::new().unwrap();
        let p = write_json(&tmp, &secret_json(r#"["http://127.0.0.1"]"#)).await;
        assert!(File::<SecretFile>::load(&p).await.is_ok());
    }

    #[tokio::test]
    async fn test_client_secret_bad_redirect() {
        let tmp = TempDir::new().unwrap();
        let p = write_json(&tmp, &secret_json(r#"["http://localhost:9900"]"#)).await;
        let parse_error = File::<SecretFile>::load(&p).await.unwrap_err();
        let message = format!("{parse_error:#}");
        assert!(message.contains("At least one of the redirects needs to be http://localhost"));
    }

    #[tokio::test]
    async fn test_token_file_missing_scope() {
        let tmp = TempDir::new().unwrap();
        let p = write_json(
            &tmp,
            r#"
            {
                "scopes": ["https://www.googleapis.com/auth/drive.readonly"],
                "access_token": "abc12",
                "refresh_token": "xyz89",
                "expires_at": "2025-01-01T00:00:00Z",
                "id_token": null
            }
        "#,
        )
        .await;
        let token = File::<TokenFile>::load(&p).await.unwrap();
        let message = token.data().validate_scopes().unwrap_err().to_string();
        assert!(message.contains("https://www.googleapis.com/auth/spreadsheets"));
    }

    #[tokio::test]
    async fn test_token_file_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("token.json");
        let expires_at = "2025-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let mut file = File::new(&p, TokenFile::new("abc12", "xyz89", expires_at));
        file.data_mut()
            .update("def34".to_string(), expires_at, None);
        file.save().await.unwrap();

        let reloaded = File::<TokenFile>::load(&p).await.unwrap();
        reloaded.data().validate_scopes().unwrap();
        assert_eq!(reloaded.data().access_token(), "def34");
        assert_eq!(reloaded.data().refresh_token(), "xyz89");
        assert_eq!(reloaded.path(), p.as_path());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&p).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_is_expired_uses_a_buffer() {
        let now = "2025-06-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let soon = TokenFile::new("a", "r", now + chrono::Duration::minutes(4));
        let later = TokenFile::new("a", "r", now + chrono::Duration::minutes(30));
        assert!(soon.is_expired_at(now));
        assert!(!later.is_expired_at(now));
    }
}
