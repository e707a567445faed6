//! Implements the `Sheet` trait using the `sheets::Client` to interact with a Google sheet.

use crate::api::{Sheet, TokenProvider};
use crate::error::SyncError;
use sheets::types::{
    DateTimeRenderOption, Dimension, InsertDataOption, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use tracing::trace;

/// Implements the `Sheet` trait using the `sheets::Client` to interact with a Google sheet. A new
/// client is created for every call from the `TokenProvider`, which refreshes the access token
/// when it has expired.
pub(super) struct GoogleSheet {
    spreadsheet_id: String,
    token_provider: TokenProvider,
}

impl GoogleSheet {
    pub(super) fn new(spreadsheet_id: impl Into<String>, token_provider: TokenProvider) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            token_provider,
        }
    }

    async fn client(&mut self) -> Result<sheets::Client, SyncError> {
        create_sheets_client(&mut self.token_provider).await
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn get(&mut self, range: &str) -> Result<Vec<Vec<String>>, SyncError> {
        trace!("get {range}");
        let client = self.client().await?;
        let response = client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(|e| map_client_error(e, range))?;
        Ok(response.body.values)
    }

    async fn append(&mut self, range: &str, rows: &[Vec<String>]) -> Result<(), SyncError> {
        trace!("append {} rows to {range}", rows.len());
        let client = self.client().await?;
        let body = ValueRange {
            major_dimension: Some(Dimension::Rows),
            range: range.to_string(),
            values: rows.to_vec(),
        };
        client
            .spreadsheets()
            .values_append(
                &self.spreadsheet_id,
                range,
                false,
                InsertDataOption::InsertRows,
                DateTimeRenderOption::FormattedString,
                ValueRenderOption::FormattedValue,
                ValueInputOption::Raw,
                &body,
            )
            .await
            .map_err(|e| map_client_error(e, range))?;
        Ok(())
    }
}

/// Creates a new sheets client with a refreshed access token.
async fn create_sheets_client(
    token_provider: &mut TokenProvider,
) -> Result<sheets::Client, SyncError> {
    let access_token = token_provider
        .token_with_refresh()
        .await
        .map_err(|e| SyncError::unauthorized(&e))?;

    // The client ID, secret and redirect are only used by the crate's own refresh flow, which we
    // do not use.
    Ok(sheets::Client::new(
        String::new(),
        String::new(),
        String::new(),
        access_token.to_string(),
        String::new(),
    ))
}

/// Sorts a failed API call into the kinds of failure the caller can act on.
fn map_client_error(e: ClientError, range: &str) -> SyncError {
    let message = format!("{range}: {e}");
    match &e {
        ClientError::HttpError { status, .. } => status_error(status.as_u16(), message),
        ClientError::EmptyRefreshToken => SyncError::Unauthorized(message),
        ClientError::SerdeJsonError(_) | ClientError::FromUtf8Error(_) => {
            SyncError::Malformed(message)
        }
        _ => SyncError::Unreachable(message),
    }
}

/// Classifies an HTTP status returned by the Sheets API.
fn status_error(status: u16, message: String) -> SyncError {
    match status {
        401 | 403 => SyncError::Unauthorized(message),
        400 | 404 => SyncError::Malformed(message),
        _ => SyncError::Unreachable(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error() {
        for status in [401, 403] {
            assert!(matches!(
                status_error(status, "x".to_string()),
                SyncError::Unauthorized(_)
            ));
        }
        for status in [400, 404] {
            assert!(matches!(
                status_error(status, "x".to_string()),
                SyncError::Malformed(_)
            ));
        }
        for status in [429, 500, 503] {
            assert!(matches!(
                status_error(status, "x".to_string()),
                SyncError::Unreachable(_)
            ));
        }
        assert_eq!(
            status_error(404, "Finanzas!A2:I: not found".to_string()),
            SyncError::Malformed("Finanzas!A2:I: not found".to_string())
        );
    }

    #[test]
    fn test_map_client_error_empty_refresh_token() {
        let error = map_client_error(ClientError::EmptyRefreshToken, "Finanzas!A2:I");
        match error {
            SyncError::Unauthorized(message) => assert!(message.starts_with("Finanzas!A2:I: ")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_map_client_error_bad_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = map_client_error(ClientError::SerdeJsonError(json_error), "Finanzas!A2:I");
        match error {
            SyncError::Malformed(message) => assert!(message.starts_with("Finanzas!A2:I: ")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
