//! # Google Sheets Destination
//!
//! Appends records to a worksheet through the Sheets REST API (v4), authorised
//! as a service account.
//!
//! ## Per-append Sequence
//!
//! 1. Read the service-account key file (`client_email`, `private_key`, `token_uri`)
//! 2. Sign an RS256 JWT assertion and trade it for an access token
//! 3. Read row 1 of the worksheet; write the header there if the sheet is empty
//! 4. `values:append` the record as a new last row
//!
//! The key is re-read and a token minted on every append, so a rotated key file
//! takes effect on the next cycle.

use crate::config::SheetConfig;
use crate::Record;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// OAuth scope needed to edit spreadsheets.
const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Lifetime requested for each access token, in seconds.
const TOKEN_LIFETIME: i64 = 3600;

/// Errors raised while appending to a worksheet.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("key file {}: {source}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("key file {} is not a service-account key: {source}", path.display())]
    KeyFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("signing token request: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("sheets API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid API base URL `{0}`")]
    Url(String),
}

/// The fields of a service-account key file this module needs.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> Result<Self, SheetError> {
        let contents = fs::read_to_string(path).map_err(|source| SheetError::KeyFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SheetError::KeyFormat {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Signed JWT bearer assertion for `key`, issued at `issued_at` (Unix seconds).
pub fn assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String, SheetError> {
    let claims = Claims {
        iss: &key.client_email,
        scope: SCOPE,
        aud: &key.token_uri,
        iat: issued_at,
        exp: issued_at + TOKEN_LIFETIME,
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(jsonwebtoken::encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &signing_key,
    )?)
}

/// A record as one row of JSON cells; numbers stay numbers.
pub fn row_values(record: &Record) -> Vec<Value> {
    record
        .values()
        .map(|value| serde_json::to_value(value).unwrap_or(Value::Null))
        .collect()
}

/// Quote a worksheet name for use in an A1 range.
fn quoted(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

async fn checked(response: Response) -> Result<Response, SheetError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SheetError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Appends records to one worksheet.
#[derive(Clone, Debug)]
pub struct SheetRecorder {
    client: reqwest::Client,
    config: SheetConfig,
}

impl SheetRecorder {
    pub fn new(client: reqwest::Client, config: SheetConfig) -> Self {
        SheetRecorder { client, config }
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    /// Append `record` as the worksheet's new last row.
    pub async fn append(&self, record: &Record) -> Result<(), SheetError> {
        let key = ServiceAccountKey::load(&self.config.key_file)?;
        let token = self.access_token(&key).await?;

        let header = self.header_row(&token).await?;
        let columns: Vec<Value> = record.columns().map(Value::from).collect();
        if header.is_empty() {
            self.append_rows(&token, vec![columns]).await?;
            info!(worksheet = %self.config.worksheet, "wrote header row");
        } else if header != columns {
            warn!(
                worksheet = %self.config.worksheet,
                "worksheet header differs from record columns, appending anyway"
            );
        }

        self.append_rows(&token, vec![row_values(record)]).await
    }

    async fn access_token(&self, key: &ServiceAccountKey) -> Result<String, SheetError> {
        let assertion = assertion(key, Utc::now().timestamp())?;
        let response = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = checked(response).await?.json().await?;
        debug!(account = %key.client_email, "obtained access token");
        Ok(token.access_token)
    }

    async fn header_row(&self, token: &str) -> Result<Vec<Value>, SheetError> {
        let range = format!("{}!1:1", quoted(&self.config.worksheet));
        let response = self
            .client
            .get(self.values_url(&range)?)
            .bearer_auth(token)
            .send()
            .await?;
        let range: ValueRange = checked(response).await?.json().await?;
        Ok(range.values.into_iter().next().unwrap_or_default())
    }

    async fn append_rows(&self, token: &str, rows: Vec<Vec<Value>>) -> Result<(), SheetError> {
        let range = format!("{}:append", quoted(&self.config.worksheet));
        let response = self
            .client
            .post(self.values_url(&range)?)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    /// `{api_base}/v4/spreadsheets/{id}/values/{range}`, with the range encoded.
    pub fn values_url(&self, range: &str) -> Result<Url, SheetError> {
        let bad_base = || SheetError::Url(self.config.api_base.clone());
        let mut url = Url::parse(&self.config.api_base).map_err(|_| bad_base())?;
        url.path_segments_mut()
            .map_err(|_| bad_base())?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.config.spreadsheet_id.as_str(),
                "values",
                range,
            ]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldValue;
    use tempfile::NamedTempFile;
    use wiremock::matchers::{
        body_string_contains, header, method, path, path_regex, query_param,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Throwaway 2048-bit key, only ever used against the local mock server.
    const TEST_KEY: &str = include_str!("tests/data/service_account_key.pem");

    fn recorder(api_base: &str) -> SheetRecorder {
        SheetRecorder::new(
            reqwest::Client::new(),
            SheetConfig {
                spreadsheet_id: "1Z9VKcE05zaiLd6r".to_string(),
                worksheet: "Weather Log".to_string(),
                key_file: PathBuf::from("key.json"),
                api_base: api_base.to_string(),
            },
        )
    }

    #[test]
    fn test_values_url_encodes_range() {
        let sheet = recorder("https://sheets.googleapis.com/");
        let url = sheet.values_url("'Weather Log'!1:1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/1Z9VKcE05zaiLd6r/values/'Weather%20Log'!1:1"
        );

        assert!(matches!(
            recorder("not a url").values_url("A1"),
            Err(SheetError::Url(_))
        ));
    }

    #[test]
    fn test_worksheet_names_are_quoted() {
        assert_eq!(quoted("Sheet1"), "'Sheet1'");
        assert_eq!(quoted("Bob's"), "'Bob''s'");
    }

    #[test]
    fn test_row_values_keep_numbers_numeric() {
        let record = Record::new(vec![
            ("Location".to_string(), FieldValue::Text("London".into())),
            ("Humidity(%)".to_string(), FieldValue::Float(71.0)),
            ("Sunset".to_string(), FieldValue::Unavailable),
        ]);
        assert_eq!(
            row_values(&record),
            vec![json!("London"), json!(71.0), json!("N/A")]
        );
    }

    #[test]
    fn test_key_file_errors() {
        let missing = ServiceAccountKey::load(Path::new("/nonexistent/key.json"));
        assert!(matches!(missing, Err(SheetError::KeyFile { .. })));

        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{"type": "authorized_user"}"#).unwrap();
        let wrong = ServiceAccountKey::load(file.path());
        assert!(matches!(wrong, Err(SheetError::KeyFormat { .. })));
    }

    #[test]
    fn test_key_file_defaults_token_uri() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"{"client_email": "logger@project.iam.gserviceaccount.com", "private_key": "x"}"#,
        )
        .unwrap();
        let key = ServiceAccountKey::load(file.path()).unwrap();
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");

        // A key that is not PEM cannot sign
        assert!(matches!(assertion(&key, 0), Err(SheetError::Jwt(_))));
    }

    fn sample_record() -> Record {
        Record::new(vec![
            ("Location".to_string(), FieldValue::Text("London".into())),
            ("Humidity(%)".to_string(), FieldValue::Float(71.0)),
            ("Sunset".to_string(), FieldValue::Unavailable),
        ])
    }

    /// A recorder whose key file and API base both point at `server`.
    fn mock_recorder(server: &MockServer) -> (NamedTempFile, SheetRecorder) {
        let key = NamedTempFile::new().unwrap();
        let contents = json!({
            "client_email": "logger@project.iam.gserviceaccount.com",
            "private_key": TEST_KEY,
            "token_uri": format!("{}/token", server.uri()),
        });
        fs::write(key.path(), contents.to_string()).unwrap();

        let sheet = SheetRecorder::new(
            reqwest::Client::new(),
            SheetConfig {
                spreadsheet_id: "sheet-id".to_string(),
                worksheet: "Weather Log".to_string(),
                key_file: key.path().to_path_buf(),
                api_base: server.uri(),
            },
        );
        (key, sheet)
    }

    fn token_mock() -> Mock {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "test-token",
                "token_type": "Bearer",
                "expires_in": 3600,
            })))
            .expect(1)
    }

    fn header_mock(body: Value) -> Mock {
        Mock::given(method("GET"))
            .and(path_regex(r"^/v4/spreadsheets/sheet-id/values/.*!1:1$"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
    }

    fn append_mock(times: u64) -> Mock {
        Mock::given(method("POST"))
            .and(path_regex(r"^/v4/spreadsheets/sheet-id/values/.*:append$"))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param("valueInputOption", "USER_ENTERED"))
            .and(query_param("insertDataOption", "INSERT_ROWS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(times)
    }

    /// The `values[0]` row of every append request, in arrival order.
    async fn appended_rows(server: &MockServer) -> Vec<Value> {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|request| request.url.path().ends_with(":append"))
            .map(|request| {
                let body: Value = serde_json::from_slice(&request.body).unwrap();
                body["values"][0].clone()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_sheet_gets_header_then_row() {
        let server = MockServer::start().await;
        token_mock().mount(&server).await;
        header_mock(json!({ "range": "'Weather Log'!A1:Z1", "majorDimension": "ROWS" }))
            .mount(&server)
            .await;
        append_mock(2).mount(&server).await;

        let (_key, sheet) = mock_recorder(&server);
        sheet.append(&sample_record()).await.unwrap();

        let rows = appended_rows(&server).await;
        assert_eq!(
            rows,
            vec![
                json!(["Location", "Humidity(%)", "Sunset"]),
                json!(["London", 71.0, "N/A"]),
            ]
        );
        assert!(rows[1][1].is_f64());
    }

    #[tokio::test]
    async fn test_existing_header_is_left_alone() {
        for existing in [
            json!([["Location", "Humidity(%)", "Sunset"]]),
            // Hand-edited header: warned about, never rewritten
            json!([["Time", "Temp"]]),
        ] {
            let server = MockServer::start().await;
            token_mock().mount(&server).await;
            header_mock(json!({ "values": existing })).mount(&server).await;
            append_mock(1).mount(&server).await;

            let (_key, sheet) = mock_recorder(&server);
            sheet.append(&sample_record()).await.unwrap();

            assert_eq!(
                appended_rows(&server).await,
                vec![json!(["London", 71.0, "N/A"])]
            );
        }
    }

    #[tokio::test]
    async fn test_rejected_token_request_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let (_key, sheet) = mock_recorder(&server);
        let err = sheet.append(&sample_record()).await.unwrap_err();

        assert!(matches!(
            err,
            SheetError::Api { status: 401, ref body } if body == "invalid_grant"
        ));
        assert_eq!(appended_rows(&server).await, Vec::<Value>::new());
    }
}
