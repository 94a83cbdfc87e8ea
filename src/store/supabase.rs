//! Supabase (PostgREST) backend.
//!
//! Signs in with email/password and keeps the session behind a mutex. The
//! access token is refreshed shortly before it expires, and an insert answered
//! with 401 signs in again and is retried once. Inserts go to
//! `/rest/v1/<table>`.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{StoreError, UsageStore, APPLIANCES_USE_TABLE, TIME_UPDATES_TABLE};
use crate::models::{ApplianceUsage, ProcessingEvent};

/// Refresh this long before the access token expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Connection and credentials for a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    pub url: String,
    pub api_key: String,
    pub email: String,
    pub password: String,
    pub timeout_secs: u64,
}

/// Supabase HTTP client holding an authenticated session.
pub struct SupabaseStore {
    base_url: String,
    settings: SupabaseSettings,
    client: reqwest::blocking::Client,
    session: Mutex<Session>,
}

struct Session {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<Instant>,
}

impl Session {
    fn needs_refresh(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now + REFRESH_MARGIN >= at)
    }
}

/// Request body for /auth/v1/token?grant_type=password
#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

/// Request body for /auth/v1/token?grant_type=refresh_token
#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Response body from /auth/v1/token
#[derive(Deserialize)]
struct SessionResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Seconds until `access_token` expires.
    #[serde(default)]
    expires_in: Option<u64>,
}

impl From<SessionResponse> for Session {
    fn from(response: SessionResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: response
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        }
    }
}

/// Row for the `appliances_use` table.
#[derive(Debug, Serialize)]
struct ApplianceUseRow<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    running_for: Option<&'a str>,
    appliance_external_id: &'a str,
    file_name: &'a str,
    date_collected: String,
}

impl<'a> From<&'a ApplianceUsage> for ApplianceUseRow<'a> {
    fn from(usage: &'a ApplianceUsage) -> Self {
        Self {
            kind: usage.appliance_type.as_str(),
            running_for: usage.running_for.as_deref(),
            appliance_external_id: &usage.external_id,
            file_name: &usage.file_name,
            date_collected: usage.date_collected(),
        }
    }
}

/// Row for the `time_updates` table.
#[derive(Debug, Serialize)]
struct TimeUpdateRow<'a> {
    file_name: &'a str,
    update_time: String,
}

impl<'a> From<&'a ProcessingEvent> for TimeUpdateRow<'a> {
    fn from(event: &'a ProcessingEvent) -> Self {
        Self {
            file_name: &event.file_name,
            update_time: event.update_time(),
        }
    }
}

impl SupabaseStore {
    /// Build the HTTP client and sign in with the configured password.
    pub fn sign_in(settings: &SupabaseSettings) -> Result<Self, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| StoreError::HttpClient(e.to_string()))?;

        let mut store = Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            settings: settings.clone(),
            client,
            session: Mutex::new(Session {
                access_token: String::new(),
                refresh_token: None,
                expires_at: None,
            }),
        };

        store.session = Mutex::new(store.password_grant()?);

        tracing::info!(url = %store.base_url, user = %settings.email, "Signed in to Supabase");
        Ok(store)
    }

    fn token_url(&self, grant_type: &str) -> String {
        format!("{}/auth/v1/token?grant_type={grant_type}", self.base_url)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn request_session<T: Serialize>(&self, grant_type: &str, body: &T) -> Result<Session, StoreError> {
        let response = self
            .client
            .post(self.token_url(grant_type))
            .header("apikey", &self.settings.api_key)
            .json(body)
            .send()
            .map_err(|e| map_send_error(e, &self.base_url, self.settings.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::SignIn(format!("status {}: {body}", status.as_u16())));
        }

        let session: SessionResponse = response
            .json()
            .map_err(|e| StoreError::ResponseParsing(e.to_string()))?;
        Ok(session.into())
    }

    fn password_grant(&self) -> Result<Session, StoreError> {
        self.request_session(
            "password",
            &PasswordGrant {
                email: &self.settings.email,
                password: &self.settings.password,
            },
        )
    }

    /// Exchange the refresh token, falling back to the password grant when
    /// there is none or the server refuses it.
    fn renew(&self, session: &Session) -> Result<Session, StoreError> {
        if let Some(refresh_token) = session.refresh_token.as_deref() {
            match self.request_session("refresh_token", &RefreshGrant { refresh_token }) {
                Ok(renewed) => return Ok(renewed),
                Err(e) => {
                    tracing::warn!(error = %e, "Supabase token refresh failed, signing in again");
                }
            }
        }
        self.password_grant()
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, Session>, StoreError> {
        self.session
            .lock()
            .map_err(|_| StoreError::HttpClient("Supabase session lock poisoned".into()))
    }

    /// Current access token, renewed first when it is about to expire.
    fn access_token(&self) -> Result<String, StoreError> {
        let mut session = self.lock_session()?;
        if session.needs_refresh(Instant::now()) {
            *session = self.renew(&session)?;
            tracing::debug!("Supabase session refreshed");
        }
        Ok(session.access_token.clone())
    }

    fn reauthenticate(&self) -> Result<String, StoreError> {
        let mut session = self.lock_session()?;
        *session = self.password_grant()?;
        Ok(session.access_token.clone())
    }

    fn post_row<T: Serialize>(
        &self,
        table: &str,
        row: &T,
        token: &str,
    ) -> Result<reqwest::blocking::Response, StoreError> {
        self.client
            .post(self.table_url(table))
            .header("apikey", &self.settings.api_key)
            .bearer_auth(token)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .map_err(|e| map_send_error(e, &self.base_url, self.settings.timeout_secs))
    }

    fn insert<T: Serialize>(&self, table: &str, row: &T) -> Result<(), StoreError> {
        let mut response = self.post_row(table, row, &self.access_token()?)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(table, "Supabase rejected the access token, signing in again");
            response = self.post_row(table, row, &self.reauthenticate()?)?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

fn map_send_error(e: reqwest::Error, base_url: &str, timeout_secs: u64) -> StoreError {
    if e.is_connect() {
        StoreError::Connection(base_url.to_string())
    } else if e.is_timeout() {
        StoreError::HttpClient(format!("Request timed out after {timeout_secs}s"))
    } else {
        StoreError::HttpClient(e.to_string())
    }
}

impl UsageStore for SupabaseStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    fn insert_appliance_use(&self, usage: &ApplianceUsage) -> Result<(), StoreError> {
        self.insert(APPLIANCES_USE_TABLE, &ApplianceUseRow::from(usage))
    }

    fn insert_time_update(&self, event: &ProcessingEvent) -> Result<(), StoreError> {
        self.insert(TIME_UPDATES_TABLE, &TimeUpdateRow::from(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplianceType;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;

    /// Answers each incoming request with the next scripted `(status, body)`
    /// and records the raw requests, lowercased.
    fn scripted_server(replies: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        std::thread::spawn(move || {
            for (status, body) in replies {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let request = read_request(&mut stream);
                log.lock().unwrap().push(request.to_ascii_lowercase());
                let reply = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(reply.as_bytes());
            }
        });

        (url, seen)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).into_owned();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn settings(url: &str) -> SupabaseSettings {
        SupabaseSettings {
            url: url.into(),
            api_key: "anon".into(),
            email: "bot@example.com".into(),
            password: "secret".into(),
            timeout_secs: 5,
        }
    }

    fn event() -> ProcessingEvent {
        ProcessingEvent::new("20240115-093000.png", at())
    }

    const SESSION_T1: &str = r#"{"access_token":"t1","refresh_token":"r1","expires_in":3600}"#;
    const SESSION_T2: &str = r#"{"access_token":"t2","refresh_token":"r2","expires_in":3600}"#;
    const JWT_EXPIRED: &str = r#"{"message":"JWT expired"}"#;

    fn at() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn appliance_row_matches_table_columns() {
        let usage = ApplianceUsage {
            appliance_type: ApplianceType::WashingMachine,
            running_for: Some("01:02:03".into()),
            external_id: "12345".into(),
            file_name: "20240115-093000.png".into(),
            collected_at: at(),
        };
        let value = serde_json::to_value(ApplianceUseRow::from(&usage)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "Waschmaschine",
                "running_for": "01:02:03",
                "appliance_external_id": "12345",
                "file_name": "20240115-093000.png",
                "date_collected": "2024-01-15 09:30:00",
            })
        );
    }

    #[test]
    fn missing_running_time_serializes_as_null() {
        let usage = ApplianceUsage {
            appliance_type: ApplianceType::Dryer,
            running_for: None,
            external_id: "54321".into(),
            file_name: "x.png".into(),
            collected_at: at(),
        };
        let value = serde_json::to_value(ApplianceUseRow::from(&usage)).unwrap();
        assert!(value["running_for"].is_null());
    }

    #[test]
    fn time_update_row_matches_table_columns() {
        let event = ProcessingEvent::new("20240115-093000.png", at());
        let value = serde_json::to_value(TimeUpdateRow::from(&event)).unwrap();
        assert_eq!(
            value,
            json!({
                "file_name": "20240115-093000.png",
                "update_time": "2024-01-15 09:30:00",
            })
        );
    }

    #[test]
    fn sign_in_against_closed_port_is_connection_error() {
        let settings = SupabaseSettings {
            url: "http://127.0.0.1:1/".into(),
            api_key: "anon".into(),
            email: "user@example.com".into(),
            password: "secret".into(),
            timeout_secs: 5,
        };
        assert!(matches!(
            SupabaseStore::sign_in(&settings),
            Err(StoreError::Connection(url)) if url == "http://127.0.0.1:1"
        ));
    }

    #[test]
    fn expired_token_triggers_sign_in_and_retry() {
        let (url, seen) = scripted_server(vec![
            (200, SESSION_T1),
            (201, ""),
            (401, JWT_EXPIRED),
            (200, SESSION_T2),
            (201, ""),
            (201, ""),
        ]);
        let store = SupabaseStore::sign_in(&settings(&url)).unwrap();

        store.insert_time_update(&event()).unwrap();
        store.insert_time_update(&event()).unwrap();
        store.insert_time_update(&event()).unwrap();

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 6);
        assert!(requests[0].starts_with("post /auth/v1/token?grant_type=password"));
        assert!(requests[1].contains("authorization: bearer t1"));
        assert!(requests[2].contains("authorization: bearer t1"));
        assert!(requests[3].starts_with("post /auth/v1/token?grant_type=password"));
        assert!(requests[4].starts_with("post /rest/v1/time_updates"));
        assert!(requests[4].contains("authorization: bearer t2"));
        assert!(requests[5].contains("authorization: bearer t2"));
    }

    #[test]
    fn token_near_expiry_is_refreshed_before_insert() {
        let (url, seen) = scripted_server(vec![
            (200, r#"{"access_token":"t1","refresh_token":"r1","expires_in":0}"#),
            (200, SESSION_T2),
            (201, ""),
        ]);
        let store = SupabaseStore::sign_in(&settings(&url)).unwrap();

        store.insert_time_update(&event()).unwrap();

        let requests = seen.lock().unwrap();
        assert!(requests[1].starts_with("post /auth/v1/token?grant_type=refresh_token"));
        assert!(requests[1].contains(r#""refresh_token":"r1""#));
        assert!(requests[2].contains("authorization: bearer t2"));
    }

    #[test]
    fn refused_refresh_falls_back_to_password() {
        let (url, seen) = scripted_server(vec![
            (200, r#"{"access_token":"t1","refresh_token":"r1","expires_in":0}"#),
            (400, r#"{"error":"invalid_grant"}"#),
            (200, SESSION_T2),
            (201, ""),
        ]);
        let store = SupabaseStore::sign_in(&settings(&url)).unwrap();

        store.insert_time_update(&event()).unwrap();

        let requests = seen.lock().unwrap();
        assert!(requests[2].starts_with("post /auth/v1/token?grant_type=password"));
        assert!(requests[3].contains("authorization: bearer t2"));
    }

    #[test]
    fn second_unauthorized_is_reported() {
        let (url, _seen) = scripted_server(vec![
            (200, SESSION_T1),
            (401, JWT_EXPIRED),
            (200, SESSION_T2),
            (401, JWT_EXPIRED),
        ]);
        let store = SupabaseStore::sign_in(&settings(&url)).unwrap();

        assert!(matches!(
            store.insert_time_update(&event()),
            Err(StoreError::Api { status: 401, .. })
        ));
    }

    #[test]
    fn rejected_password_is_sign_in_error() {
        let (url, _seen) = scripted_server(vec![(400, r#"{"error":"invalid_grant"}"#)]);
        assert!(matches!(
            SupabaseStore::sign_in(&settings(&url)),
            Err(StoreError::SignIn(_))
        ));
    }
}
