// src/supabase_client.rs
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::models::AuthUser;

pub const REST_PATH: &str = "/rest/v1";
pub const AUTH_PATH: &str = "/auth/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const ADMIN_USERS_PAGE_SIZE: usize = 1000;

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Supabase API error: Status={status}, Message='{message}'")]
    Api { status: StatusCode, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: String,
    pub request_timeout_secs: u64,
}

// --- Query building ---

/// Column-projected select with equality/inclusion filters and ordering,
/// rendered as PostgREST query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    table: String,
    select: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<usize>,
}

impl TableQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.split(',').map(str::trim).collect::<Vec<_>>().join(",");
        self
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("gte.{}", value)));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("lte.{}", value)));
        self
    }

    pub fn in_list<S: AsRef<str>>(mut self, column: &str, values: &[S]) -> Self {
        let quoted: Vec<String> = values
            .iter()
            .map(|v| format!("\"{}\"", v.as_ref().replace('"', "\\\"")))
            .collect();
        self.filters
            .push((column.to_string(), format!("in.({})", quoted.join(","))));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order = Some(format!("{}.{}", column, direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.select.clone())];
        pairs.extend(self.filters.iter().cloned());
        if let Some(order) = &self.order {
            pairs.push(("order".to_string(), order.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

// --- Auth admin payloads ---

#[derive(Debug, Clone, Serialize)]
pub struct CreateAuthUser {
    pub email: String,
    pub password: String,
    pub email_confirm: bool,
    pub user_metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AdminUsersPage {
    #[serde(default)]
    users: Vec<AuthUser>,
}

// --- Client ---

#[derive(Clone)]
pub struct SupabaseClient {
    config: Arc<SupabaseConfig>,
    http_client: Client,
    base_url: Url,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, SupabaseError> {
        if config.service_role_key.trim().is_empty() {
            return Err(SupabaseError::ConfigError(
                "service role key is empty".to_string(),
            ));
        }
        let base_url = Url::parse(config.url.trim_end_matches('/'))?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, prefix: &str, path: &str) -> Result<Url, SupabaseError> {
        let joined = format!(
            "{}{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            prefix,
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }

    fn service_request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", &self.config.service_role_key)
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.config.service_role_key),
            )
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send_and_deserialize<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<T, SupabaseError> {
        let response = request_builder.send().await?;
        let status = response.status();
        debug!("Response for '{}': Status={}", context_msg, status);

        if status.is_success() {
            let bytes = response.bytes().await?;
            serde_json::from_slice::<T>(&bytes).map_err(|e| {
                error!("JSON deserialization failed for '{}': {}", context_msg, e);
                SupabaseError::Json(e)
            })
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            let message = extract_error_message(&body);
            error!(
                "Supabase request '{}' failed: Status={}, Message={}",
                context_msg, status, message
            );
            Err(SupabaseError::Api { status, message })
        }
    }

    // --- Table access ---

    pub async fn select<T: DeserializeOwned>(
        &self,
        query: &TableQuery,
    ) -> Result<Vec<T>, SupabaseError> {
        let mut url = self.endpoint(REST_PATH, query.table())?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        let request = self.service_request(Method::GET, url);
        self.send_and_deserialize(request, &format!("select {}", query.table()))
            .await
    }

    pub async fn select_one<T: DeserializeOwned>(
        &self,
        query: TableQuery,
    ) -> Result<Option<T>, SupabaseError> {
        let rows: Vec<T> = self.select(&query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>, SupabaseError> {
        let url = self.endpoint(REST_PATH, table)?;
        let request = self
            .service_request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(body);
        self.send_and_deserialize(request, &format!("insert {}", table))
            .await
    }

    /// Insert, or merge into the row that collides on `on_conflict`.
    pub async fn upsert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        on_conflict: &str,
        body: &B,
    ) -> Result<Vec<T>, SupabaseError> {
        let mut url = self.endpoint(REST_PATH, table)?;
        url.query_pairs_mut().append_pair("on_conflict", on_conflict);
        let request = self
            .service_request(Method::POST, url)
            .header("Prefer", "return=representation,resolution=merge-duplicates")
            .json(body);
        self.send_and_deserialize(request, &format!("upsert {}", table))
            .await
    }

    /// PATCH every row matching the query's filters.
    pub async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        query: &TableQuery,
        patch: &B,
    ) -> Result<Vec<T>, SupabaseError> {
        let mut url = self.endpoint(REST_PATH, query.table())?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        let request = self
            .service_request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(patch);
        self.send_and_deserialize(request, &format!("update {}", query.table()))
            .await
    }

    // --- Auth provider ---

    /// Resolves a caller's access token. A token the provider rejects is
    /// `Ok(None)`, not an error.
    pub async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, SupabaseError> {
        let url = self.endpoint(AUTH_PATH, "user")?;
        let request = self
            .http_client
            .get(url)
            .header("apikey", &self.config.service_role_key)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .header(ACCEPT, "application/json");
        match self.send_and_deserialize::<AuthUser>(request, "get user").await {
            Ok(user) => Ok(Some(user)),
            Err(SupabaseError::Api { status, .. })
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn admin_list_users(&self) -> Result<Vec<AuthUser>, SupabaseError> {
        let mut all_users = Vec::new();
        let mut page = 1;
        loop {
            let mut url = self.endpoint(AUTH_PATH, "admin/users")?;
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &ADMIN_USERS_PAGE_SIZE.to_string());
            let request = self.service_request(Method::GET, url);
            let batch: AdminUsersPage = self
                .send_and_deserialize(request, &format!("list users page {}", page))
                .await?;
            let fetched = batch.users.len();
            all_users.extend(batch.users);
            if fetched < ADMIN_USERS_PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(all_users)
    }

    pub async fn admin_create_user(
        &self,
        new_user: &CreateAuthUser,
    ) -> Result<AuthUser, SupabaseError> {
        let url = self.endpoint(AUTH_PATH, "admin/users")?;
        let request = self.service_request(Method::POST, url).json(new_user);
        self.send_and_deserialize(request, "create user").await
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(String::from))
        })
        .unwrap_or_else(|| body.to_string())
}
