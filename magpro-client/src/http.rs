//! HTTP transport
//!
//! [`Api`] is the seam between the engine and the network: the worker and
//! the sync/queue/transfer components only ever see the trait, so tests run
//! against a scripted mock while production uses [`HttpClient`].

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::{CartItem, PendingOrder, Product, SeatMap, Table};

use crate::{ClientConfig, ClientError, ClientResult};

/// Envelope the server answers mutations with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl StatusResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Server-provided message, or a fallback for terse servers.
    pub fn message_or(&self, fallback: &str) -> String {
        self.message.clone().unwrap_or_else(|| fallback.to_string())
    }
}

/// Server API surface used by the engine.
#[async_trait]
pub trait Api: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> ClientResult<StatusResponse>;
    async fn fetch_tables(&self) -> ClientResult<Vec<Table>>;
    async fn fetch_table_seats(&self, table_id: i64, timeout: Duration) -> ClientResult<SeatMap>;
    async fn fetch_products(&self) -> ClientResult<Vec<Product>>;
    async fn fetch_cart_details(
        &self,
        table_id: i64,
        seat_number: u32,
    ) -> ClientResult<Vec<CartItem>>;
    async fn submit_order(&self, order: &PendingOrder) -> ClientResult<StatusResponse>;
    async fn remind_order(
        &self,
        table_id: i64,
        seat_number: u32,
        user_name: &str,
    ) -> ClientResult<StatusResponse>;
    async fn move_table(&self, source_id: i64, destination_id: i64) -> ClientResult<StatusResponse>;
    async fn move_seat(
        &self,
        table_id: i64,
        seat_number: u32,
        destination_table_id: i64,
        destination_seat: u32,
    ) -> ClientResult<StatusResponse>;

    /// Install or clear the auth token for subsequent requests. Transports
    /// without authentication ignore this.
    fn set_token(&self, _token: Option<String>) {}
}

/// `move_table` request body. Field names are the wire contract; the
/// server parses these exact keys.
#[derive(Debug, Serialize)]
struct MoveTableRequest {
    source_id: i64,
    dest_id: i64,
}

/// `move_seat` request body, same caveat.
#[derive(Debug, Serialize)]
struct MoveSeatRequest {
    table_id: i64,
    source_seat: u32,
    dest_table_id: i64,
    dest_seat: u32,
}

/// HTTP client for network-based API calls
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    default_timeout: Duration,
    token: RwLock<Option<String>>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration. Timeouts are applied
    /// per request, not on the builder, because seat-map lookups use a
    /// different deadline than the rest.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(ClientError::from)?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            default_timeout: config.request_timeout(),
            token: RwLock::new(None),
        })
    }

    fn auth_header(&self) -> Option<String> {
        self.token
            .read()
            .ok()
            .and_then(|t| t.as_ref().map(|t| format!("Bearer {t}")))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, timeout: Duration) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path)).timeout(timeout);
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path)).json(body).timeout(timeout);
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Non-2xx responses become [`ClientError::Rejected`] carrying the
    /// server's message when it sent one.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StatusResponse>(&text)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| format!("Server error ({status})"));
            return Err(ClientError::Rejected { message });
        }

        response.json().await.map_err(Into::into)
    }
}

#[async_trait]
impl Api for HttpClient {
    async fn login(&self, username: &str, password: &str) -> ClientResult<StatusResponse> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            username: &'a str,
            password: &'a str,
        }

        self.post(
            "login",
            &LoginRequest { username, password },
            self.default_timeout,
        )
        .await
    }

    async fn fetch_tables(&self) -> ClientResult<Vec<Table>> {
        self.get("tables", self.default_timeout).await
    }

    async fn fetch_table_seats(&self, table_id: i64, timeout: Duration) -> ClientResult<SeatMap> {
        self.get(&format!("table_seats/{table_id}"), timeout).await
    }

    async fn fetch_products(&self) -> ClientResult<Vec<Product>> {
        self.get("products", self.default_timeout).await
    }

    async fn fetch_cart_details(
        &self,
        table_id: i64,
        seat_number: u32,
    ) -> ClientResult<Vec<CartItem>> {
        #[derive(Serialize)]
        struct CartRequest {
            table_id: i64,
            seat_number: u32,
        }

        self.post(
            "cart_details",
            &CartRequest {
                table_id,
                seat_number,
            },
            self.default_timeout,
        )
        .await
    }

    async fn submit_order(&self, order: &PendingOrder) -> ClientResult<StatusResponse> {
        self.post("submit_order", order, self.default_timeout).await
    }

    async fn remind_order(
        &self,
        table_id: i64,
        seat_number: u32,
        user_name: &str,
    ) -> ClientResult<StatusResponse> {
        #[derive(Serialize)]
        struct RemindRequest<'a> {
            table_id: i64,
            seat_number: u32,
            user_name: &'a str,
        }

        self.post(
            "remind_order",
            &RemindRequest {
                table_id,
                seat_number,
                user_name,
            },
            self.default_timeout,
        )
        .await
    }

    async fn move_table(&self, source_id: i64, destination_id: i64) -> ClientResult<StatusResponse> {
        self.post(
            "move_table",
            &MoveTableRequest {
                source_id,
                dest_id: destination_id,
            },
            self.default_timeout,
        )
        .await
    }

    async fn move_seat(
        &self,
        table_id: i64,
        seat_number: u32,
        destination_table_id: i64,
        destination_seat: u32,
    ) -> ClientResult<StatusResponse> {
        self.post(
            "move_seat",
            &MoveSeatRequest {
                table_id,
                source_seat: seat_number,
                dest_table_id: destination_table_id,
                dest_seat: destination_seat,
            },
            self.default_timeout,
        )
        .await
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_response_success() {
        let resp: StatusResponse =
            serde_json::from_str(r#"{"status":"success","token":"abc"}"#).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.token.as_deref(), Some("abc"));

        let resp: StatusResponse =
            serde_json::from_str(r#"{"status":"error","message":"table locked"}"#).unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.message_or("fallback"), "table locked");
    }

    #[test]
    fn message_fallback() {
        let resp: StatusResponse = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert_eq!(resp.message_or("Operation failed."), "Operation failed.");
    }

    #[test]
    fn move_table_wire_fields() {
        let body = serde_json::to_value(MoveTableRequest {
            source_id: 1,
            dest_id: 2,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"source_id": 1, "dest_id": 2}));
    }

    #[test]
    fn move_seat_wire_fields() {
        let body = serde_json::to_value(MoveSeatRequest {
            table_id: 1,
            source_seat: 2,
            dest_table_id: 5,
            dest_seat: 1,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "table_id": 1,
                "source_seat": 2,
                "dest_table_id": 5,
                "dest_seat": 1,
            })
        );
    }
}
