use crate::domain::model::{
    ApiEnvelope, AuditId, ContinueCheckRequest, ExpectedItem, InventoryAudit,
    RejectTicketRequest, StartCheckRequest, SubmitReceipt, SubmitRequest, Ticket, TicketId,
    TicketKind, TicketStatus, Warehouse, WarehouseId, Zone, ZoneId,
};
use crate::domain::ports::{ConfigProvider, InventoryBackend, TicketBackend};
use crate::utils::error::{Result, StocktakeError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const AUTH_HEADER: &str = "Auth-token";

/// 以 `Auth-token` 標頭呼叫倉儲後端，回應一律是 `{ message, body }`
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
}

impl RestBackend {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(token).map_err(|e| {
            StocktakeError::InvalidConfigValueError {
                field: "backend.token".to_string(),
                value: "<redacted>".to_string(),
                reason: format!("Token is not a valid header value: {}", e),
            }
        })?;
        value.set_sensitive(true);
        headers.insert(AUTH_HEADER, value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.base_url(),
            config.auth_token(),
            config.request_timeout(),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 送出請求並拆開 envelope；非 2xx 時盡量帶回伺服器的 message
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        tracing::debug!("📡 {} -> {}", url, status);

        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&text)
                .ok()
                .and_then(|envelope| envelope.message)
                .filter(|m| !m.trim().is_empty());
            tracing::warn!("⚠️ {} failed with {}: {:?}", url, status, message);
            return Err(StocktakeError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&text)?;
        if let Some(message) = &envelope.message {
            tracing::debug!("📡 {}: {}", url, message);
        }
        Ok(envelope.body)
    }

    async fn send_required<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .ok_or_else(|| StocktakeError::ProcessingError {
                message: format!("Response from {} has no body", path),
            })
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let request = self.client.get(self.url(path));
        Ok(self.send(request).await?.unwrap_or_default())
    }
}

#[async_trait]
impl InventoryBackend for RestBackend {
    async fn list_warehouses(&self) -> Result<Vec<Warehouse>> {
        self.get_list("/warehouses").await
    }

    async fn list_zones(&self, warehouse_id: WarehouseId) -> Result<Vec<Zone>> {
        self.get_list(&format!("/warehouses/{}/zones", warehouse_id))
            .await
    }

    async fn list_zone_items(&self, zone_id: ZoneId) -> Result<Vec<ExpectedItem>> {
        self.get_list(&format!("/zones/{}/items", zone_id)).await
    }

    async fn list_checks(&self) -> Result<Vec<InventoryAudit>> {
        self.get_list("/inventory-checks").await
    }

    async fn current_check(&self) -> Result<Option<InventoryAudit>> {
        let request = self.client.get(self.url("/inventory-checks/current"));
        match self.send(request).await {
            Err(StocktakeError::ServerError { status: 404, .. }) => Ok(None),
            other => other,
        }
    }

    async fn start_check(&self, request: &StartCheckRequest) -> Result<InventoryAudit> {
        let path = "/inventory-checks";
        let builder = self.client.post(self.url(path)).json(request);
        self.send_required(path, builder).await
    }

    async fn continue_check(
        &self,
        audit_id: AuditId,
        request: &ContinueCheckRequest,
    ) -> Result<InventoryAudit> {
        let path = format!("/inventory-checks/{}", audit_id);
        let builder = self.client.put(self.url(&path)).json(request);
        self.send_required(&path, builder).await
    }

    async fn submit_check(&self, request: &SubmitRequest) -> Result<SubmitReceipt> {
        let path = format!("/inventory-checks/{}/submit", request.audit_id);
        let builder = self.client.post(self.url(&path)).json(request);
        self.send_required(&path, builder).await
    }
}

#[async_trait]
impl TicketBackend for RestBackend {
    async fn list_tickets(
        &self,
        status: Option<TicketStatus>,
        kind: Option<TicketKind>,
    ) -> Result<Vec<Ticket>> {
        let mut request = self.client.get(self.url("/tickets"));
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        if let Some(kind) = kind {
            request = request.query(&[("type", kind.as_str())]);
        }
        Ok(self.send(request).await?.unwrap_or_default())
    }

    async fn approve_ticket(&self, ticket_id: TicketId) -> Result<Ticket> {
        let path = format!("/tickets/{}/approve", ticket_id);
        let builder = self.client.post(self.url(&path));
        self.send_required(&path, builder).await
    }

    async fn reject_ticket(&self, ticket_id: TicketId, reason: &str) -> Result<Ticket> {
        let path = format!("/tickets/{}/reject", ticket_id);
        let body = RejectTicketRequest {
            reason: reason.to_string(),
        };
        let builder = self.client.post(self.url(&path)).json(&body);
        self.send_required(&path, builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn backend(server: &MockServer) -> RestBackend {
        RestBackend::new(&server.base_url(), "secret-token", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_auth_header_and_envelope() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/warehouses")
                    .header(AUTH_HEADER, "secret-token");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({
                        "message": "ok",
                        "body": [{"id": 1, "name": "Main"}, {"id": 2, "name": "Cold"}]
                    }));
            })
            .await;

        let warehouses = backend(&server).list_warehouses().await.unwrap();

        api_mock.assert_async().await;
        assert_eq!(warehouses.len(), 2);
        assert_eq!(warehouses[1].name, "Cold");
    }

    #[tokio::test]
    async fn test_server_message_is_kept() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/inventory-checks");
                then.status(409)
                    .json_body(json!({"message": "Zone 2 is locked by audit 7", "body": null}));
            })
            .await;

        let err = backend(&server)
            .start_check(&StartCheckRequest {
                warehouse_id: 1,
                zone_ids: vec![2],
            })
            .await
            .unwrap_err();

        match &err {
            StocktakeError::ServerError { status, message } => {
                assert_eq!(*status, 409);
                assert_eq!(message.as_deref(), Some("Zone 2 is locked by audit 7"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.user_friendly_message(), "Zone 2 is locked by audit 7");
    }

    #[tokio::test]
    async fn test_non_json_error_has_no_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/zones/3/items");
                then.status(502).body("Bad Gateway");
            })
            .await;

        let err = backend(&server).list_zone_items(3).await.unwrap_err();
        assert!(matches!(err, StocktakeError::ServerError { status: 502, message: None }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_current_check_absent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/inventory-checks/current");
                then.status(200).json_body(json!({"message": "none", "body": null}));
            })
            .await;

        assert!(backend(&server).current_check().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_body_on_required_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/tickets/5/approve");
                then.status(200).json_body(json!({"message": "done"}));
            })
            .await;

        let err = backend(&server).approve_ticket(5).await.unwrap_err();
        assert!(matches!(err, StocktakeError::ProcessingError { .. }));
    }

    #[tokio::test]
    async fn test_ticket_filters_are_sent_as_query() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/tickets")
                    .query_param("status", "PENDING")
                    .query_param("type", "WRITE_OFF");
                then.status(200).json_body(json!({
                    "body": [{
                        "id": 4,
                        "type": "WRITE_OFF",
                        "status": "PENDING",
                        "createdAt": "2026-10-01T08:00:00Z"
                    }]
                }));
            })
            .await;

        let tickets = backend(&server)
            .list_tickets(Some(TicketStatus::Pending), Some(TicketKind::WriteOff))
            .await
            .unwrap();

        api_mock.assert_async().await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].kind, TicketKind::WriteOff);
    }

    #[test]
    fn test_invalid_token_is_config_error() {
        let err = RestBackend::new("http://localhost", "bad\ntoken", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, StocktakeError::InvalidConfigValueError { .. }));
    }
}
