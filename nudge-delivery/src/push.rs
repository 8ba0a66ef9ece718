//! Primary push-notification client.
//!
//! Talks to the hosted push gateway; an explicit `success` acknowledgement
//! with a delivery id is the only thing treated as delivered.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use crate::backend::{DeliveryReceipt, NotificationBackend, PushPayload};
use crate::error::BackendError;

const BACKEND_NAME: &str = "pushgate";

#[derive(Debug, Clone)]
pub struct PushGateClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl PushGateClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    async fn post_notification(
        &self,
        user_id: &str,
        payload: &PushPayload,
        send_at: Option<DateTime<Utc>>,
    ) -> Result<DeliveryReceipt, BackendError> {
        #[derive(Serialize)]
        struct Req<'a> {
            user_id: &'a str,
            title: &'a str,
            body: &'a str,
            data: &'a serde_json::Value,
            priority: i32,
            #[serde(skip_serializing_if = "Option::is_none")]
            send_at: Option<String>,
        }

        #[derive(Deserialize)]
        struct Resp {
            success: bool,
            delivery_id: Option<String>,
        }

        let body = Req {
            user_id,
            title: &payload.title,
            body: &payload.body,
            data: &payload.data,
            priority: payload.priority,
            send_at: send_at.map(|at| at.to_rfc3339()),
        };

        let mut req = self
            .client
            .post(format!("{}/v1/notifications", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let resp = req.send().await.map_err(|source| BackendError::Http {
            backend: BACKEND_NAME,
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(BackendError::Rejected {
                backend: BACKEND_NAME,
                reason: format!("{status} {txt}"),
            });
        }

        let out: Resp = resp.json().await.map_err(|source| BackendError::Http {
            backend: BACKEND_NAME,
            source,
        })?;

        match (out.success, out.delivery_id) {
            (true, Some(delivery_id)) => Ok(DeliveryReceipt {
                backend: BACKEND_NAME,
                delivery_id,
            }),
            (true, None) => Err(BackendError::Rejected {
                backend: BACKEND_NAME,
                reason: "acknowledgement missing delivery id".to_string(),
            }),
            (false, _) => Err(BackendError::Rejected {
                backend: BACKEND_NAME,
                reason: "gateway reported failure".to_string(),
            }),
        }
    }
}

#[async_trait]
impl NotificationBackend for PushGateClient {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn send(
        &self,
        user_id: &str,
        payload: &PushPayload,
    ) -> Result<DeliveryReceipt, BackendError> {
        self.post_notification(user_id, payload, None).await
    }

    async fn schedule_at(
        &self,
        user_id: &str,
        payload: &PushPayload,
        at: DateTime<Utc>,
    ) -> Result<DeliveryReceipt, BackendError> {
        self.post_notification(user_id, payload, Some(at)).await
    }
}
