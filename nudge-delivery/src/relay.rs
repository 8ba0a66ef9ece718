//! Legacy relay client, second in the dispatch chain.
//!
//! The relay predates the push gateway and only understands a flat
//! to/message shape; it stays in the chain as a fallback until every user is
//! migrated off it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::{DeliveryReceipt, NotificationBackend, PushPayload};
use crate::error::BackendError;

const BACKEND_NAME: &str = "relay";

#[derive(Debug, Clone)]
pub struct RelayClient {
    url: String,
    client: reqwest::Client,
}

impl RelayClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn notify(
        &self,
        user_id: &str,
        payload: &PushPayload,
        schedule_at: Option<DateTime<Utc>>,
    ) -> Result<DeliveryReceipt, BackendError> {
        #[derive(Serialize)]
        struct Req<'a> {
            to: &'a str,
            message: String,
            priority: i32,
            #[serde(skip_serializing_if = "Option::is_none")]
            schedule_at: Option<String>,
        }

        #[derive(Deserialize)]
        struct Resp {
            ok: bool,
            id: Option<String>,
        }

        let body = Req {
            to: user_id,
            message: format!("{}\n{}", payload.title, payload.body),
            priority: payload.priority,
            schedule_at: schedule_at.map(|at| at.to_rfc3339()),
        };

        let resp = self
            .client
            .post(format!("{}/notify", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Http {
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

        match (out.ok, out.id) {
            (true, Some(id)) => Ok(DeliveryReceipt {
                backend: BACKEND_NAME,
                delivery_id: id,
            }),
            _ => Err(BackendError::Rejected {
                backend: BACKEND_NAME,
                reason: "relay did not acknowledge".to_string(),
            }),
        }
    }
}

#[async_trait]
impl NotificationBackend for RelayClient {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn send(
        &self,
        user_id: &str,
        payload: &PushPayload,
    ) -> Result<DeliveryReceipt, BackendError> {
        self.notify(user_id, payload, None).await
    }

    async fn schedule_at(
        &self,
        user_id: &str,
        payload: &PushPayload,
        at: DateTime<Utc>,
    ) -> Result<DeliveryReceipt, BackendError> {
        self.notify(user_id, payload, Some(at)).await
    }
}
