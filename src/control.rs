//! Outbound operator commands.
//!
//! Every call is fire-and-report: failures are logged and returned to the
//! caller, which keeps its optimistic local state and shows a notice.

use std::time::Duration;

use log::info;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{join_url, EndpointConfig};
use crate::error::{log_control_error, ControlError, ErrorCode};

/// Transient, dismissible message for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub code: i32,
    pub message: String,
}

impl Notice {
    pub fn from_error(err: &ControlError) -> Self {
        Self {
            code: err.code(),
            message: err.message(),
        }
    }
}

pub struct ControlClient {
    client: reqwest::Client,
    adapter: String,
    inference: String,
    capture: String,
}

impl ControlClient {
    pub fn new(endpoints: &EndpointConfig, timeout: Duration) -> Result<Self, ControlError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ControlError::ClientInit {
                reason: err.to_string(),
            })?;

        Ok(Self {
            client,
            adapter: endpoints.adapter.clone(),
            inference: endpoints.inference.clone(),
            capture: endpoints.capture.clone(),
        })
    }

    /// Ask the capture service to start the demo pipeline. Failures are
    /// logged and otherwise ignored.
    pub async fn start(&self) {
        let url = join_url(&self.capture, "/start");
        let result = match self.client.post(&url).send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(ControlError::Rejected {
                endpoint: format!("POST {}", url),
                status: response.status().as_u16(),
            }),
            Err(err) => Err(ControlError::Unreachable {
                endpoint: format!("POST {}", url),
                reason: err.to_string(),
            }),
        };
        match result {
            Ok(()) => info!("[Control] Demo pipeline started"),
            Err(err) => log_control_error(&err, "ControlClient::start"),
        }
    }

    pub async fn set_threshold(&self, threshold: f64) -> Result<Value, ControlError> {
        self.patch_config(&self.inference, json!({ "conf_threshold": threshold }))
            .await
    }

    pub async fn set_opcua_enabled(&self, enabled: bool) -> Result<Value, ControlError> {
        self.patch_config(&self.adapter, json!({ "opcua_enabled": enabled }))
            .await
    }

    /// The inference service calls its offline switch `demo_force`.
    pub async fn set_force_offline(&self, offline: bool) -> Result<Value, ControlError> {
        self.patch_config(&self.inference, json!({ "demo_force": offline }))
            .await
    }

    async fn patch_config(&self, base: &str, body: Value) -> Result<Value, ControlError> {
        let url = join_url(base, "/config");
        let endpoint = format!("PATCH {}", url);

        let result = async {
            let response = self
                .client
                .patch(&url)
                .json(&body)
                .send()
                .await
                .map_err(|err| ControlError::Unreachable {
                    endpoint: endpoint.clone(),
                    reason: err.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(ControlError::Rejected {
                    endpoint: endpoint.clone(),
                    status: status.as_u16(),
                });
            }

            response
                .json::<Value>()
                .await
                .map_err(|err| ControlError::InvalidResponse {
                    endpoint: endpoint.clone(),
                    reason: err.to_string(),
                })
        }
        .await;

        match &result {
            Ok(_) => info!("[Control] {} applied {}", endpoint, body),
            Err(err) => log_control_error(err, "ControlClient::patch_config"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ControlErrorCodes, ErrorCode};

    fn unreachable_endpoints() -> EndpointConfig {
        EndpointConfig {
            adapter: "http://127.0.0.1:1".into(),
            inference: "http://127.0.0.1:1".into(),
            capture: "http://127.0.0.1:1".into(),
            preprocess: "http://127.0.0.1:1".into(),
            events_path: "/events".into(),
        }
    }

    #[test]
    fn test_notice_carries_code_and_message() {
        let notice = Notice::from_error(&ControlError::Rejected {
            endpoint: "PATCH /config".into(),
            status: 500,
        });
        assert_eq!(notice.code, ControlErrorCodes::REJECTED);
        assert_eq!(notice.message, "PATCH /config rejected the request (HTTP 500)");
    }

    #[tokio::test]
    async fn test_unreachable_patch_reports_error() {
        let client = ControlClient::new(&unreachable_endpoints(), Duration::from_millis(200)).unwrap();
        let err = client.set_threshold(0.4).await.unwrap_err();
        assert_eq!(err.code(), ControlErrorCodes::UNREACHABLE);
    }

    #[tokio::test]
    async fn test_start_failure_is_swallowed() {
        let client = ControlClient::new(&unreachable_endpoints(), Duration::from_millis(200)).unwrap();
        client.start().await;
    }
}
