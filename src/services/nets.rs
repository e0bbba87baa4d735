// NETS QR payment requests

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_config::NetsConfig;
use crate::utils::ServiceError;

#[derive(Error, Debug)]
pub enum NetsError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("NETS declined the request: code {code}, txn status {txn_status}")]
    Declined { code: String, txn_status: i32 },

    #[error("NETS error: {0}")]
    Upstream(String),
}

impl From<NetsError> for ServiceError {
    fn from(e: NetsError) -> Self {
        match e {
            NetsError::Http(e) => ServiceError::UpstreamFailure(e.to_string()),
            NetsError::Declined { code, txn_status } => ServiceError::UpstreamFailure(format!(
                "NETS declined: code {}, txn status {}",
                code, txn_status
            )),
            NetsError::Upstream(m) => ServiceError::UpstreamFailure(m),
        }
    }
}

#[derive(Debug, Serialize)]
struct QrRequest {
    txn_id: String,
    amt_in_dollars: String,
    notify_mobile: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QrResponseEnvelope {
    result: QrResult,
}

#[derive(Debug, Deserialize)]
struct QrResult {
    data: QrData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QrData {
    response_code: String,
    #[serde(default)]
    txn_status: i32,
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    txn_retrieval_ref: Option<String>,
}

/// Issued QR, handed to the frontend for scanning
#[derive(Debug, Clone, Serialize)]
pub struct NetsQr {
    /// Base64-encoded QR image
    pub qr_code: String,
    pub txn_retrieval_ref: String,
    pub txn_id: String,
}

/// NETS open API client
#[derive(Debug, Clone)]
pub struct NetsClient {
    http: reqwest::Client,
    config: NetsConfig,
}

impl NetsClient {
    pub fn new(config: NetsConfig) -> Self {
        NetsClient {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Request a QR code for the given amount. The transaction id carries
    /// the order reference so webhook callbacks can be correlated.
    pub async fn request_qr(
        &self,
        amount_cents: i64,
        order_ref: &str,
    ) -> Result<NetsQr, NetsError> {
        let txn_id = format!("{}{}", self.config.txn_id_prefix, order_ref);
        let body = QrRequest {
            txn_id: txn_id.clone(),
            amt_in_dollars: crate::services::paypal::format_cents(amount_cents),
            notify_mobile: 0,
        };

        let response = self
            .http
            .post(format!(
                "{}/common/payments/nets-qr/request",
                self.config.base_url
            ))
            .header("api-key", &self.config.api_key)
            .header("project-id", &self.config.project_id)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(NetsError::Upstream(format!("{}: {}", status, text)));
        }

        let envelope: QrResponseEnvelope = response.json().await?;
        let qr = extract_qr(envelope, txn_id)?;
        tracing::info!(txn_id = %qr.txn_id, "Issued NETS QR");
        Ok(qr)
    }
}

/// Success requires response code "00" and txn status 1 together
pub(crate) fn extract_qr(envelope: QrResponseEnvelope, txn_id: String) -> Result<NetsQr, NetsError> {
    let data = envelope.result.data;

    if data.response_code != "00" || data.txn_status != 1 {
        return Err(NetsError::Declined {
            code: data.response_code,
            txn_status: data.txn_status,
        });
    }

    match (data.qr_code, data.txn_retrieval_ref) {
        (Some(qr_code), Some(txn_retrieval_ref)) => Ok(NetsQr {
            qr_code,
            txn_retrieval_ref,
            txn_id,
        }),
        _ => Err(NetsError::Upstream(
            "success response missing QR payload".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(raw: serde_json::Value) -> QrResponseEnvelope {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_extract_qr_success() {
        let env = envelope(serde_json::json!({
            "result": {"data": {
                "response_code": "00",
                "txn_status": 1,
                "qr_code": "aGVsbG8=",
                "txn_retrieval_ref": "REF123"
            }}
        }));
        let qr = extract_qr(env, "sandbox_nets|m|ORD1".to_string()).unwrap();
        assert_eq!(qr.qr_code, "aGVsbG8=");
        assert_eq!(qr.txn_retrieval_ref, "REF123");
    }

    #[test]
    fn test_extract_qr_declined_code() {
        let env = envelope(serde_json::json!({
            "result": {"data": {"response_code": "12", "txn_status": 1}}
        }));
        assert!(matches!(
            extract_qr(env, "t".to_string()),
            Err(NetsError::Declined { .. })
        ));
    }

    #[test]
    fn test_extract_qr_bad_txn_status() {
        // Code "00" alone is not success; txn_status must also be 1
        let env = envelope(serde_json::json!({
            "result": {"data": {"response_code": "00", "txn_status": 0}}
        }));
        assert!(matches!(
            extract_qr(env, "t".to_string()),
            Err(NetsError::Declined { .. })
        ));
    }

    #[test]
    fn test_extract_qr_missing_payload() {
        let env = envelope(serde_json::json!({
            "result": {"data": {"response_code": "00", "txn_status": 1}}
        }));
        assert!(matches!(
            extract_qr(env, "t".to_string()),
            Err(NetsError::Upstream(_))
        ));
    }
}
