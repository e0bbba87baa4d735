// PayPal checkout: client-credentials token, order create, order capture

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_config::PayPalConfig;
use crate::utils::ServiceError;

#[derive(Error, Debug)]
pub enum PayPalError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("PayPal error: {0}")]
    Upstream(String),
}

impl From<PayPalError> for ServiceError {
    fn from(e: PayPalError) -> Self {
        match e {
            PayPalError::Http(e) => ServiceError::UpstreamFailure(e.to_string()),
            PayPalError::Upstream(m) => ServiceError::UpstreamFailure(m),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    intent: &'static str,
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Serialize)]
struct PurchaseUnit {
    reference_id: String,
    amount: AmountWithBreakdown,
    items: Vec<Item>,
}

#[derive(Debug, Serialize)]
struct AmountWithBreakdown {
    currency_code: String,
    value: String,
    breakdown: Breakdown,
}

#[derive(Debug, Serialize)]
struct Breakdown {
    item_total: Amount,
}

#[derive(Debug, Serialize)]
struct Item {
    name: String,
    quantity: String,
    unit_amount: Amount,
}

#[derive(Debug, Serialize)]
struct Amount {
    currency_code: String,
    value: String,
}

/// A priced order line, taken from the caller's cart rather than the
/// request body
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

impl OrderLine {
    pub fn total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity as i64
    }
}

/// Sum of line totals in cents
pub fn order_total_cents(lines: &[OrderLine]) -> i64 {
    lines.iter().map(OrderLine::total_cents).sum()
}

/// Created or captured order, as returned to the frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayPalOrder {
    pub id: String,
    pub status: String,
}

/// PayPal REST client. A fresh access token is requested per call; the
/// sandbox token endpoint is cheap and this avoids expiry bookkeeping.
#[derive(Debug, Clone)]
pub struct PayPalClient {
    http: reqwest::Client,
    config: PayPalConfig,
}

impl PayPalClient {
    pub fn new(config: PayPalConfig) -> Self {
        PayPalClient {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn access_token(&self) -> Result<String, PayPalError> {
        let credentials = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            self.config.client_id, self.config.client_secret
        ));

        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.config.base_url))
            .header("Authorization", format!("Basic {}", credentials))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PayPalError::Upstream(format!(
                "token request failed: {}: {}",
                status, text
            )));
        }

        Ok(response.json::<TokenResponse>().await?.access_token)
    }

    /// Create a CAPTURE-intent order priced from the given lines
    pub async fn create_order(
        &self,
        reference: &str,
        lines: &[OrderLine],
    ) -> Result<PayPalOrder, PayPalError> {
        let token = self.access_token().await?;
        let body = build_order_body(&self.config.currency, reference, lines);

        let response = self
            .http
            .post(format!("{}/v2/checkout/orders", self.config.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PayPalError::Upstream(format!(
                "order create failed: {}: {}",
                status, text
            )));
        }

        let order: PayPalOrder = response.json().await?;
        tracing::info!(order_id = %order.id, reference, "Created PayPal order");
        Ok(order)
    }

    /// Capture an approved order. Anything but COMPLETED is a failure.
    pub async fn capture_order(&self, order_id: &str) -> Result<PayPalOrder, PayPalError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.config.base_url, order_id
            ))
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PayPalError::Upstream(format!(
                "capture failed: {}: {}",
                status, text
            )));
        }

        let order: PayPalOrder = response.json().await?;
        if order.status != "COMPLETED" {
            return Err(PayPalError::Upstream(format!(
                "capture ended in status {}",
                order.status
            )));
        }

        tracing::info!(order_id = %order.id, "Captured PayPal order");
        Ok(order)
    }
}

/// Cents to a decimal string with two places, as the amount API expects
pub fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Order body with the item breakdown; the total is computed from the
/// lines so it always matches the item_total the API cross-checks
fn build_order_body(currency: &str, reference: &str, lines: &[OrderLine]) -> CreateOrderRequest {
    let amount = |cents: i64| Amount {
        currency_code: currency.to_string(),
        value: format_cents(cents),
    };
    let total = order_total_cents(lines);

    CreateOrderRequest {
        intent: "CAPTURE",
        purchase_units: vec![PurchaseUnit {
            reference_id: reference.to_string(),
            amount: AmountWithBreakdown {
                currency_code: currency.to_string(),
                value: format_cents(total),
                breakdown: Breakdown {
                    item_total: amount(total),
                },
            },
            items: lines
                .iter()
                .map(|line| Item {
                    name: line.name.clone(),
                    quantity: line.quantity.to_string(),
                    unit_amount: amount(line.unit_price_cents),
                })
                .collect(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(100), "1.00");
        assert_eq!(format_cents(1_234), "12.34");
        assert_eq!(format_cents(99_990), "999.90");
    }

    #[test]
    fn test_order_body_prices_from_lines() {
        let lines = vec![
            OrderLine {
                name: "Concert".to_string(),
                quantity: 2,
                unit_price_cents: 1_500,
            },
            OrderLine {
                name: "Festival".to_string(),
                quantity: 1,
                unit_price_cents: 4_999,
            },
        ];
        assert_eq!(order_total_cents(&lines), 7_999);

        let body = serde_json::to_value(build_order_body("SGD", "ORD-1", &lines)).unwrap();
        let unit = &body["purchase_units"][0];
        assert_eq!(unit["amount"]["value"], "79.99");
        assert_eq!(unit["amount"]["breakdown"]["item_total"]["value"], "79.99");
        assert_eq!(unit["items"][0]["quantity"], "2");
        assert_eq!(unit["items"][0]["unit_amount"]["value"], "15.00");
        assert_eq!(unit["items"][1]["name"], "Festival");
    }
}
