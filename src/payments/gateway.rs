//! Blocking client of the payment gateway REST api. Calls run on the cpu pool
//! next to the db work of the service that issues them.
use std::time::Duration;

use failure::{Error as FailureError, Fail};
use reqwest;
use serde::de::DeserializeOwned;
use serde::Serialize;

use config;
use errors::Error;
use models::{GatewayOrder, GatewayPayment, GatewayRefund};

pub trait PaymentGateway: Send + Sync {
    /// Opens a gateway order the checkout widget pays into
    fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> Result<GatewayOrder, FailureError>;
    fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, FailureError>;
    /// Captures an authorized payment for the full `amount`
    fn capture(&self, payment_id: &str, amount: i64, currency: &str) -> Result<GatewayPayment, FailureError>;
    fn refund(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund, FailureError>;
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct OrderRequest<'a> {
    pub amount: i64,
    pub currency: &'a str,
    pub receipt: &'a str,
    pub payment_capture: u8,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CaptureRequest<'a> {
    pub amount: i64,
    pub currency: &'a str,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RefundRequest {
    pub amount: i64,
}

pub struct HttpPaymentGateway {
    base_url: String,
    key_id: String,
    key_secret: String,
    http_client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(config: &config::Payments) -> Result<Self, FailureError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_s))
            .build()?;
        Ok(Self {
            base_url: config.url.clone(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            http_client,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, FailureError> {
        let url = self.endpoint(path);
        debug!("Payment gateway GET {}", url);
        let request = self.http_client.get(url.as_str()).basic_auth(&self.key_id, Some(&self.key_secret));
        read_response(request.send(), &url)
    }

    fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, FailureError> {
        let url = self.endpoint(path);
        debug!("Payment gateway POST {}", url);
        let request = self
            .http_client
            .post(url.as_str())
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(body);
        read_response(request.send(), &url)
    }
}

fn read_response<R: DeserializeOwned>(sent: reqwest::Result<reqwest::Response>, url: &str) -> Result<R, FailureError> {
    let mut response = sent.map_err(|e| e.context(format!("Payment gateway request to {} failed", url)).context(Error::Gateway))?;
    let status = response.status();
    if !status.is_success() {
        return Err(format_err!("Payment gateway answered {} with status {}", url, status)
            .context(Error::Gateway)
            .into());
    }
    response
        .json::<R>()
        .map_err(|e| e.context(format!("Unexpected payment gateway answer from {}", url)).context(Error::Gateway).into())
}

impl PaymentGateway for HttpPaymentGateway {
    fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> Result<GatewayOrder, FailureError> {
        let body = OrderRequest {
            amount,
            currency,
            receipt,
            payment_capture: 1,
        };
        self.post("orders", &body)
    }

    fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, FailureError> {
        self.get(&format!("payments/{}", payment_id))
    }

    fn capture(&self, payment_id: &str, amount: i64, currency: &str) -> Result<GatewayPayment, FailureError> {
        self.post(&format!("payments/{}/capture", payment_id), &CaptureRequest { amount, currency })
    }

    fn refund(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund, FailureError> {
        self.post(&format!("payments/{}/refund", payment_id), &RefundRequest { amount })
    }
}

#[cfg(test)]
pub mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json;

    use super::*;

    /// In-memory gateway keeping orders and payments, recording every call
    #[derive(Default)]
    pub struct PaymentGatewayMock {
        pub payments: Mutex<HashMap<String, GatewayPayment>>,
        pub calls: Mutex<Vec<String>>,
        pub unavailable: bool,
    }

    impl PaymentGatewayMock {
        pub fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Default::default()
            }
        }

        pub fn add_payment(&self, payment: GatewayPayment) {
            self.payments.lock().unwrap().insert(payment.id.clone(), payment);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> Result<(), FailureError> {
            self.calls.lock().unwrap().push(call);
            if self.unavailable {
                Err(format_err!("Gateway is down").context(Error::Gateway).into())
            } else {
                Ok(())
            }
        }

        fn payment(&self, payment_id: &str) -> Result<GatewayPayment, FailureError> {
            self.payments
                .lock()
                .unwrap()
                .get(payment_id)
                .cloned()
                .ok_or_else(|| format_err!("Unknown payment {}", payment_id).context(Error::Gateway).into())
        }
    }

    impl PaymentGateway for PaymentGatewayMock {
        fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> Result<GatewayOrder, FailureError> {
            self.record(format!("create_order {} {} {}", amount, currency, receipt))?;
            Ok(GatewayOrder {
                id: format!("order_{}", receipt),
                amount,
                currency: currency.to_string(),
                receipt: Some(receipt.to_string()),
            })
        }

        fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, FailureError> {
            self.record(format!("fetch_payment {}", payment_id))?;
            self.payment(payment_id)
        }

        fn capture(&self, payment_id: &str, amount: i64, currency: &str) -> Result<GatewayPayment, FailureError> {
            self.record(format!("capture {} {} {}", payment_id, amount, currency))?;
            let mut payment = self.payment(payment_id)?;
            payment.status = "captured".to_string();
            self.add_payment(payment.clone());
            Ok(payment)
        }

        fn refund(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund, FailureError> {
            self.record(format!("refund {} {}", payment_id, amount))?;
            Ok(GatewayRefund {
                id: format!("rfnd_{}", payment_id),
                payment_id: payment_id.to_string(),
                amount,
            })
        }
    }

    fn gateway(url: &str) -> HttpPaymentGateway {
        HttpPaymentGateway::new(&config::Payments {
            url: url.to_string(),
            key_id: "rzp_test_key".to_string(),
            key_secret: "rzp_test_secret".to_string(),
            currency: "INR".to_string(),
            timeout_s: 1,
        }).unwrap()
    }

    #[test]
    fn test_endpoint_joins_paths() {
        assert_eq!(gateway("https://api.razorpay.com/v1/").endpoint("/orders"), "https://api.razorpay.com/v1/orders");
        assert_eq!(
            gateway("https://api.razorpay.com/v1").endpoint("payments/pay_1/capture"),
            "https://api.razorpay.com/v1/payments/pay_1/capture"
        );
    }

    #[test]
    fn test_order_request_body() {
        let body = OrderRequest {
            amount: 49900,
            currency: "INR",
            receipt: "3f2c",
            payment_capture: 1,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "amount": 49900, "currency": "INR", "receipt": "3f2c", "payment_capture": 1 })
        );
    }

    #[test]
    fn test_gateway_payment_ignores_extra_fields() {
        let payment: GatewayPayment = serde_json::from_value(json!({
            "id": "pay_29QQoUBi66xm2f",
            "entity": "payment",
            "amount": 49900,
            "currency": "INR",
            "status": "authorized",
            "order_id": "order_9A33XWu170gUtm",
            "captured": false
        })).unwrap();
        assert_eq!(payment.amount, 49900);
        assert_eq!(payment.order_id, Some("order_9A33XWu170gUtm".to_string()));
    }

    #[test]
    fn test_unreachable_gateway_is_a_gateway_error() {
        let err = gateway("http://127.0.0.1:1").fetch_payment("pay_1").unwrap_err();
        let kind = err.iter_chain().filter_map(|cause| cause.downcast_ref::<Error>()).next();
        match kind {
            Some(Error::Gateway) => {}
            other => panic!("unexpected error {:?}", other),
        }
    }
}
