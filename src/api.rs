// src/api.rs
use crate::error::{ClientError, Result};
use crate::models::{Alert, AlertCondition, Candle, Stock};
use log::{debug, error, info};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct AiResponse {
    #[serde(alias = "answer", alias = "reply")]
    response: String,
}

#[derive(Serialize)]
struct NewAlert<'a> {
    symbol: &'a str,
    condition: AlertCondition,
    value: f64,
}

/// Thin JSON client for the dashboard backend.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let raw = base_url.into();
        let base_url = Url::parse(raw.trim_end_matches('/'))
            .map_err(|e| ClientError::Validation(format!("invalid base URL {:?}: {}", raw, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "base URL {:?} cannot carry a path",
                raw
            )));
        }
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Builds `<base>/api/<segments..>`, percent-encoding each segment so ids
    /// and symbols cannot change the path or add a query.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let req = self
            .http
            .post(self.url(&["auth", "login"]))
            .json(&json!({ "email": email, "password": password }));
        let body: TokenResponse = send_public(req).await?;
        Ok(body.token)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<String> {
        let req = self
            .http
            .post(self.url(&["auth", "register"]))
            .json(&json!({ "name": name, "email": email, "password": password }));
        let body: MessageResponse = send_public(req).await?;
        Ok(body.message)
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<String> {
        let req = self
            .http
            .post(self.url(&["auth", "verify-otp"]))
            .json(&json!({ "email": email, "otp": otp }));
        let body: TokenResponse = send_public(req).await?;
        Ok(body.token)
    }

    pub async fn stocks(&self, token: &str) -> Result<Vec<Stock>> {
        let req = self.http.get(self.url(&["stocks"])).bearer_auth(token);
        let stocks: Vec<Stock> = send(req).await?;
        debug!("Fetched {} stocks", stocks.len());
        Ok(stocks)
    }

    pub async fn candles(&self, token: &str, symbol: &str, range: &str) -> Result<Vec<Candle>> {
        let req = self
            .http
            .get(self.url(&["stocks", symbol, "candles"]))
            .query(&[("range", range)])
            .bearer_auth(token);
        send(req).await
    }

    pub async fn ask(&self, token: &str, query: &str) -> Result<String> {
        let req = self
            .http
            .post(self.url(&["ai", "query"]))
            .bearer_auth(token)
            .json(&json!({ "query": query }));
        let body: AiResponse = send(req).await?;
        Ok(body.response)
    }

    pub async fn create_alert(
        &self,
        token: &str,
        symbol: &str,
        condition: AlertCondition,
        value: f64,
    ) -> Result<Alert> {
        let req = self
            .http
            .post(self.url(&["alerts"]))
            .bearer_auth(token)
            .json(&NewAlert {
                symbol,
                condition,
                value,
            });
        let alert: Alert = send(req).await?;
        info!("Alert {} created for {}", alert.id, alert.symbol);
        Ok(alert)
    }

    pub async fn alerts(&self, token: &str) -> Result<Vec<Alert>> {
        let req = self.http.get(self.url(&["alerts"])).bearer_auth(token);
        send(req).await
    }

    pub async fn mark_alert_read(&self, token: &str, id: &str) -> Result<()> {
        let req = self
            .http
            .put(self.url(&["alerts", id, "read"]))
            .bearer_auth(token);
        send_empty(req).await
    }

    pub async fn portfolio_buy(
        &self,
        token: &str,
        symbol: &str,
        quantity: f64,
        price: f64,
    ) -> Result<()> {
        let req = self
            .http
            .post(self.url(&["portfolio", "buy"]))
            .bearer_auth(token)
            .json(&json!({ "symbol": symbol, "quantity": quantity, "price": price }));
        send_empty(req).await
    }
}

/// Sends the request and returns the body of a 2xx response. A 401 on an
/// authenticated call means the session token was rejected; on the auth
/// endpoints it is an ordinary failure such as a wrong password.
async fn checked(req: RequestBuilder, authenticated: bool) -> Result<String> {
    let response = req.send().await.map_err(|e| {
        error!("HTTP request failed: {}", e);
        ClientError::Http(e)
    })?;
    let status = response.status();
    let body = response.text().await?;
    if authenticated && status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }
    if !status.is_success() {
        error!("Backend returned HTTP {}", status);
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
    let body = checked(req, true).await?;
    Ok(serde_json::from_str(&body)?)
}

async fn send_public<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
    let body = checked(req, false).await?;
    Ok(serde_json::from_str(&body)?)
}

async fn send_empty(req: RequestBuilder) -> Result<()> {
    checked(req, true).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_are_percent_encoded() {
        let api = ApiClient::new("http://localhost:5000/").unwrap();
        let url = api.url(&["alerts", "a/b?c#d", "read"]);
        assert_eq!(url.path(), "/api/alerts/a%2Fb%3Fc%23d/read");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn base_url_path_prefix_is_kept() {
        let api = ApiClient::new("https://example.com/dash").unwrap();
        assert_eq!(
            api.url(&["stocks", "BRK.B", "candles"]).as_str(),
            "https://example.com/dash/api/stocks/BRK.B/candles"
        );
        assert_eq!(api.base_url(), "https://example.com/dash");
    }

    #[test]
    fn unparsable_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::Validation(_))
        ));
    }
}
