use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::error;
use url::Url;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: Url,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StripeSubscriptionItem {
    pub current_period_end: Option<i64>,
}

impl StripeSubscription {
    /// Returns the subscription period end timestamp, falling back to the first item when needed.
    /// API versions from 2025-03-31 only report the period on items.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end.or_else(|| {
            self.items
                .data
                .first()
                .and_then(|item| item.current_period_end)
        })
    }
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: String, timeout: Duration) -> Result<Self> {
        let api_base = Url::parse(&api_base)
            .with_context(|| format!("invalid Stripe api base: {api_base}"))?;
        if api_base.cannot_be_a_base() {
            anyhow::bail!("invalid Stripe api base: {api_base}");
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Stripe http client")?;

        Ok(Self {
            http,
            secret_key,
            api_base,
        })
    }

    /// The id is pushed as a single path segment, so `?`, `#`, `%` and `/` stay inside it.
    fn subscription_url(&self, subscription_id: &str) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("invalid Stripe api base: {}", self.api_base))?
            .pop_if_empty()
            .extend(["v1", "subscriptions", subscription_id]);
        Ok(url)
    }

    /// Stripe's own error message is kept as the error text so callers can pass it through.
    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.as_deref()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
            stripe_error_param = ?details.as_ref().and_then(|d| d.param.as_deref()),
            response_body = %body,
            context = %context,
            "stripe api request failed"
        );

        match details.and_then(|d| d.message) {
            Some(message) => anyhow::bail!(message),
            None => anyhow::bail!(
                "Stripe API request failed: {} (status {}, request_id={:?})",
                context,
                status,
                request_id
            ),
        }
    }

    fn cancellation_form(cancel_reason: Option<&str>) -> Vec<(&'static str, String)> {
        cancel_reason
            .map(|reason| vec![("cancellation_details[comment]", reason.to_string())])
            .unwrap_or_default()
    }

    /// Cancels a subscription right away. Terminal on Stripe's side.
    pub async fn cancel_subscription_now(
        &self,
        subscription_id: &str,
        cancel_reason: Option<&str>,
    ) -> Result<StripeSubscription> {
        // https://stripe.com/docs/api/subscriptions/cancel
        let body = Self::cancellation_form(cancel_reason);
        let resp = self
            .http
            .delete(self.subscription_url(subscription_id)?)
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "cancel subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }

    /// Marks a Stripe subscription to cancel at period end.
    pub async fn cancel_subscription_at_period_end(
        &self,
        subscription_id: &str,
        cancel_reason: Option<&str>,
    ) -> Result<StripeSubscription> {
        // https://stripe.com/docs/api/subscriptions/update#update_subscription-cancel_at_period_end
        let mut body = vec![("cancel_at_period_end", "true".to_string())];
        body.extend(Self::cancellation_form(cancel_reason));

        let resp = self
            .http
            .post(self.subscription_url(subscription_id)?)
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "schedule subscription cancellation").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> StripeClient {
        StripeClient::new(
            "sk_test_123".to_string(),
            format!("{}/", server.url()),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn schedules_cancellation_at_period_end() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/subscriptions/sub_123")
            .match_header("authorization", "Bearer sk_test_123")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("cancel_at_period_end".into(), "true".into()),
                Matcher::UrlEncoded(
                    "cancellation_details[comment]".into(),
                    "switching tools".into(),
                ),
            ]))
            .with_status(200)
            .with_body(
                r#"{"id":"sub_123","object":"subscription","status":"active","cancel_at_period_end":true,"current_period_end":1767225600}"#,
            )
            .create_async()
            .await;

        let subscription = client_for(&server)
            .cancel_subscription_at_period_end("sub_123", Some("switching tools"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(subscription.id, "sub_123");
        assert_eq!(subscription.status, "active");
        assert!(subscription.cancel_at_period_end);
        assert_eq!(subscription.period_end(), Some(1_767_225_600));
    }

    #[tokio::test]
    async fn cancels_immediately_with_delete() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v1/subscriptions/sub_123")
            .match_header("authorization", "Bearer sk_test_123")
            .with_status(200)
            .with_body(
                r#"{"id":"sub_123","status":"canceled","cancel_at_period_end":false,"items":{"data":[{"current_period_end":1767225600}]}}"#,
            )
            .create_async()
            .await;

        let subscription = client_for(&server)
            .cancel_subscription_now("sub_123", None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(subscription.status, "canceled");
        assert!(!subscription.cancel_at_period_end);
        assert_eq!(subscription.current_period_end, None);
        assert_eq!(subscription.period_end(), Some(1_767_225_600));
    }

    #[tokio::test]
    async fn provider_error_message_is_passed_through() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/subscriptions/sub_missing")
            .with_status(404)
            .with_header("request-id", "req_abc")
            .with_body(
                r#"{"error":{"type":"invalid_request_error","code":"resource_missing","message":"No such subscription: 'sub_missing'","param":"id"}}"#,
            )
            .create_async()
            .await;

        let err = client_for(&server)
            .cancel_subscription_at_period_end("sub_missing", None)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "No such subscription: 'sub_missing'");
    }

    #[tokio::test]
    async fn unparseable_error_body_keeps_context() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/v1/subscriptions/sub_123")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = client_for(&server)
            .cancel_subscription_now("sub_123", None)
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("cancel subscription"), "got: {err}");
        assert!(err.contains("502"), "got: {err}");
    }

    #[tokio::test]
    async fn subscription_id_is_a_single_path_segment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v1/subscriptions/sub_1%3Fx%23y%25")
            .match_query(Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"id":"sub_1?x#y%","status":"canceled"}"#)
            .create_async()
            .await;

        let subscription = client_for(&server)
            .cancel_subscription_now("sub_1?x#y%", None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(subscription.id, "sub_1?x#y%");
    }

    #[test]
    fn keeps_api_base_path_prefix() {
        let client = StripeClient::new(
            "sk".to_string(),
            "https://proxy.example.com/stripe/".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(
            client.subscription_url("sub_a/b").unwrap().as_str(),
            "https://proxy.example.com/stripe/v1/subscriptions/sub_a%2Fb"
        );
    }

    #[test]
    fn rejects_invalid_api_base() {
        let result = StripeClient::new(
            "sk".to_string(),
            "api.stripe.com".to_string(),
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn period_end_is_none_without_any_source() {
        let subscription: StripeSubscription =
            serde_json::from_str(r#"{"id":"sub_1","status":"canceled"}"#).unwrap();
        assert_eq!(subscription.period_end(), None);
    }
}
