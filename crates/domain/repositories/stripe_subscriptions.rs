use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

#[automock]
#[async_trait]
pub trait StripeSubscriptionRepository {
    /// Stripe customer id owning the mirrored subscription, if mirrored.
    async fn find_customer_id(&self, subscription_id: &str) -> Result<Option<String>>;
}
