use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[automock]
#[async_trait]
pub trait StripeCustomerRepository {
    async fn find_user_id(&self, customer_id: &str) -> Result<Option<Uuid>>;
}
