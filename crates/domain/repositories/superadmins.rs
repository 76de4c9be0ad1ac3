use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[automock]
#[async_trait]
pub trait SuperadminRepository {
    async fn is_superadmin(&self, user_id: Uuid) -> Result<bool>;
}
