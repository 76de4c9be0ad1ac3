use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity resolved from a bearer token by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub user_id: Uuid,
}
