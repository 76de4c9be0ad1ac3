use anyhow::Result;
use async_trait::async_trait;
use diesel::{dsl::exists, prelude::*, select};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::repositories::superadmins::SuperadminRepository,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::superadmins},
};

pub struct SuperadminPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SuperadminPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SuperadminRepository for SuperadminPostgres {
    async fn is_superadmin(&self, user_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let found = select(exists(
            superadmins::table.filter(superadmins::user_id.eq(user_id)),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(found)
    }
}
