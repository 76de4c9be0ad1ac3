use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::repositories::stripe_customers::StripeCustomerRepository,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::stripe_customers},
};

pub struct StripeCustomerPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl StripeCustomerPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn find_user_id_query(
    customer_id: &str,
) -> diesel::dsl::Select<
    diesel::dsl::Filter<stripe_customers::table, diesel::dsl::Eq<stripe_customers::id, &str>>,
    stripe_customers::user_id,
> {
    stripe_customers::table
        .filter(stripe_customers::id.eq(customer_id))
        .select(stripe_customers::user_id)
}

#[async_trait]
impl StripeCustomerRepository for StripeCustomerPostgres {
    async fn find_user_id(&self, customer_id: &str) -> Result<Option<Uuid>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user_id = find_user_id_query(customer_id)
            .first::<Uuid>(&mut conn)
            .optional()?;

        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::{debug_query, pg::Pg};

    #[test]
    fn selects_only_user_id() {
        let sql = debug_query::<Pg, _>(&find_user_id_query("cus_456")).to_string();
        assert!(
            sql.starts_with(r#"SELECT "stripe_customers"."user_id" FROM "stripe_customers""#),
            "got: {sql}"
        );
        assert!(!sql.contains("created_at"), "got: {sql}");
    }
}
