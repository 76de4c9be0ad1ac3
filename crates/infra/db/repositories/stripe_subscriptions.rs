use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, prelude::*};
use std::sync::Arc;

use crate::{
    domain::repositories::stripe_subscriptions::StripeSubscriptionRepository,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::stripe_subscriptions},
};

pub struct StripeSubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl StripeSubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// Only the columns used for the ownership check are read, so the mirror may carry more.
fn find_customer_id_query(
    subscription_id: &str,
) -> diesel::dsl::Select<
    diesel::dsl::Filter<stripe_subscriptions::table, diesel::dsl::Eq<stripe_subscriptions::id, &str>>,
    stripe_subscriptions::customer_id,
> {
    stripe_subscriptions::table
        .filter(stripe_subscriptions::id.eq(subscription_id))
        .select(stripe_subscriptions::customer_id)
}

#[async_trait]
impl StripeSubscriptionRepository for StripeSubscriptionPostgres {
    async fn find_customer_id(&self, subscription_id: &str) -> Result<Option<String>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let customer_id = find_customer_id_query(subscription_id)
            .first::<String>(&mut conn)
            .optional()?;

        Ok(customer_id)
    }
}
