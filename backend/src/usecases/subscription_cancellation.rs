use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use crates::{
    domain::{
        repositories::{
            stripe_customers::StripeCustomerRepository,
            stripe_subscriptions::StripeSubscriptionRepository,
            superadmins::SuperadminRepository,
        },
        value_objects::{
            iam::AuthUser,
            subscription_cancellation::{CancellationCommand, CancellationResultDto},
        },
    },
    infra::identity::supabase_auth::SupabaseAuthClient,
    payments::stripe_client::{StripeClient, StripeSubscription},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn resolve_user(&self, access_token: &str) -> AnyResult<AuthUser>;
}

#[async_trait]
impl IdentityGateway for SupabaseAuthClient {
    async fn resolve_user(&self, access_token: &str) -> AnyResult<AuthUser> {
        self.get_user(access_token).await
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn cancel_subscription_now(
        &self,
        subscription_id: &str,
        cancel_reason: Option<String>,
    ) -> AnyResult<StripeSubscription>;

    async fn cancel_subscription_at_period_end(
        &self,
        subscription_id: &str,
        cancel_reason: Option<String>,
    ) -> AnyResult<StripeSubscription>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn cancel_subscription_now(
        &self,
        subscription_id: &str,
        cancel_reason: Option<String>,
    ) -> AnyResult<StripeSubscription> {
        self.cancel_subscription_now(subscription_id, cancel_reason.as_deref())
            .await
    }

    async fn cancel_subscription_at_period_end(
        &self,
        subscription_id: &str,
        cancel_reason: Option<String>,
    ) -> AnyResult<StripeSubscription> {
        self.cancel_subscription_at_period_end(subscription_id, cancel_reason.as_deref())
            .await
    }
}

#[derive(Debug, Error)]
pub enum CancellationError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error("You are not allowed to cancel this subscription")]
    Forbidden,
    #[error(transparent)]
    Downstream(#[from] anyhow::Error),
}

pub type UseCaseResult<T> = std::result::Result<T, CancellationError>;

/// Authenticates the caller, re-derives their right to act on the subscription, then asks
/// Stripe to cancel it exactly once.
pub struct SubscriptionCancellationUseCase<I, A, S, C, Stripe>
where
    I: IdentityGateway + 'static,
    A: SuperadminRepository + Send + Sync + 'static,
    S: StripeSubscriptionRepository + Send + Sync + 'static,
    C: StripeCustomerRepository + Send + Sync + 'static,
    Stripe: StripeGateway + 'static,
{
    identity: Arc<I>,
    superadmin_repo: Arc<A>,
    subscription_repo: Arc<S>,
    customer_repo: Arc<C>,
    stripe_client: Arc<Stripe>,
}

impl<I, A, S, C, Stripe> SubscriptionCancellationUseCase<I, A, S, C, Stripe>
where
    I: IdentityGateway + 'static,
    A: SuperadminRepository + Send + Sync + 'static,
    S: StripeSubscriptionRepository + Send + Sync + 'static,
    C: StripeCustomerRepository + Send + Sync + 'static,
    Stripe: StripeGateway + 'static,
{
    pub fn new(
        identity: Arc<I>,
        superadmin_repo: Arc<A>,
        subscription_repo: Arc<S>,
        customer_repo: Arc<C>,
        stripe_client: Arc<Stripe>,
    ) -> Self {
        Self {
            identity,
            superadmin_repo,
            subscription_repo,
            customer_repo,
            stripe_client,
        }
    }

    pub async fn authenticate(&self, access_token: &str) -> UseCaseResult<AuthUser> {
        self.identity
            .resolve_user(access_token)
            .await
            .map_err(|err| {
                info!(error = %err, "subscription_cancellation: caller could not be authenticated");
                CancellationError::Unauthenticated("Invalid or expired session".to_string())
            })
    }

    /// Fail-closed: any lookup error or missing row means "not authorized".
    pub async fn is_authorized(&self, user_id: Uuid, subscription_id: &str) -> bool {
        match self.superadmin_repo.is_superadmin(user_id).await {
            Ok(true) => {
                info!(%user_id, %subscription_id, "subscription_cancellation: caller is superadmin");
                return true;
            }
            Ok(false) => {}
            Err(err) => {
                warn!(
                    %user_id,
                    db_error = ?err,
                    "subscription_cancellation: superadmin lookup failed; treating as regular user"
                );
            }
        }

        let customer_id = match self.subscription_repo.find_customer_id(subscription_id).await {
            Ok(Some(customer_id)) => customer_id,
            Ok(None) => {
                info!(%user_id, %subscription_id, "subscription_cancellation: subscription not mirrored");
                return false;
            }
            Err(err) => {
                warn!(
                    %user_id,
                    %subscription_id,
                    db_error = ?err,
                    "subscription_cancellation: subscription lookup failed"
                );
                return false;
            }
        };

        let owner_id = match self.customer_repo.find_user_id(&customer_id).await {
            Ok(Some(owner_id)) => owner_id,
            Ok(None) => {
                info!(%user_id, %customer_id, "subscription_cancellation: customer not mirrored");
                return false;
            }
            Err(err) => {
                warn!(
                    %user_id,
                    %customer_id,
                    db_error = ?err,
                    "subscription_cancellation: customer lookup failed"
                );
                return false;
            }
        };

        owner_id == user_id
    }

    pub async fn cancel_subscription(
        &self,
        access_token: &str,
        command: CancellationCommand,
    ) -> UseCaseResult<CancellationResultDto> {
        let caller = self.authenticate(access_token).await?;
        let user_id = caller.user_id;
        let subscription_id = command.subscription_id.as_str();

        if !self.is_authorized(user_id, subscription_id).await {
            warn!(%user_id, %subscription_id, "subscription_cancellation: forbidden");
            return Err(CancellationError::Forbidden);
        }

        info!(
            %user_id,
            %subscription_id,
            cancel_immediately = command.cancel_immediately,
            has_reason = command.cancel_reason.is_some(),
            "subscription_cancellation: calling stripe"
        );

        let result = if command.cancel_immediately {
            self.stripe_client
                .cancel_subscription_now(subscription_id, command.cancel_reason.clone())
                .await
        } else {
            self.stripe_client
                .cancel_subscription_at_period_end(subscription_id, command.cancel_reason.clone())
                .await
        };

        let subscription = result.map_err(|err| {
            error!(
                %user_id,
                %subscription_id,
                error = ?err,
                "subscription_cancellation: stripe call failed"
            );
            CancellationError::Downstream(err)
        })?;

        let current_period_end = subscription.period_end().unwrap_or_else(|| {
            warn!(
                %subscription_id,
                "subscription_cancellation: stripe response has no current_period_end"
            );
            0
        });

        info!(
            %user_id,
            %subscription_id,
            status = %subscription.status,
            cancel_at_period_end = subscription.cancel_at_period_end,
            "subscription_cancellation: done"
        );

        Ok(CancellationResultDto {
            id: subscription.id,
            status: subscription.status,
            cancel_at_period_end: subscription.cancel_at_period_end,
            current_period_end,
        })
    }
}
