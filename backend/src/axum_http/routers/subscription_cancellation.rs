use crate::{
    auth::bearer_token,
    axum_http::error_responses::AppError,
    usecases::subscription_cancellation::{
        IdentityGateway, StripeGateway, SubscriptionCancellationUseCase,
    },
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::ALLOW},
    response::IntoResponse,
    routing::post,
};
use crates::{
    domain::{
        repositories::{
            stripe_customers::StripeCustomerRepository,
            stripe_subscriptions::StripeSubscriptionRepository,
            superadmins::SuperadminRepository,
        },
        value_objects::subscription_cancellation::{
            CancelSubscriptionModel, CancelSubscriptionResponse,
        },
    },
    infra::{
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{
                stripe_customers::StripeCustomerPostgres,
                stripe_subscriptions::StripeSubscriptionPostgres,
                superadmins::SuperadminPostgres,
            },
        },
        identity::supabase_auth::SupabaseAuthClient,
    },
    payments::stripe_client::StripeClient,
};
use std::sync::Arc;

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    identity: Arc<SupabaseAuthClient>,
    stripe_client: Arc<StripeClient>,
) -> Router {
    let usecase = SubscriptionCancellationUseCase::new(
        identity,
        Arc::new(SuperadminPostgres::new(Arc::clone(&db_pool))),
        Arc::new(StripeSubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(StripeCustomerPostgres::new(Arc::clone(&db_pool))),
        stripe_client,
    );

    router(Arc::new(usecase))
}

pub fn router<I, A, S, C, Stripe>(
    usecase: Arc<SubscriptionCancellationUseCase<I, A, S, C, Stripe>>,
) -> Router
where
    I: IdentityGateway + 'static,
    A: SuperadminRepository + Send + Sync + 'static,
    S: StripeSubscriptionRepository + Send + Sync + 'static,
    C: StripeCustomerRepository + Send + Sync + 'static,
    Stripe: StripeGateway + 'static,
{
    Router::new()
        .route(
            "/",
            post(cancel_subscription::<I, A, S, C, Stripe>)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .with_state(usecase)
}

/// Validation runs before authentication so malformed requests never reach the identity provider.
pub async fn cancel_subscription<I, A, S, C, Stripe>(
    State(usecase): State<Arc<SubscriptionCancellationUseCase<I, A, S, C, Stripe>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CancelSubscriptionResponse>, AppError>
where
    I: IdentityGateway + 'static,
    A: SuperadminRepository + Send + Sync + 'static,
    S: StripeSubscriptionRepository + Send + Sync + 'static,
    C: StripeCustomerRepository + Send + Sync + 'static,
    Stripe: StripeGateway + 'static,
{
    let model: CancelSubscriptionModel = serde_json::from_slice(&body)
        .map_err(|err| AppError::BadRequest(format!("Invalid request body: {err}")))?;
    let command = model
        .into_command()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    let access_token = bearer_token(&headers)?;

    let subscription = usecase.cancel_subscription(access_token, command).await?;

    Ok(Json(CancelSubscriptionResponse::from(subscription)))
}

pub async fn preflight() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn method_not_allowed() -> impl IntoResponse {
    ([(ALLOW, "POST, OPTIONS")], AppError::MethodNotAllowed)
}
