use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

pub const MAX_SUBSCRIPTION_ID_LEN: usize = 255;
/// Stripe rejects `cancellation_details[comment]` longer than this.
pub const MAX_CANCEL_REASON_LEN: usize = 5000;

/// Request body accepted by the cancellation endpoint.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CancelSubscriptionModel {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub cancel_immediately: Option<bool>,
}

/// A validated cancellation, ready to be authorized and sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationCommand {
    pub subscription_id: String,
    pub cancel_reason: Option<String>,
    pub cancel_immediately: bool,
}

impl CancelSubscriptionModel {
    pub fn into_command(self) -> Result<CancellationCommand> {
        let subscription_id = self.subscription_id.unwrap_or_default();
        let subscription_id = subscription_id.trim();
        if subscription_id.is_empty() {
            bail!("subscription_id is required");
        }
        if subscription_id.len() > MAX_SUBSCRIPTION_ID_LEN {
            bail!("subscription_id is too long");
        }
        if subscription_id.chars().any(|c| c.is_control() || c.is_whitespace() || c == '/') {
            bail!("subscription_id contains invalid characters");
        }

        let cancel_reason = self
            .cancel_reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());
        if let Some(reason) = cancel_reason.as_ref() {
            if reason.chars().count() > MAX_CANCEL_REASON_LEN {
                bail!("cancel_reason is too long");
            }
        }

        Ok(CancellationCommand {
            subscription_id: subscription_id.to_string(),
            cancel_reason,
            cancel_immediately: self.cancel_immediately.unwrap_or(false),
        })
    }
}

/// Provider state after a cancellation, as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancellationResultDto {
    pub id: String,
    pub status: String,
    pub cancel_at_period_end: bool,
    pub current_period_end: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancelSubscriptionResponse {
    pub success: bool,
    pub subscription: CancellationResultDto,
}

impl From<CancellationResultDto> for CancelSubscriptionResponse {
    fn from(subscription: CancellationResultDto) -> Self {
        Self {
            success: true,
            subscription,
        }
    }
}
