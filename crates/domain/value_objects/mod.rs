pub mod iam;
pub mod subscription_cancellation;
