pub mod subscription_cancellation;
