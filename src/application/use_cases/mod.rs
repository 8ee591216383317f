//! Application use cases

pub mod cross_chain;
pub mod health_check;
pub mod management;
pub mod metrics;

pub use cross_chain::CrossChainUseCase;
pub use health_check::HealthCheckUseCase;
pub use management::ManagementUseCase;
pub use metrics::GetMetricsUseCase;
