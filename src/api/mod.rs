mod client;
pub mod decode;

pub use client::ApiClient;
pub use decode::HealthStatus;
