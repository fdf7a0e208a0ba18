//! API-key resolution, tenant-scoped rate limiting, and tenant/key
//! bootstrap. The HTTP layer is an external collaborator: this crate
//! exposes plain functions and structs it calls into, not middleware.

pub mod bootstrap;
pub mod error;
pub mod rate_limit;
pub mod resolver;
pub mod signing;

pub use bootstrap::{bootstrap_tenant_api_key, BootstrapError, BootstrappedKey};
pub use error::{AuthError, RateLimitError};
pub use rate_limit::RateLimiter;
pub use resolver::resolve;
