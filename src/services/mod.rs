pub mod account_service;
pub use account_service::{AccountError, AccountService, AdminCount};

pub mod account_service_impl;
pub use account_service_impl::SeaOrmAccountService;

pub mod auth_service;
pub use auth_service::{AuthError, AuthService};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod audit;
pub use audit::{AuditEmitter, FanOutEmitter, StoreAuditEmitter, TracingAuditEmitter};

pub mod bootstrap;

pub mod credentials;
pub use credentials::CredentialVerifier;

pub mod lockout;
pub use lockout::{LockoutGovernor, LockoutState};

pub mod password;
pub use password::SecretHasher;

pub mod scheduler;
pub use scheduler::Scheduler;
