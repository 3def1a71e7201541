mod auth;
mod passive;
mod role;

pub use auth::auth_middleware;
pub use passive::passive_triggers_middleware;
pub use role::require_scheduler_role;
