pub mod account_handlers;
pub mod auth_handlers;
pub mod dashboard;
pub mod resource;
