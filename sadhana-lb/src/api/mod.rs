//! API route handlers

pub mod activities;
pub mod data;
pub mod health;
pub mod members;
pub mod submissions;
pub mod sync;
pub mod teams;

pub use activities::activity_routes;
pub use data::data_routes;
pub use health::health_routes;
pub use members::member_routes;
pub use submissions::submission_routes;
pub use sync::sync_routes;
pub use teams::team_routes;
