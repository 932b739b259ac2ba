pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod education;
pub mod health;
pub mod ouvidoria;
pub mod permissions;
pub mod requests;
