// src/services.rs

pub mod auth;
pub mod chat_service;
pub mod chat_store;
pub mod dashboard_service;
pub mod document_service;
pub mod education_service;
pub mod health_service;
pub mod ouvidoria_service;
pub mod permission_service;
pub mod request_service;
