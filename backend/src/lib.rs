pub mod auth;
pub mod autopay_services;
pub mod axum_http;
pub mod config;
pub mod usecases;
