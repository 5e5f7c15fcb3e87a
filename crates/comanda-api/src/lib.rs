pub mod auth;
pub mod config;
pub mod error;
pub mod json;
pub mod model;
pub mod repository;
pub mod routes;
pub mod state;
