pub mod authentication;
pub mod clock;
pub mod configuration;
pub mod domain;
pub mod errors;
pub mod packaging;
pub mod repository;
pub mod routes;
pub mod services;
pub mod startup;
pub mod submit;
pub mod telemetry;
pub mod workers;
