// src/lib.rs

pub mod config;
pub mod enrollment;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;
pub mod validation;

pub use enrollment::{BatchEnrollmentPipeline, EnrollmentError};
pub use routes::create_router;
pub use validation::QuestionValidator;
