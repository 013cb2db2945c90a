pub mod api;
pub mod data_collector;
pub mod database;
pub mod date_range;
pub mod error;
pub mod exporter;
pub mod models;
pub mod normalizer;
pub mod utils;
pub mod validator;
