pub mod config;
pub mod errors;
pub mod saludo_utils;
