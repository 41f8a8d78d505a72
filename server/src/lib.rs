pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod item;
pub mod metadata;
pub mod odata;
pub mod routes;
pub mod urls;
