pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod models;
pub mod mutations;
pub mod profile;
pub mod store;
