pub mod api_client;
pub mod balance;
pub mod config;
pub mod error;
pub mod models;
pub mod presenter;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;
