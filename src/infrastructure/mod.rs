pub mod config;
pub mod day_store;
pub mod error;
pub mod history_codec;
pub mod storage;
