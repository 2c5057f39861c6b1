//! Application services layer.

pub mod about;
pub mod confirm;
pub mod content;
pub mod error;
pub mod listing;
pub mod repos;
pub mod session;
pub mod storage;
pub mod uploads;
