pub mod alliances;
pub mod config;
pub mod earthmc;
mod error;
pub mod helpers;

pub use error::ApiError;
