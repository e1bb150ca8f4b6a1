pub mod db;
pub mod models;
pub mod search_log;

mod error;

pub use error::{Error, Result};
