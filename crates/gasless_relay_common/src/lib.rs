pub mod db;
pub mod error;

pub use db::*;
