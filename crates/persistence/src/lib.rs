pub mod db;
pub mod repository;

pub use db::*;
pub use repository::*;
