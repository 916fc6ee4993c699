pub mod cache;
pub mod error;
pub mod goods;
pub mod repos;
