pub mod admin;
pub mod error;
pub mod memo;
pub mod popular;
pub mod related;
pub mod repos;
pub mod stats;
