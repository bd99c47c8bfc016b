pub mod auth;
pub mod manager;
pub mod passenger;
pub mod tickets;
