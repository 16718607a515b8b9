pub mod auth;
pub mod clubs;
pub mod health;
pub mod members;
pub mod suggestions;
pub mod uploads;
pub mod users;
