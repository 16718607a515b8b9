pub mod clubs;
pub mod gemini;
pub mod membership;
pub mod suggestion;
pub mod uploads;
