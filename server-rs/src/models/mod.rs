pub mod activity;
pub mod club;
pub mod membership;
pub mod user;

pub use activity::*;
pub use club::*;
pub use membership::*;
pub use user::*;
