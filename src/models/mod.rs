pub mod config;
pub mod friend;
pub mod medal;
pub mod notification;
pub mod school;
pub mod store;
pub mod study;
pub mod user;

pub use config::*;
pub use friend::*;
pub use medal::*;
pub use notification::*;
pub use school::*;
pub use store::*;
pub use study::*;
pub use user::*;
