mod message;
mod server;
mod user;

pub use message::*;
pub use server::*;
pub use user::*;
