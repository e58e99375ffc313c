//! Request handlers.

pub mod articles;
pub mod health;
pub mod outputs;
pub mod standalone;
pub mod submissions;
pub mod webhooks;

pub use articles::*;
pub use health::*;
pub use outputs::*;
pub use standalone::*;
pub use submissions::*;
pub use webhooks::*;
