//! Wire types shared between the codecraft console and its backend.

pub mod messages;

pub use messages::*;
