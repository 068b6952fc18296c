#![forbid(unsafe_code)]

pub mod model;
pub mod player;
pub mod time;
pub mod unlock;

pub use time::Clock;
