#[macro_use]
extern crate serde;

mod address;
mod amount;
mod cache;
mod clock;
mod error;
mod events;
mod input;
mod manager;
mod oracle;
mod poll;
mod service;
mod store;
mod tally;
mod treasury;

pub use address::*;
pub use amount::*;
pub use cache::*;
pub use clock::*;
pub use error::*;
pub use events::*;
pub use input::*;
pub use manager::*;
pub use oracle::*;
pub use poll::*;
pub use service::*;
pub use store::*;
pub use tally::*;
pub use treasury::*;
