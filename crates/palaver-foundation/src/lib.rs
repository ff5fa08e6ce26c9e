pub mod clock;
pub mod env;
pub mod error;
pub mod health;
pub mod ring_buffer;
pub mod shutdown;
pub mod state;

pub use clock::*;
pub use env::*;
pub use error::*;
pub use health::*;
pub use ring_buffer::{TimeIndexedRingBuffer, Timestamped};
pub use shutdown::*;
pub use state::*;
