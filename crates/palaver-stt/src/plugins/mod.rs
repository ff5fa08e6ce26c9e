//! Built-in STT plugin implementations

pub mod mock;
pub mod noop;

pub use mock::MockPlugin;
pub use noop::NoOpPlugin;
