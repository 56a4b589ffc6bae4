// Process termination

pub mod signals;

pub use signals::{KillResult, SignalTerminator, Terminator};
