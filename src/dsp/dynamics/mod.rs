pub mod gate;
pub mod limiter;
pub mod peak;
pub mod phrase;
