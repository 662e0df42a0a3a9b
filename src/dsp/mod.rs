pub mod buffer;
pub mod dynamics;
pub mod eq;
pub mod filter;
pub mod stereo;
