//! Best-effort classification of media titles.
//!
//! Turns the free-text title a player reports (usually a filename) into a
//! [`Classification`]: TV episode, movie, anime, or generic video.

pub mod classification;
pub mod classifier;
pub mod keyword;
pub mod normalize;

pub use classification::{Classification, ContentKind};
pub use classifier::classify;
