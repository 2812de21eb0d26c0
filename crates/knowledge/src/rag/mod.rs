//! Retrieval-augmented answering.
//!
//! Retrieved chunks are stuffed into a single prompt and answered with one
//! model call.

pub mod synthesize;
pub mod types;

pub use synthesize::AnswerSynthesizer;
pub use types::{Synthesis, NO_INFORMATION_ANSWER};
