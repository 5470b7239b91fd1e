//! Speech synthesis system

pub mod engine;
pub mod backends;

pub use engine::{create_engine, preferred_voice_index, SpeechEngine, Voice};
