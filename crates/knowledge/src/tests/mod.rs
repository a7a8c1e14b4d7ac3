//! Cross-module tests for the answering pipeline.

mod conversation_turns;
mod fakes;
