//! # RagRelay Agent
//! The request pipeline: retrieve context, wrap it in the guide persona,
//! stream the upstream answer back.
//!
//! ## Pieces:
//! - **StreamRelay**: waiting chunk, retrieval, prompt composition, upstream forwarding
//! - **PassthroughRelay**: plain proxy without retrieval
//! - **Waiting phrases**: pluggable selector so tests can pin the first chunk
//! - **Prompt**: the tour-guide system message built around retrieved passages

pub mod passthrough;
pub mod prompt;
pub mod relay;
pub mod waiting;

#[cfg(test)]
mod test_support;

pub use passthrough::PassthroughRelay;
pub use relay::{RelayEvent, RelayStage, RelayStream, StreamRelay};
pub use waiting::{FixedSelector, PhraseSelector, RandomSelector, SeededSelector, WAITING_PHRASES};
