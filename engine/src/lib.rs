//! Command orchestration for rext.
//!
//! A [`ReviewSession`] ties one editor to the chat model: it extracts the
//! visible code, sends it with a fixed prompt, and feeds the streamed reply
//! into the annotation parser (annotate) or the error collector (review).
//! Every pass holds a cancellation handle in the session's [`PassRegistry`];
//! starting a new pass cancels the previous one.

mod pass;
pub mod prompts;
mod session;

pub use pass::{Pass, PassId, PassRegistry};
pub use session::{CommandOutcome, EditorHost, ReviewSession};

pub use rext_core;
pub use rext_providers::{self, ChatModel, ReplayScript};
pub use rext_types::StreamEvent;
