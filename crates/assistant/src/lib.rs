//! The card assistant — one streaming conversational turn at a time.
//!
//! A turn follows a fixed path:
//!
//! 1. **Build** the system prompt and tool descriptors from the profile
//! 2. **Stream** the LLM response, forwarding fragments and tool calls to the
//!    session's broadcast channel as they arrive
//! 3. **Finalize** by persisting the assistant message and announcing it
//!
//! Failures never escape a turn: the prompt phase publishes a fixed error
//! event and stops; the streaming phase retries per [`retry`]'s table and
//! publishes a single apology event when attempts are exhausted.

pub mod prompt;
pub mod retry;
pub mod tools;
pub mod turn;

pub use tools::{ToolKind, dispatch};
pub use turn::TurnRunner;
