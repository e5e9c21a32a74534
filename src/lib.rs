//! Palaver is a Telegram assistant bot that synthesizes conversational
//! replies from several LLM backends.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`gateway`] reduces every backend to one `complete(prompt) -> text`
//!   call behind the [`gateway::ModelGateway`] seam.
//! - [`pipeline`] is the response synthesis state machine: a per-strategy
//!   generation stage (single backend or concurrent fan-out plus merge)
//!   followed by a shared humanize → tone-review → humanize tail.
//! - [`progress`] runs the "still working" indicator task alongside each
//!   pipeline invocation, coordinated by a single cancellation token.
//! - [`chunker`] splits finished replies into transport-sized segments at
//!   sentence and word boundaries.
//! - [`modes`] persists each user's selected strategy in a JSON file.
//! - [`telegram`] is the transport: Bot API payloads, a long-polling
//!   client, and the update loop that ties everything together.
//! - [`api`] and [`config`] hold the provider wire payloads and the
//!   environment secrets.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`), which
//! wires a [`gateway::HttpGateway`] and the built-in humanizer into a
//! [`telegram::Bot`].

pub mod api;
pub mod chunker;
pub mod config;
pub mod gateway;
pub mod modes;
pub mod pipeline;
pub mod progress;
pub mod telegram;
