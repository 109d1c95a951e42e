//! Discovery and session-routing core of the portgate gateway.
//!
//! Local analysis-tool instances speak JSON-RPC 2.0 over HTTP with an SSE
//! handshake. This crate finds them on a fixed port range, keeps a registry
//! with one active instance, and forwards tool calls to it.
//!
//! - [`Prober`] checks one port: handshake, `tools/list`, identity.
//! - [`Scanner`] probes the whole range concurrently and fills the [`Registry`].
//! - [`Forwarder`] relays calls to the active instance.
//! - [`Gateway`] ties them together behind the gateway tools, and
//!   [`StdioServer`] serves that surface over stdin/stdout.

pub mod client;
pub mod forwarder;
pub mod gateway;
pub mod identity;
pub mod instance;
pub mod probe;
pub mod protocol;
pub mod registry;
pub mod scanner;
pub mod sse;
pub mod stdio;

pub use client::PeerClient;
pub use forwarder::Forwarder;
pub use gateway::Gateway;
pub use identity::Identity;
pub use instance::{Instance, InstanceSummary};
pub use probe::Prober;
pub use registry::Registry;
pub use scanner::Scanner;
pub use sse::StreamHandle;
pub use stdio::StdioServer;
