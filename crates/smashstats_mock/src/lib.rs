//! Test doubles for smashstats: synthetic replays, an in-memory parser, and
//! local stand-ins for the remote service's HTTP API and upload socket.

mod api;
mod fixture;
mod parser;
mod server;

pub use api::{MockApi, credential_for_code};
pub use fixture::*;
pub use parser::InMemoryParser;
pub use server::{AcceptAllServer, MockBehavior};
