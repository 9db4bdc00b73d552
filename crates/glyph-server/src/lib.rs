//! glyph-server: HTTP gateway rendering ERC-721 metadata as text
//!
//! Routes `GET /CHAIN_ID/TOKEN_ID` to the source serving that chain,
//! discovering unknown chain ids by asking each configured RPC endpoint.

pub mod error;
pub mod metrics;
pub mod registry;
pub mod routes;
pub mod rpc;
pub mod server;
pub mod source;
pub mod state;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{RegistryError, ServerError, SourceError};
pub use registry::SourceRegistry;
pub use routes::create_router;
pub use rpc::Erc721Client;
pub use server::{GatewayServer, ServerBuilder};
pub use source::{same_source, ChainSource, Erc721Source, SharedSource};
pub use state::{create_shared_state, AppState, SharedState};
