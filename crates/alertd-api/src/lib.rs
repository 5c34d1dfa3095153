// alertd-api: Async client for the alert hub (SSE event stream + commands)

pub mod client;
pub mod error;
pub mod sse;
pub mod stream;
pub mod transport;

pub use client::{AlertClient, Endpoints};
pub use error::Error;
pub use stream::{
    ConnectionStatus, EventStream, EventStreamHandle, ReconnectConfig, StreamEvent, StreamMessage,
};
pub use transport::{TlsMode, TransportConfig};
