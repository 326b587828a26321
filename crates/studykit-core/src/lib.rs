//! studykit-core: shared protocol and storage library for studykit.
//!
//! Provides the terminal wire frames and their tolerant parser, the abstract
//! transport/HTTP/storage seams the client components are built on, and the
//! durable key-value stores used to persist the sync queue.

pub mod codec;
pub mod error;
pub mod ids;
pub mod messages;
pub mod store;
pub mod token;
pub mod transport;

// Re-export commonly used items at crate root.
pub use codec::{encode_client_frame, parse_server_frame};
pub use error::{StudyError, StudyResult};
pub use ids::{generate_id, now_millis};
pub use messages::{ClientFrame, SandboxAvailability, ServerFrame, DOCKER_SANDBOX, SIGINT};
pub use store::{DurableStore, FileStore, MemoryStore};
pub use token::{StaticToken, StoredToken, TokenSource};
pub use transport::{
    BoxFuture, Connector, DuplexChannel, HttpMethod, HttpRequest, HttpResponse, HttpTransport,
    TransportEvent,
};
