//! Remote API client: wire types, HTTP transport, SSE streaming, errors.

pub mod client;
pub mod error;
pub mod stream;
pub mod types;

pub use client::{Client, JobSource, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use stream::ChunkStream;
pub use types::{AsyncJob, ChatRequest, ChatResponse, JobStatus, Message, Role};
