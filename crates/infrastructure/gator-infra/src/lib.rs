pub mod net;

// Re-exports for convenience
pub use net::{
    default_http_client, HttpRequest, HttpResponse, ReqwestTransport, TaskCanceller, TaskError,
    TaskRequest, Transport, TransportError,
};
