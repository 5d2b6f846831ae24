pub mod router;
pub mod transport;

pub use router::{failure_reply, Router, RouterSettings};
pub use transport::{serve_tcp, serve_udp, Handler};
