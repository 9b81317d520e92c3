pub mod config;
pub mod transport;

#[cfg(test)]
mod test_http;

pub use config::ClientConfig;
pub use transport::{Credentials, ReqwestTransport};
