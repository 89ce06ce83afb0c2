//! Nova5GC SBI (Service Based Interface) Library
//!
//! HTTP/2 SBI operations for 5G core network functions, built on hyper and
//! rustls. Provides the client used for NRF registration traffic, the server
//! that exposes a network function's service API, and the shared 3GPP data
//! model types (PLMN ID, TAI, GUAMI, S-NSSAI, ProblemDetails).
//!
//! # Modules
//!
//! - [`types`] - URI schemes, NF types, service name constants
//! - [`message`] - SBI message structures and 3GPP model types
//! - [`client`] - HTTP/2 client implementation
//! - [`server`] - HTTP/2 server with TLS termination and service routing
//! - [`tls`] - TLS configuration and certificate loading
//! - [`error`] - Error types

pub mod client;
pub mod error;
pub mod message;
pub mod server;
pub mod tls;
pub mod types;

// Re-export commonly used types
pub use client::{SbiClient, SbiClientConfig};
pub use error::{SbiError, SbiResult};
pub use message::{
    Guami, InvalidParam, NetworkName, PlmnId, ProblemDetails, SNssai, SbiHeader, SbiHttpMessage,
    SbiRequest, SbiResponse, Tai,
};
pub use server::{
    send_error, send_method_not_allowed, send_not_found, send_not_implemented, SbiRequestHandler,
    SbiRouter, SbiServer, SbiServerConfig,
};
pub use types::{NfStatus, NfType, UriScheme};
