//! SBI HTTP/2 server
//!
//! HTTP/2 server built on hyper, serving a network function's SBI endpoints.
//! TLS is terminated with rustls when the configuration carries a
//! certificate/key pair. Requests are dispatched to mounted service groups
//! through an [`SbiRouter`] keyed by the first URI path segment.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http2;
use hyper::service::Service;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use crate::error::{SbiError, SbiResult};
use crate::message::{ProblemDetails, SbiHeader, SbiHttpMessage, SbiRequest, SbiResponse};
use crate::tls;
use crate::types::UriScheme;

/// Server configuration
#[derive(Debug, Clone)]
pub struct SbiServerConfig {
    /// Bind address
    pub addr: SocketAddr,
    /// URI scheme; Https requires a certificate/key pair
    pub scheme: UriScheme,
    /// TLS certificate path
    pub cert: Option<String>,
    /// TLS private key path
    pub private_key: Option<String>,
}

impl SbiServerConfig {
    /// Create a new plaintext server configuration
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            scheme: UriScheme::Http,
            cert: None,
            private_key: None,
        }
    }

    /// Enable HTTPS with a certificate/key pair
    pub fn with_tls(mut self, cert: impl Into<String>, private_key: impl Into<String>) -> Self {
        self.scheme = UriScheme::Https;
        self.cert = Some(cert.into());
        self.private_key = Some(private_key.into());
        self
    }
}

/// Request handler trait
pub trait SbiRequestHandler: Send + Sync + 'static {
    /// Handle an incoming SBI request
    fn handle(&self, request: SbiRequest) -> Pin<Box<dyn Future<Output = SbiResponse> + Send>>;
}

/// Function-based request handler
impl<F, Fut> SbiRequestHandler for F
where
    F: Fn(SbiRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SbiResponse> + Send + 'static,
{
    fn handle(&self, request: SbiRequest) -> Pin<Box<dyn Future<Output = SbiResponse> + Send>> {
        Box::pin(self(request))
    }
}

/// Service router dispatching requests to mounted service groups.
///
/// Each mounted entry owns one SBI service name (the first URI path segment,
/// e.g. `namf-comm`). Requests for a service with no mounted group get a 404
/// ProblemDetails response.
#[derive(Default)]
pub struct SbiRouter {
    routes: Vec<(String, Arc<dyn SbiRequestHandler>)>,
}

impl SbiRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a handler for a service name. A duplicate mount for the same
    /// name is ignored; the first mount wins.
    pub fn mount<H: SbiRequestHandler>(&mut self, service: impl Into<String>, handler: H) {
        let service = service.into();
        if self.has_service(&service) {
            log::warn!("Service {service} already mounted, ignoring duplicate");
            return;
        }
        self.routes.push((service, Arc::new(handler)));
    }

    /// Check whether a service name is mounted
    pub fn has_service(&self, service: &str) -> bool {
        self.routes.iter().any(|(name, _)| name == service)
    }

    /// Mounted service names, in mount order
    pub fn service_names(&self) -> Vec<&str> {
        self.routes.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Dispatch a request to the mounted handler for its service name
    pub async fn dispatch(&self, request: SbiRequest) -> SbiResponse {
        let service = request.service_name().to_string();
        match self.routes.iter().find(|(name, _)| *name == service) {
            Some((_, handler)) => handler.handle(request).await,
            None => send_not_found(&format!("No such service: {service}"), None),
        }
    }
}

impl SbiRequestHandler for SbiRouter {
    fn handle(&self, request: SbiRequest) -> Pin<Box<dyn Future<Output = SbiResponse> + Send>> {
        let service = request.service_name().to_string();
        let handler = self
            .routes
            .iter()
            .find(|(name, _)| *name == service)
            .map(|(_, h)| Arc::clone(h));
        Box::pin(async move {
            match handler {
                Some(h) => h.handle(request).await,
                None => send_not_found(&format!("No such service: {service}"), None),
            }
        })
    }
}

/// Hyper service wrapper
struct SbiService<H: SbiRequestHandler> {
    handler: Arc<H>,
}

impl<H: SbiRequestHandler> Clone for SbiService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<H: SbiRequestHandler> Service<Request<Incoming>> for SbiService<H> {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let handler = self.handler.clone();

        Box::pin(async move {
            let sbi_request = convert_request(req).await;
            let sbi_response = handler.handle(sbi_request).await;
            Ok(convert_response(sbi_response))
        })
    }
}

/// Convert a hyper request to SbiRequest
async fn convert_request(req: Request<Incoming>) -> SbiRequest {
    let method = req.method().to_string();
    // HTTP/2 requests arrive in absolute form; route on the path only
    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut http = SbiHttpMessage::new();
    for (key, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            http.set_header(key.to_string(), v.to_string());
        }
    }

    if let Some(query) = req.uri().query() {
        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                http.set_param(key.to_string(), value.to_string());
            }
        }
    }

    if let Ok(body) = req.into_body().collect().await {
        let bytes = body.to_bytes();
        if !bytes.is_empty() {
            http.set_content(String::from_utf8_lossy(&bytes).to_string());
        }
    }

    SbiRequest {
        header: SbiHeader::with_method_uri(method, uri),
        http,
    }
}

/// Convert an SbiResponse to a hyper response
fn convert_response(sbi_response: SbiResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(sbi_response.status);

    for (key, value) in &sbi_response.http.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    let body = sbi_response
        .http
        .content
        .map(|c| Full::new(Bytes::from(c)))
        .unwrap_or_else(|| Full::new(Bytes::new()));

    builder.body(body).unwrap_or_else(|_| {
        Response::builder()
            .status(500)
            .body(Full::new(Bytes::from("Internal Server Error")))
            .unwrap()
    })
}

/// SBI server - HTTP/2 server for a network function's service API
pub struct SbiServer {
    config: SbiServerConfig,
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
    local_addr: SocketAddr,
}

impl SbiServer {
    /// Bind the listener and load TLS material.
    ///
    /// Both the bind and the certificate load are fatal here: the service
    /// API is the function's externally reachable surface, so a server that
    /// cannot come up correctly must abort startup.
    pub async fn open(config: SbiServerConfig) -> SbiResult<Self> {
        let acceptor = if config.scheme == UriScheme::Https {
            let cert_path = config
                .cert
                .as_deref()
                .ok_or_else(|| SbiError::TlsError("HTTPS scheme without certificate".into()))?;
            let key_path = config
                .private_key
                .as_deref()
                .ok_or_else(|| SbiError::TlsError("HTTPS scheme without private key".into()))?;

            let certs = tls::load_certs(cert_path)?;
            let key = tls::load_private_key(key_path)?;
            let server_config = tls::build_server_config(certs, key)?;
            Some(TlsAcceptor::from(Arc::new(server_config)))
        } else {
            None
        };

        let listener = TcpListener::bind(config.addr)
            .await
            .map_err(|e| SbiError::ServerError(format!("Failed to bind {}: {e}", config.addr)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| SbiError::ServerError(e.to_string()))?;

        log::info!(
            "SBI server listening on {}://{local_addr}",
            config.scheme
        );

        Ok(Self {
            config,
            listener,
            acceptor,
            local_addr,
        })
    }

    /// The bound local address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The server configuration
    pub fn config(&self) -> &SbiServerConfig {
        &self.config
    }

    /// Serve requests with the given handler.
    ///
    /// Blocks the calling task until the listener errors; run this as the
    /// final step after every other component has started.
    pub async fn serve<H: SbiRequestHandler>(self, handler: H) -> SbiResult<()> {
        let handler = Arc::new(handler);

        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(|e| SbiError::ServerError(format!("Accept error: {e}")))?;

            log::trace!("SBI connection from {peer}");

            let service = SbiService {
                handler: handler.clone(),
            };
            let acceptor = self.acceptor.clone();

            tokio::spawn(async move {
                match acceptor {
                    Some(acceptor) => {
                        let tls_stream = match acceptor.accept(stream).await {
                            Ok(s) => s,
                            Err(e) => {
                                log::warn!("TLS handshake with {peer} failed: {e}");
                                return;
                            }
                        };
                        if let Err(e) =
                            http2::Builder::new(hyper_util::rt::TokioExecutor::new())
                                .serve_connection(TokioIo::new(tls_stream), service)
                                .await
                        {
                            log::debug!("HTTP/2 connection from {peer} ended: {e}");
                        }
                    }
                    None => {
                        if let Err(e) =
                            http2::Builder::new(hyper_util::rt::TokioExecutor::new())
                                .serve_connection(TokioIo::new(stream), service)
                                .await
                        {
                            log::debug!("HTTP/2 connection from {peer} ended: {e}");
                        }
                    }
                }
            });
        }
    }
}

/// Build a ProblemDetails error response
pub fn send_error(status: u16, title: &str, detail: &str, cause: Option<&str>) -> SbiResponse {
    let problem = ProblemDetails::with_status(status as i32)
        .with_title(title)
        .with_detail(detail);

    let problem = if let Some(c) = cause {
        problem.with_cause(c)
    } else {
        problem
    };

    SbiResponse::with_status(status)
        .with_json_body(&problem)
        .unwrap_or_else(|_| SbiResponse::with_status(status))
}

/// 404 Not Found
pub fn send_not_found(detail: &str, cause: Option<&str>) -> SbiResponse {
    send_error(404, "Not Found", detail, cause)
}

/// 405 Method Not Allowed
pub fn send_method_not_allowed(method: &str, resource: &str) -> SbiResponse {
    send_error(
        405,
        "Method Not Allowed",
        &format!("Method {method} not allowed for resource {resource}"),
        Some("METHOD_NOT_ALLOWED"),
    )
}

/// 501 Not Implemented
pub fn send_not_implemented(resource: &str) -> SbiResponse {
    send_error(
        501,
        "Not Implemented",
        &format!("Operation on {resource} is not implemented"),
        Some("NOT_IMPLEMENTED"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SbiClient;

    async fn stub_ok(_request: SbiRequest) -> SbiResponse {
        SbiResponse::no_content()
    }

    #[test]
    fn test_router_mount_and_lookup() {
        let mut router = SbiRouter::new();
        router.mount("namf-comm", stub_ok);
        router.mount("namf-evts", stub_ok);
        router.mount("namf-comm", stub_ok);

        assert!(router.has_service("namf-comm"));
        assert!(!router.has_service("namf-mt"));
        assert_eq!(router.service_names(), vec!["namf-comm", "namf-evts"]);
    }

    #[tokio::test]
    async fn test_router_dispatch_unknown_service() {
        let router = SbiRouter::new();
        let response = router.dispatch(SbiRequest::get("/nowhere/v1/x")).await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_server_round_trip() {
        let mut router = SbiRouter::new();
        router.mount("namf-comm", stub_ok);

        let config = SbiServerConfig::new("127.0.0.1:0".parse().unwrap());
        let server = SbiServer::open(config).await.unwrap();
        let addr = server.local_addr();

        tokio::spawn(async move {
            let _ = server.serve(router).await;
        });

        let client = SbiClient::with_host_port(addr.ip().to_string(), addr.port());

        let response = client.get("/namf-comm/v1/ue-contexts").await.unwrap();
        assert_eq!(response.status, 204);

        let response = client.get("/namf-mt/v1/ue-contexts").await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_open_https_without_cert_fails() {
        let mut config = SbiServerConfig::new("127.0.0.1:0".parse().unwrap());
        config.scheme = UriScheme::Https;
        assert!(SbiServer::open(config).await.is_err());
    }

    #[test]
    fn test_send_error_helpers() {
        assert_eq!(send_not_found("x", None).status, 404);
        assert_eq!(send_not_implemented("ue-contexts").status, 501);
        assert_eq!(send_method_not_allowed("TRACE", "/x").status, 405);
    }
}
