//! AMF service API exposure
//!
//! Builds the SBI router from the configured service set and opens the
//! HTTP/2 server that other network functions reach this AMF on. The route
//! handlers are the boundary toward the Namf service implementations; here
//! they answer for the mount points only.

use anyhow::{Context, Result};

use nova5gc_sbi::types::service_name;
use nova5gc_sbi::{
    send_method_not_allowed, send_not_implemented, SbiRequest, SbiResponse, SbiRouter, SbiServer,
    SbiServerConfig, UriScheme,
};

use crate::context::AmfContext;

type MountFn = fn(&mut SbiRouter);

/// Mount association table: service name to mount function. Only names in
/// this table can be enabled from configuration.
const MOUNT_TABLE: &[(&str, MountFn)] = &[
    (service_name::NAMF_COMM, mount_namf_comm),
    (service_name::NAMF_EVTS, mount_namf_evts),
    (service_name::NAMF_MT, mount_namf_mt),
    (service_name::NAMF_LOC, mount_namf_loc),
];

fn mount_namf_comm(router: &mut SbiRouter) {
    router.mount(service_name::NAMF_COMM, |request: SbiRequest| async move {
        send_not_implemented(&request.header.uri)
    });
}

fn mount_namf_evts(router: &mut SbiRouter) {
    router.mount(service_name::NAMF_EVTS, |request: SbiRequest| async move {
        send_not_implemented(&request.header.uri)
    });
}

fn mount_namf_mt(router: &mut SbiRouter) {
    router.mount(service_name::NAMF_MT, |request: SbiRequest| async move {
        send_not_implemented(&request.header.uri)
    });
}

fn mount_namf_loc(router: &mut SbiRouter) {
    router.mount(service_name::NAMF_LOC, |request: SbiRequest| async move {
        send_not_implemented(&request.header.uri)
    });
}

/// The callback service accepts notification posts from peer functions.
fn mount_namf_callback(router: &mut SbiRouter) {
    router.mount(
        service_name::NAMF_CALLBACK,
        |request: SbiRequest| async move {
            if request.header.method == "POST" {
                log::debug!("Callback received on {}", request.header.uri);
                SbiResponse::no_content()
            } else {
                send_method_not_allowed(&request.header.method, &request.header.uri)
            }
        },
    );
}

/// Build the router from the enabled service set. Unknown names in the set
/// are ignored; the callback service is always mounted.
pub fn build_router(ctx: &AmfContext) -> SbiRouter {
    let mut router = SbiRouter::new();

    for name in &ctx.service_names {
        match MOUNT_TABLE.iter().find(|(n, _)| n == name) {
            Some((_, mount)) => mount(&mut router),
            None => log::warn!("Ignoring unknown service name '{name}' in configuration"),
        }
    }

    mount_namf_callback(&mut router);
    router
}

/// Open the SBI server for the context's endpoint. Bind and certificate
/// failures are fatal for the whole instance.
pub async fn open(ctx: &AmfContext) -> Result<SbiServer> {
    let addr = format!("{}:{}", ctx.sbi_ipv4, ctx.sbi_port)
        .parse()
        .with_context(|| format!("Invalid SBI address {}:{}", ctx.sbi_ipv4, ctx.sbi_port))?;

    let mut config = SbiServerConfig::new(addr);
    if ctx.uri_scheme == UriScheme::Https {
        let cert = ctx
            .sbi_cert
            .as_deref()
            .context("SBI scheme is https but no TLS certificate is configured")?;
        let key = ctx
            .sbi_key
            .as_deref()
            .context("SBI scheme is https but no TLS key is configured")?;
        config = config.with_tls(cert, key);
    }

    let server = SbiServer::open(config)
        .await
        .context("Failed to open SBI server")?;
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova5gc_sbi::SbiClient;

    fn test_context(services: &[&str]) -> AmfContext {
        let mut ctx = AmfContext::new();
        ctx.sbi_ipv4 = "127.0.0.1".to_string();
        ctx.sbi_port = 0;
        ctx.service_names = services.iter().map(|s| s.to_string()).collect();
        ctx
    }

    #[test]
    fn test_build_router_mounts_enabled_services() {
        let ctx = test_context(&["namf-comm", "namf-loc"]);
        let router = build_router(&ctx);

        assert!(router.has_service("namf-comm"));
        assert!(router.has_service("namf-loc"));
        assert!(!router.has_service("namf-evts"));
        assert!(!router.has_service("namf-mt"));
    }

    #[test]
    fn test_callback_always_mounted() {
        let ctx = test_context(&[]);
        let router = build_router(&ctx);
        assert!(router.has_service("namf-callback"));
    }

    #[test]
    fn test_unknown_service_names_ignored() {
        let ctx = test_context(&["namf-comm", "namf-bogus", "namf-evts"]);
        let router = build_router(&ctx);

        assert!(router.has_service("namf-comm"));
        assert!(router.has_service("namf-evts"));
        assert!(!router.has_service("namf-bogus"));
        assert_eq!(router.service_names().len(), 3);
    }

    #[tokio::test]
    async fn test_serve_enabled_and_callback_routes() {
        let ctx = test_context(&["namf-comm"]);
        let router = build_router(&ctx);
        let server = open(&ctx).await.unwrap();
        let addr = server.local_addr();

        tokio::spawn(async move {
            let _ = server.serve(router).await;
        });

        let client = SbiClient::with_host_port(addr.ip().to_string(), addr.port());

        let response = client.get("/namf-comm/v1/ue-contexts/1").await.unwrap();
        assert_eq!(response.status, 501);

        let response = client
            .post_json("/namf-callback/v1/amf-status", &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(response.status, 204);

        let response = client.get("/namf-callback/v1/amf-status").await.unwrap();
        assert_eq!(response.status, 405);

        let response = client.get("/namf-mt/v1/ue-contexts/1").await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_open_https_without_cert_is_fatal() {
        let mut ctx = test_context(&["namf-comm"]);
        ctx.uri_scheme = UriScheme::Https;
        assert!(open(&ctx).await.is_err());
    }
}
