//! Nova5GC AMF (Access and Mobility Management Function)
//!
//! Daemon entry point. Startup order matters: configuration first, then the
//! SBI server bind (fatal), then the NGAP listeners, then best-effort NRF
//! registration, and finally the blocking serve loop with the termination
//! coordinator armed in front of it.

pub mod app;
pub mod callback;
pub mod config;
pub mod consumer;
pub mod context;
pub mod ngap_path;
pub mod sbi_path;
pub mod supervisor;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use crate::app::ShutdownCoordinator;
use crate::callback::StatusSubscribers;
use crate::config::AmfConfig;
use crate::consumer::NrfClient;
use crate::context::AmfContext;

/// Nova5GC AMF - Access and Mobility Management Function
#[derive(Parser, Debug)]
#[command(name = "nova5gc-amfd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "5G Core Access and Mobility Management Function")]
struct Args {
    /// AMF configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Shared cross-function configuration file path
    #[arg(long)]
    shared_config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run the AMF as a supervised child process
    #[arg(long)]
    supervise: bool,
}

fn parse_log_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(parse_log_level(&args.log_level))
        .format_timestamp_millis()
        .init();

    log::info!("Nova5GC AMF v{}", env!("CARGO_PKG_VERSION"));

    if args.supervise {
        let program = std::env::current_exe()?;
        let status = supervisor::exec(
            &program.to_string_lossy(),
            args.shared_config.as_deref(),
            args.config.as_deref(),
        )
        .await?;
        std::process::exit(status.code().unwrap_or(1));
    }

    if let Some(shared) = &args.shared_config {
        log::info!("Shared configuration: {shared}");
    }
    let config_path = args
        .config
        .as_deref()
        .unwrap_or(config::DEFAULT_CONFIG_PATH);
    log::info!("Configuration: {config_path}");

    let amf_config = AmfConfig::load(config_path)?;
    amf_config.apply_log_level();
    let ctx = AmfContext::from_config(&amf_config);

    // SBI bind and certificate load are fatal and must precede registration
    let server = sbi_path::open(&ctx).await?;
    let router = sbi_path::build_router(&ctx);
    log::info!("SBI services: {}", router.service_names().join(", "));

    let pool = ngap_path::new_peer_pool();
    let listeners = ngap_path::open(&ctx.ngap_addrs, ngap_path::NGAP_PORT, pool.clone()).await;
    if listeners.is_empty() && !ctx.ngap_addrs.is_empty() {
        log::error!("No NGAP listener could be opened");
    }

    let nrf = Arc::new(NrfClient::new(&ctx.nrf_uri)?);
    if let Err(e) = nrf.register(&ctx).await {
        log::error!("NRF registration failed, serving unregistered: {e:#}");
    }

    let subscribers = Arc::new(StatusSubscribers::new());
    let coordinator = ShutdownCoordinator::new(
        pool,
        listeners,
        nrf,
        subscribers,
        ctx.served_guami_list.clone(),
    );
    app::arm_signal_task(coordinator);

    server.serve(router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["nova5gc-amfd"]);
        assert!(args.config.is_none());
        assert!(args.shared_config.is_none());
        assert_eq!(args.log_level, "info");
        assert!(!args.supervise);
    }

    #[test]
    fn test_args_config_options() {
        let args = Args::parse_from([
            "nova5gc-amfd",
            "--shared-config",
            "config/cfg.yaml",
            "-c",
            "config/amfcfg.yaml",
        ]);
        assert_eq!(args.shared_config.as_deref(), Some("config/cfg.yaml"));
        assert_eq!(args.config.as_deref(), Some("config/amfcfg.yaml"));
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug"), log::LevelFilter::Debug);
        assert_eq!(parse_log_level("WARN"), log::LevelFilter::Warn);
        assert_eq!(parse_log_level("bogus"), log::LevelFilter::Info);
    }
}
