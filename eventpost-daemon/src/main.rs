//! eventpost-daemon entry point.
//!
//! Loads configuration, wires the event relay to its source command
//! and TCP sink, and drives it until the source ends or a shutdown
//! signal arrives.

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use eventpost_core::config::EventpostConfig;
use eventpost_relay::{CommandSource, EventRelayBuilder, PipelineConfig};

use crate::cli::DaemonCli;
use crate::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let args = DaemonCli::parse();

    let mut config = EventpostConfig::from_file(&args.config)
        .await
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    // 구독자 초기화 전이므로 무시된 오버라이드 경고는 모아 두었다가
    // 초기화 후에 기록
    let override_warnings = config.apply_env_overrides();

    // CLI 오버라이드는 설정 파일과 환경 변수보다 우선
    if let Some(level) = args.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = args.log_format {
        config.general.log_format = format;
    }
    config.validate().context("invalid configuration")?;

    if args.validate {
        println!("configuration OK: {}", args.config.display());
        return Ok(());
    }

    init_tracing(&config.general)?;
    tracing::info!(config = %args.config.display(), "eventpost-daemon starting");
    for warning in &override_warnings {
        tracing::warn!("{warning}");
    }

    if !config.relay.enabled {
        tracing::warn!("relay is disabled in configuration, nothing to do");
        return Ok(());
    }

    let pipeline_config = PipelineConfig::from_core(&config.relay);
    let mut relay = EventRelayBuilder::new()
        .config(pipeline_config)
        .build()
        .context("failed to build event relay")?;

    let source = CommandSource::spawn(&config.relay.source_command, &config.relay.source_args)
        .context("failed to start source command")?;

    // Ctrl-C가 취소 토큰을 발화하면 릴레이가 협력적으로 종료됨
    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        tracing::info!("shutdown signal received");
        signal_token.cancel();
    });

    relay
        .run(source, cancel_token)
        .await
        .context("event relay failed")?;

    tracing::info!(
        lines = relay.lines_read(),
        extracted = relay.records_extracted(),
        filtered = relay.records_filtered(),
        delivered = relay.records_delivered(),
        abandoned = relay.records_abandoned(),
        parse_errors = relay.parse_errors(),
        "eventpost-daemon shut down"
    );
    Ok(())
}
