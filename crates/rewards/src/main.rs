use anyhow::{Context, Result};
use clap::Parser;
use server::app::ApplicationServer;
use std::sync::Arc;
use tracing::info;
use utils::{AppConfig, EnvLoader, Logger};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // 根据 CARGO_ENV 加载对应的环境配置文件
    EnvLoader::load_env_file().ok();
    let config = Arc::new(AppConfig::parse());

    // guard 需要存活到进程结束，否则文件日志会丢失
    let _guard = Logger::new(config.cargo_env);
    info!("🔧 rewards backend starting ({:?})", config.cargo_env);

    ApplicationServer::serve(config)
        .await
        .context("🔴 Failed to start server")?;

    Ok(())
}
