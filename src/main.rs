use anyhow::Result;
use ats_autofill::utils::logging;
use ats_autofill::{App, CancelFlag, Config};
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    // Ctrl+C 在字段边界处停止当前会话
    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ 收到 Ctrl+C，正在停止...");
            signal_flag.cancel();
        }
    });

    // 初始化并运行应用
    App::initialize(config, cancel).await?.run().await?;

    Ok(())
}
