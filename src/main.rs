use anyhow::Result;
use paytax_lookup::utils::logging;
use paytax_lookup::{App, Config};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::load()?;

    // Ctrl-C 触发取消
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("⏹️ 收到停止信号");
                trigger.cancel();
            }
            Err(e) => error!("无法监听停止信号: {}", e),
        }
    });

    // 初始化并运行应用
    App::initialize(config).await?.run(cancel).await?;

    Ok(())
}
