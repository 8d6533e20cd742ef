mod connection;
mod headless;

use anyhow::Result;
use chromiumoxide::Browser;

use crate::config::Config;

pub use connection::connect_to_browser;
pub use headless::launch_browser;

/// 设置了调试端口就连接已有浏览器，否则自行启动
pub async fn open_browser(config: &Config) -> Result<Browser> {
    match config.browser_debug_port {
        Some(port) => connect_to_browser(port).await,
        None => launch_browser(config.headless, config.chrome_executable.as_deref()).await,
    }
}
