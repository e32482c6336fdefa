use anyhow::Result;
use corpus_batch_synthesis::utils::logging;
use corpus_batch_synthesis::{App, Config, RunMode};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 运行模式：第一个命令行参数或 PIPELINE_MODE，默认 full
    let mode: RunMode = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PIPELINE_MODE").ok())
        .unwrap_or_else(|| "full".to_string())
        .parse()?;

    // 初始化并运行应用
    App::new(config)?.run(mode).await?;

    Ok(())
}
