use env_logger::Env;
use log::debug;

/// 初始化日誌，預設等級 info，可用 `RUST_LOG` 覆寫
pub fn init() {
    let result = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .try_init();

    // 已有其他 logger（例如測試重複初始化）時沿用既有的
    if let Err(e) = result {
        debug!("日誌已初始化，略過: {e}");
    }
}
