use std::sync::OnceLock;

use slant_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "slant-analysis-tests",
            log_dir: Some(std::env::temp_dir().join("slant-tests")),
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "debug".to_string(),
        };

        slant_common::observability::init_logging(config).unwrap_or_default()
    });
}
