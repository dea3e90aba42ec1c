//! Hệ thống log và tracing
//! Khởi tạo log có cấu trúc và thu thập chỉ số

use crate::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Khởi tạo log và tracing
pub fn init_telemetry(config: &AppConfig) {
    // Xây filter từ biến môi trường, mặc định theo cấu hình
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // Chọn định dạng log theo cấu hình
    let log_layer = match config.logging.format.to_lowercase().as_str() {
        "json" => {
            // JSON cho môi trường production
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
                .boxed()
        }
        "pretty" => {
            // Định dạng đẹp cho môi trường phát triển
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(false)
                .boxed()
        }
        _ => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.logging.level,
        format = %config.logging.format,
        "Telemetry initialized"
    );
}

/// Khởi tạo thu thập chỉ số
pub fn init_metrics() {
    // metrics 0.24 tự tạo chỉ số khi dùng lần đầu
    tracing::debug!("Metrics initialized");
}
