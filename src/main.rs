//! Điểm vào service phân quyền mất rừng

use matrung_rbac::{
    cache::RbacCache,
    config::AppConfig,
    db,
    handlers::health,
    middleware::AppState,
    repository::{PermissionRepository, PgBoundaryLookup, RoleRepository},
    routes,
    services::{RbacService, RoleService, ScopedQueryGate},
    telemetry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== Tham số dòng lệnh =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("matrung-rbac {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Tham số không hợp lệ: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // Nạp file .env (môi trường phát triển)
    // Thứ tự ưu tiên: .env.local > .env.development > .env
    // Production đặt biến môi trường trực tiếp, không dựa vào file .env
    if let Ok(env) = std::env::var("MATRUNG_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    health::set_start_time();

    // 1. Nạp cấu hình
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. Khởi tạo log và chỉ số
    telemetry::init_telemetry(&config);
    telemetry::init_metrics();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Matrung RBAC service starting...");

    // 3. Hai pool kết nối + migration cho CSDL phân quyền
    let auth_db = db::create_pool("auth", &config.auth_database).await?;
    let gis_db = db::create_pool("gis", &config.gis_database).await?;
    db::run_migrations(&auth_db).await?;

    // 4. Seed danh mục quyền và vai trò super admin (idempotent)
    let permission_repo = PermissionRepository::new(auth_db.clone());
    permission_repo.seed_builtin().await?;
    RoleRepository::new(auth_db.clone()).ensure_super_admin().await?;

    tracing::info!("Databases initialized");

    // 5. Cache quyền + vòng quét dọn nền
    let cache = Arc::new(RbacCache::new(Duration::from_secs(config.cache.ttl_secs)));
    let _sweeper = cache.start_sweeper(Duration::from_secs(config.cache.sweep_interval_secs));

    // 6. Dựng trạng thái ứng dụng
    let boundary = Arc::new(PgBoundaryLookup::new(
        gis_db.clone(),
        Duration::from_secs(config.security.boundary_lookup_timeout_secs),
    ));

    let app_state = Arc::new(AppState {
        config: config.clone(),
        auth_db: auth_db.clone(),
        gis_db: gis_db.clone(),
        cache: cache.clone(),
        rbac_service: Arc::new(RbacService::new(auth_db.clone(), cache.clone())),
        role_service: Arc::new(RoleService::new(auth_db.clone(), cache.clone())),
        gate: Arc::new(ScopedQueryGate::new(boundary)),
    });

    // 7. Router
    let app = routes::create_router(app_state.clone());

    // 8. Khởi động server
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        "Server listening"
    );

    // 9. Tắt mềm
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Xử lý tín hiệu tắt mềm
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    // Quá hạn thì buộc dừng
    tokio::time::sleep(tokio::time::Duration::from_secs(timeout_secs)).await;
    tracing::warn!("Graceful shutdown timeout reached, forcing exit");
}

/// In hướng dẫn sử dụng
fn print_help() {
    println!("matrung-rbac {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Cách dùng: matrung-rbac [tùy chọn]");
    println!();
    println!("Tùy chọn:");
    println!("  --version     In phiên bản rồi thoát");
    println!("  --help        In hướng dẫn này rồi thoát");
    println!();
    println!("Biến môi trường:");
    println!("  Toàn bộ cấu hình qua biến môi trường với tiền tố MATRUNG_");
    println!("  Xem .env.example để biết các tùy chọn");
}
