use std::net::SocketAddr;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use boilerplate_api::{config::Config, router::create_router, state::AppState};

const FALLBACK_LOG_LEVEL: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env があれば読み込む（既に設定済みの環境変数が優先）
    let dotenv = dotenvy::dotenv();

    let config = Config::load();

    // ログ初期化（JSON形式、RUST_LOG があればそちらを優先）
    let level = config
        .as_ref()
        .map(|c| c.logger.level.as_str())
        .unwrap_or(FALLBACK_LOG_LEVEL);
    init_tracing(level);

    if let Err(e) = &dotenv
        && !e.not_found()
    {
        tracing::warn!(error = %e, ".env の読み込みに失敗");
    }

    let config = config.map_err(|e| {
        tracing::error!(error = %e, "設定の読み込みに失敗");
        anyhow::anyhow!("Failed to load config: {}", e)
    })?;

    tracing::info!(
        app = %config.app.name,
        version = %config.app.version,
        env = %config.app.env,
        "起動中..."
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            tracing::error!(error = ?e, "アドレスのパースに失敗");
            anyhow::anyhow!("Failed to parse address: {}", e)
        })?;

    // データベース接続プール作成
    let connect_options = config.database.connect_options().map_err(|e| {
        tracing::error!(error = %e, "データベース設定が不正");
        anyhow::anyhow!("Invalid database config: {}", e)
    })?;

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "データベース接続に失敗");
            anyhow::anyhow!("Failed to connect to database: {}", e)
        })?;

    tracing::info!(
        host = %config.database.host,
        dbname = %config.database.dbname,
        "データベース接続完了"
    );

    let state = AppState::with_pool(db_pool.clone(), config.app.clone());
    let app = create_router(state, &config.server);

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(error = ?e, addr = %addr, "ポートのバインドに失敗");
        anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
    })?;

    tracing::info!(addr = %addr, "サーバー起動");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "サーバーエラー");
            anyhow::anyhow!("Server error: {}", e)
        })?;

    db_pool.close().await;
    tracing::info!("サーバー終了");

    Ok(())
}

fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(FALLBACK_LOG_LEVEL))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Graceful shutdown シグナル待機
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "Ctrl+C ハンドラーのインストールに失敗");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "SIGTERM ハンドラーのインストールに失敗");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C 受信、シャットダウン開始");
        }
        _ = terminate => {
            tracing::info!("SIGTERM 受信、シャットダウン開始");
        }
    }
}
