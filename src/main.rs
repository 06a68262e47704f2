use clap::Parser;
use nutriscan::utils::{logger, validation::Validate};
use nutriscan::{
    construct_router, AppError, AppState, Assessor, OnnxImageClassifier, OnnxTabularClassifier,
    ServerArgs, ServiceConfig,
};
use std::sync::Arc;

fn exit_with(e: &AppError) -> ! {
    tracing::error!(
        "❌ Startup failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    std::process::exit(1);
}

fn load_assessor(config: &ServiceConfig) -> nutriscan::Result<Assessor> {
    config.validate_models_exist()?;
    let preprocessor = config.preprocessor();
    tracing::info!(
        "🖼️ Image input {}x{} ({:?})",
        preprocessor.size(),
        preprocessor.size(),
        preprocessor.layout()
    );
    let image_model = OnnxImageClassifier::load(&config.models.image_model)?;
    let tabular_model = OnnxTabularClassifier::load(&config.models.tabular_model)?;

    Ok(Assessor::new(
        Arc::new(image_model),
        Arc::new(tabular_model),
        preprocessor,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_server_logger(args.verbose, config.logging.level.as_deref(), config.logging.json);
    tracing::info!("🚀 Starting nutriscan API");
    tracing::debug!("Effective config: {:?}", config);

    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    // 模型缺少就直接結束
    let assessor = match load_assessor(&config) {
        Ok(assessor) => assessor,
        Err(e) => exit_with(&e),
    };
    tracing::info!("✅ Models loaded successfully!");

    if !config.server.strict_status_codes {
        tracing::info!("Failed predictions are answered with HTTP 200 and status \"error\"");
    }

    let state = Arc::new(AppState::new(assessor, config.server.strict_status_codes));
    let app = construct_router(state, config.max_upload_bytes());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("📡 Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
