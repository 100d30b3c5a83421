use tower::Service;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use zenn_pdf_exporter::{ExportConfig, ExportError, ExportService};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("エクスポート失敗: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ExportError> {
    // 必須項目の検証はサービス側で行う
    let config = ExportConfig::from_env()?;
    info!("設定読み込み完了: {:?}", config);

    let display_path = config.export_display_path();
    let mut service = ExportService::new();
    let result = service.call(config).await?;

    match result.pdf_path {
        Some(_) => {
            println!("The article was successfully exported to PDF 🎉");
            println!("export: {}", display_path.display());
        }
        None => {
            println!("PDF export skipped (HEADLESS=false)");
        }
    }
    Ok(())
}
