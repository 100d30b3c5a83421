use zenn_pdf_exporter::{ExportConfig, Exporter, ZennExporter};

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    dotenvy::dotenv().ok();

    // 環境変数から認証情報を取得
    let config = ExportConfig::from_env()
        .expect("Failed to read environment")
        .with_headless(false); // デバッグ用に表示モード（PDF出力はスキップされる）
    config
        .validate()
        .expect("GOOGLE_EMAIL / GOOGLE_PASSWORD / ZENN_PAGE_URL not set");

    let mut exporter = ZennExporter::new(config);

    println!("=== Zenn Export Test (headful) ===");

    match exporter.execute().await {
        Ok(Some(path)) => println!("成功! PDF保存先: {:?}", path),
        Ok(None) => println!("成功! ログインと記事表示まで完了（PDF出力なし）"),
        Err(e) => eprintln!("エラー: {}", e),
    }
}
