use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::prompt::{CodePrompt, TerminalPrompt};
use crate::traits::Exporter;
use crate::zenn::ZennExporter;

/// エクスポート結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// 出力したPDFのパス。ヘッドレスでない場合は `None`
    pub pdf_path: Option<PathBuf>,
    pub pdf_size: u64,
}

impl ExportResult {
    pub fn skipped() -> Self {
        Self {
            pdf_path: None,
            pdf_size: 0,
        }
    }

    pub fn new(pdf_path: PathBuf) -> std::io::Result<Self> {
        let pdf_size = std::fs::metadata(&pdf_path)?.len();
        Ok(Self {
            pdf_path: Some(pdf_path),
            pdf_size,
        })
    }
}

/// tower::Serviceを実装したエクスポートサービス
#[derive(Clone)]
pub struct ExportService {
    prompt: Arc<dyn CodePrompt>,
}

impl Default for ExportService {
    fn default() -> Self {
        Self {
            prompt: Arc::new(TerminalPrompt::default()),
        }
    }
}

impl ExportService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prompt(prompt: Arc<dyn CodePrompt>) -> Self {
        Self { prompt }
    }
}

impl Service<ExportConfig> for ExportService {
    type Response = ExportResult;
    type Error = ExportError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, config: ExportConfig) -> Self::Future {
        let prompt = self.prompt.clone();

        Box::pin(async move {
            // ブラウザを起動する前に必須項目を検証
            config.validate()?;
            info!("エクスポートリクエスト受信: url={}", config.page_url);

            let mut exporter = ZennExporter::new(config).with_prompt(prompt);
            let result = match exporter.execute().await? {
                Some(path) => ExportResult::new(path)?,
                None => ExportResult::skipped(),
            };

            info!(
                "エクスポート完了: path={:?}, size={}bytes",
                result.pdf_path, result.pdf_size
            );

            Ok(result)
        })
    }
}
