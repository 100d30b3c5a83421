use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::ExportError;

#[async_trait]
pub trait Exporter: Send + Sync {
    /// ブラウザ初期化
    async fn initialize(&mut self) -> Result<(), ExportError>;

    /// ログイン実行（2段階認証を含む）
    async fn login(&mut self) -> Result<(), ExportError>;

    /// 記事をPDFに出力。出力しなかった場合は `None`
    async fn export(&mut self) -> Result<Option<PathBuf>, ExportError>;

    /// リソース解放
    async fn close(&mut self) -> Result<(), ExportError>;

    /// 一括実行（initialize → login → export → close）
    async fn execute(&mut self) -> Result<Option<PathBuf>, ExportError> {
        self.initialize().await?;
        self.login().await?;
        let path = self.export().await?;
        self.close().await?;
        Ok(path)
    }
}
