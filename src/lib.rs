//! Zenn 記事 PDF エクスポーター
//!
//! - Google ログインで Zenn にサインイン（2段階認証: 認証アプリ / SMS）
//! - 記事・本の印刷ビューにスタイルシートを適用して A4 の PDF に出力
//!
//! # 使用例
//!
//! ```rust,ignore
//! use tower::Service;
//! use zenn_pdf_exporter::{ExportConfig, ExportService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ExportConfig::from_env().unwrap();
//!
//!     let mut service = ExportService::new();
//!     let result = service.call(config).await.unwrap();
//!     println!("PDF: {:?}", result.pdf_path);
//! }
//! ```
//!
//! # 個別ステップの実行
//!
//! ```rust,ignore
//! use zenn_pdf_exporter::{ExportConfig, Exporter, ZennExporter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ExportConfig::new("me@example.com", "password", "https://zenn.dev/zenn/books/how-to-create-book/print")
//!         .with_pdf_path("book.pdf");
//!
//!     let mut exporter = ZennExporter::new(config);
//!     exporter.initialize().await.unwrap();
//!     exporter.login().await.unwrap();
//!     let path = exporter.export().await.unwrap();
//!     exporter.close().await.unwrap();
//!     println!("PDF: {:?}", path);
//! }
//! ```

pub mod config;
pub mod error;
pub mod prompt;
pub mod service;
pub mod traits;
pub mod two_factor;
pub mod wait;
pub mod zenn;

// 主要な型をリエクスポート
pub use config::ExportConfig;
pub use error::ExportError;
pub use prompt::{CodePrompt, LinePrompt, TerminalPrompt};
pub use service::{ExportResult, ExportService};
pub use traits::Exporter;
pub use two_factor::{ChallengeStep, TwoFactorMethod};
pub use zenn::ZennExporter;
