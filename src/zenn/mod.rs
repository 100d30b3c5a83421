//! Zenn エクスポーターモジュール
//!
//! Google ログインで Zenn にサインインし、記事の印刷ビューを PDF に出力する

mod exporter;

pub use exporter::{is_zenn_url, pdf_params, pdf_target, ZennExporter};
