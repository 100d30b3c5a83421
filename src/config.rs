use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ExportError;
use crate::two_factor::TwoFactorMethod;

pub const ENV_EMAIL: &str = "GOOGLE_EMAIL";
pub const ENV_PASSWORD: &str = "GOOGLE_PASSWORD";
pub const ENV_PAGE_URL: &str = "ZENN_PAGE_URL";
pub const ENV_PDF_PATH: &str = "PDF_PATH";
pub const ENV_TWO_FA: &str = "IS_TWO_FA";
pub const ENV_TWO_FA_TOOL: &str = "TWO_FA_TOOL";
pub const ENV_HEADLESS: &str = "HEADLESS";
pub const ENV_CSS_PATH: &str = "PDF_CSS_PATH";
pub const ENV_CHROME_PATH: &str = "CHROME_PATH";
pub const ENV_TIMEOUT_SECS: &str = "WAIT_TIMEOUT_SECS";
pub const ENV_DEBUG: &str = "SCRAPER_DEBUG";

#[derive(Clone)]
pub struct ExportConfig {
    pub email: String,
    pub password: String,
    /// 例: https://zenn.dev/zenn/books/how-to-create-book/print
    pub page_url: String,
    pub pdf_path: PathBuf,
    /// `None` なら2段階認証を行わない
    pub two_factor: Option<TwoFactorMethod>,
    pub headless: bool,
    pub stylesheet_path: PathBuf,
    pub chrome_path: Option<PathBuf>,
    /// セレクタ待機などのタイムアウト
    pub timeout: Duration,
    pub debug: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            page_url: String::new(),
            pdf_path: PathBuf::from("prod.pdf"),
            two_factor: Some(TwoFactorMethod::App),
            headless: true,
            stylesheet_path: PathBuf::from("zenn_pdf.css"),
            chrome_path: None,
            timeout: Duration::from_secs(30),
            debug: false,
        }
    }
}

// パスワードをログに出さない
impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("email", &self.email)
            .field("password", &"********")
            .field("page_url", &self.page_url)
            .field("pdf_path", &self.pdf_path)
            .field("two_factor", &self.two_factor)
            .field("headless", &self.headless)
            .field("stylesheet_path", &self.stylesheet_path)
            .field("chrome_path", &self.chrome_path)
            .field("timeout", &self.timeout)
            .field("debug", &self.debug)
            .finish()
    }
}

impl ExportConfig {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        page_url: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            page_url: page_url.into(),
            ..Default::default()
        }
    }

    /// プロセスの環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ExportError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を読み込む
    ///
    /// 空文字の値は未設定として扱う。必須項目の検証は [`ExportConfig::validate`] で行う。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ExportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::new(
            get(ENV_EMAIL).unwrap_or_default(),
            get(ENV_PASSWORD).unwrap_or_default(),
            get(ENV_PAGE_URL).unwrap_or_default(),
        );

        if let Some(path) = get(ENV_PDF_PATH) {
            config.pdf_path = PathBuf::from(path);
        }

        let two_factor_enabled = match get(ENV_TWO_FA) {
            Some(v) => parse_bool(ENV_TWO_FA, &v)?,
            None => true,
        };
        config.two_factor = if two_factor_enabled {
            let method = match get(ENV_TWO_FA_TOOL) {
                Some(v) => v.parse()?,
                None => TwoFactorMethod::default(),
            };
            Some(method)
        } else {
            None
        };

        if let Some(v) = get(ENV_HEADLESS) {
            config.headless = parse_bool(ENV_HEADLESS, &v)?;
        }
        if let Some(path) = get(ENV_CSS_PATH) {
            config.stylesheet_path = PathBuf::from(path);
        }
        config.chrome_path = get(ENV_CHROME_PATH).map(PathBuf::from);
        if let Some(v) = get(ENV_TIMEOUT_SECS) {
            let secs: u64 = v.parse().map_err(|_| {
                ExportError::Config(format!("{} は秒数で指定してください: {:?}", ENV_TIMEOUT_SECS, v))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(v) = get(ENV_DEBUG) {
            config.debug = parse_bool(ENV_DEBUG, &v)?;
        }

        Ok(config)
    }

    /// 必須項目の検証。ブラウザ操作の前に呼ぶこと
    pub fn validate(&self) -> Result<(), ExportError> {
        let missing: Vec<&str> = [
            (ENV_EMAIL, &self.email),
            (ENV_PASSWORD, &self.password),
            (ENV_PAGE_URL, &self.page_url),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect();

        if !missing.is_empty() {
            return Err(ExportError::Config(format!(
                "次の環境変数を設定してください: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// PDF出力はヘッドレス時のみ行う
    pub fn pdf_export_enabled(&self) -> bool {
        self.headless
    }

    /// 出力先の表示用パス（相対パスならカレントディレクトリからのパス）
    pub fn export_display_path(&self) -> PathBuf {
        if self.pdf_path.is_absolute() {
            return self.pdf_path.clone();
        }
        std::env::current_dir()
            .map(|dir| dir.join(&self.pdf_path))
            .unwrap_or_else(|_| self.pdf_path.clone())
    }

    pub fn with_pdf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.pdf_path = path.into();
        self
    }

    pub fn with_two_factor(mut self, method: Option<TwoFactorMethod>) -> Self {
        self.two_factor = method;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_stylesheet_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.stylesheet_path = path.into();
        self
    }

    pub fn with_chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ExportError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ExportError::Config(format!(
            "{} は true/false で指定してください: {:?}",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        (ENV_EMAIL, "user@example.com"),
        (ENV_PASSWORD, "secret"),
        (ENV_PAGE_URL, "https://zenn.dev/zenn/books/how-to-create-book/print"),
    ];

    #[test]
    fn test_defaults() {
        let config = ExportConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.pdf_path, PathBuf::from("prod.pdf"));
        assert_eq!(config.two_factor, Some(TwoFactorMethod::App));
        assert!(config.headless);
        assert_eq!(config.stylesheet_path, PathBuf::from("zenn_pdf.css"));
        assert_eq!(config.chrome_path, None);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.debug);
    }

    #[test]
    fn test_every_missing_combination_fails_validation() {
        // 必須3項目のうち1つ以上が欠けている全7パターン
        for mask in 0u8..7 {
            let pairs: Vec<(&str, &str)> = REQUIRED
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, pair)| *pair)
                .collect();

            let config = ExportConfig::from_lookup(lookup_from(&pairs)).unwrap();
            let message = match config.validate().unwrap_err() {
                ExportError::Config(message) => message,
                other => panic!("unexpected error: {other:?}"),
            };
            for (i, (key, _)) in REQUIRED.iter().enumerate() {
                assert_eq!(message.contains(key), mask & (1 << i) == 0, "mask={mask}");
            }
        }
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let config = ExportConfig::new("  ", "secret", "https://zenn.dev/a/print");
        assert!(config.validate().is_err());

        let config =
            ExportConfig::from_lookup(lookup_from(&[(ENV_EMAIL, ""), (ENV_PASSWORD, "x")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_from_env() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            (ENV_PDF_PATH, "out/book.pdf"),
            (ENV_TWO_FA_TOOL, "sms"),
            (ENV_HEADLESS, "false"),
            (ENV_CSS_PATH, "styles/print.css"),
            (ENV_CHROME_PATH, "/usr/bin/chromium"),
            (ENV_TIMEOUT_SECS, "90"),
            (ENV_DEBUG, "1"),
        ]);
        let config = ExportConfig::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.pdf_path, PathBuf::from("out/book.pdf"));
        assert_eq!(config.two_factor, Some(TwoFactorMethod::Sms));
        assert!(!config.headless);
        assert_eq!(config.stylesheet_path, PathBuf::from("styles/print.css"));
        assert_eq!(config.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(config.timeout, Duration::from_secs(90));
        assert!(config.debug);
    }

    #[test]
    fn test_two_factor_disabled_ignores_tool() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([(ENV_TWO_FA, "false"), (ENV_TWO_FA_TOOL, "EMAIL")]);
        let config = ExportConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.two_factor, None);
    }

    #[test]
    fn test_unknown_two_factor_tool_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((ENV_TWO_FA_TOOL, "EMAIL"));
        let err = ExportConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((ENV_HEADLESS, "maybe"));
        assert!(ExportConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn test_pdf_path_is_configured_path() {
        let config = ExportConfig::new("a", "b", "c").with_pdf_path("/tmp/article.pdf");
        assert_eq!(config.pdf_path, PathBuf::from("/tmp/article.pdf"));
        assert_eq!(config.export_display_path(), PathBuf::from("/tmp/article.pdf"));

        let config = ExportConfig::new("a", "b", "c").with_pdf_path("article.pdf");
        let shown = config.export_display_path();
        assert!(shown.is_absolute());
        assert!(shown.ends_with("article.pdf"));
    }

    #[test]
    fn test_headless_gates_pdf_export() {
        let config = ExportConfig::new("a", "b", "c");
        assert!(config.pdf_export_enabled());
        assert!(!config.with_headless(false).pdf_export_enabled());
    }

    #[test]
    fn test_debug_hides_password() {
        let config = ExportConfig::new("user", "hunter2", "url");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("user"));
    }

    #[test]
    fn test_config_builder() {
        let config = ExportConfig::new("user", "pass", "https://zenn.dev/a/print")
            .with_two_factor(None)
            .with_stylesheet_path("custom.css")
            .with_chrome_path("/opt/chrome")
            .with_timeout(Duration::from_secs(120))
            .with_debug(true);

        assert_eq!(config.email, "user");
        assert_eq!(config.password, "pass");
        assert_eq!(config.two_factor, None);
        assert_eq!(config.stylesheet_path, PathBuf::from("custom.css"));
        assert_eq!(config.chrome_path, Some(PathBuf::from("/opt/chrome")));
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.debug);
    }
}
