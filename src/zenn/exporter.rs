use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::prompt::{self, CodePrompt, TerminalPrompt};
use crate::traits::Exporter;
use crate::two_factor::{self, ChallengeStep, TwoFactorMethod};
use crate::wait;

const ZENN_ENTER_URL: &str = "https://zenn.dev/enter";
const ZENN_HOST: &str = "zenn.dev";

const LOGIN_BUTTON_SELECTOR: &str = "button.enter-login-btn";
const EMAIL_INPUT_SELECTOR: &str = "#identifierId";
const PASSWORD_INPUT_SELECTOR: &str = "input[type=\"password\"]";
const ZENN_ROOT_SELECTOR: &str = "#__next";

/// A4 用紙サイズ（インチ）
const A4_WIDTH_INCH: f64 = 8.27;
const A4_HEIGHT_INCH: f64 = 11.7;

pub struct ZennExporter {
    config: ExportConfig,
    prompt: Arc<dyn CodePrompt>,
    browser: Option<Browser>,
    page: Option<Arc<Page>>,
}

impl ZennExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            prompt: Arc::new(TerminalPrompt::default()),
            browser: None,
            page: None,
        }
    }

    /// 確認コードの入力元を差し替える
    pub fn with_prompt(mut self, prompt: Arc<dyn CodePrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    fn get_page(&self) -> Result<&Arc<Page>, ExportError> {
        self.page
            .as_ref()
            .ok_or_else(|| ExportError::BrowserInit("ブラウザが初期化されていません".into()))
    }

    /// 起動時に開かれる空タブなど、操作対象以外のタブを閉じる
    async fn close_other_tabs(browser: &Browser, page: &Page) {
        match browser.pages().await {
            Ok(pages) => {
                for other in pages {
                    if other.target_id() == page.target_id() {
                        continue;
                    }
                    if let Err(e) = other.close().await {
                        debug!("タブを閉じられませんでした: {}", e);
                    }
                }
            }
            Err(e) => debug!("タブ一覧の取得に失敗: {}", e),
        }
    }

    /// ヘッドレス版のUser-Agentを通常版に見せかける
    async fn mask_headless_user_agent(browser: &Browser, page: &Page) -> Result<(), ExportError> {
        let user_agent = browser
            .version()
            .await
            .map_err(|e| ExportError::BrowserInit(format!("User-Agent取得エラー: {}", e)))?
            .user_agent;
        let masked = strip_headless_marker(&user_agent);
        if masked != user_agent {
            page.execute(SetUserAgentOverrideParams::new(masked))
                .await
                .map_err(|e| ExportError::BrowserInit(format!("User-Agent設定エラー: {}", e)))?;
            debug!("User-Agentを上書きしました");
        }
        Ok(())
    }

    /// パスワード送信後の2段階認証
    async fn submit_two_factor(
        &self,
        page: &Page,
        method: TwoFactorMethod,
    ) -> Result<(), ExportError> {
        info!("2段階認証 ({}) を処理中...", method);

        let url = wait::wait_for_url(
            page,
            |url| two_factor::is_second_factor_page(url) || is_zenn_url(url),
            self.config.timeout,
        )
        .await?;

        if is_zenn_url(&url) {
            info!("2段階認証は要求されませんでした");
            return Ok(());
        }

        match two_factor::plan(method, &url) {
            ChallengeStep::AlreadyPresented => {
                debug!("{} の確認画面が表示済み: {}", method, url);
            }
            ChallengeStep::SelectFromList => {
                self.select_method(page, method).await?;
            }
            ChallengeStep::SwitchMethod => {
                debug!("別の確認方法が表示されているため切り替えます: {}", url);
                self.click_try_another_way(page).await?;
                self.select_method(page, method).await?;
            }
        }

        let code = prompt::read_code(self.prompt.as_ref()).await?;
        info!("Finishing up...");

        let input = wait::wait_for_selector(page, two_factor::CODE_INPUT_SELECTOR, self.config.timeout)
            .await?;
        input
            .click()
            .await
            .map_err(|e| ExportError::TwoFactor(format!("確認コード入力欄クリック: {}", e)))?;
        sleep(Duration::from_millis(1000)).await;

        input
            .type_str(&code)
            .await
            .map_err(|e| ExportError::TwoFactor(format!("確認コード入力: {}", e)))?;
        sleep(Duration::from_millis(1000)).await;

        input
            .press_key("Enter")
            .await
            .map_err(|e| ExportError::TwoFactor(format!("確認コード送信: {}", e)))?;

        info!("確認コード送信完了");
        Ok(())
    }

    /// 方式選択一覧から対象の方式を選ぶ
    async fn select_method(&self, page: &Page, method: TwoFactorMethod) -> Result<(), ExportError> {
        let option = wait::wait_for_selector(page, method.selector(), self.config.timeout).await?;
        sleep(Duration::from_millis(500)).await;

        option
            .focus()
            .await
            .map_err(|e| ExportError::TwoFactor(format!("{} 選択: {}", method, e)))?
            .press_key("Enter")
            .await
            .map_err(|e| ExportError::TwoFactor(format!("{} 選択: {}", method, e)))?;

        debug!("{} を選択しました", method);
        Ok(())
    }

    /// 「別の方法を試す」をクリック
    async fn click_try_another_way(&self, page: &Page) -> Result<(), ExportError> {
        let labels = serde_json::to_string(&two_factor::TRY_ANOTHER_WAY_LABELS)
            .map_err(|e| ExportError::JavaScript(e.to_string()))?;
        let script = format!(
            r#"
            (function(labels) {{
                var candidates = document.querySelectorAll('button, [role="button"], [role="link"], a');
                for (var i = 0; i < candidates.length; i++) {{
                    var text = (candidates[i].textContent || '').trim();
                    for (var j = 0; j < labels.length; j++) {{
                        if (text.indexOf(labels[j]) >= 0) {{
                            candidates[i].click();
                            return true;
                        }}
                    }}
                }}
                return false;
            }})({})
            "#,
            labels
        );

        let clicked: bool = page
            .evaluate(script.as_str())
            .await
            .map_err(|e| ExportError::JavaScript(e.to_string()))?
            .into_value()
            .unwrap_or(false);

        if !clicked {
            return Err(ExportError::ElementNotFound(
                "「別の方法を試す」ボタンが見つかりません".into(),
            ));
        }

        sleep(Duration::from_secs(2)).await;
        Ok(())
    }

    /// ログイン後、Zenn のトップページに戻るまで待機
    async fn wait_for_zenn_home(&self, page: &Page) -> Result<(), ExportError> {
        info!("Zennへのリダイレクトを待機中...");
        let url = wait::wait_for_url(page, is_zenn_url, self.config.timeout).await?;
        debug!("リダイレクト先: {}", url);

        wait::wait_for_selector(page, ZENN_ROOT_SELECTOR, self.config.timeout).await?;
        sleep(Duration::from_secs(2)).await;
        Ok(())
    }

    async fn debug_screenshot(&self, page: &Page, label: &str) {
        if !self.config.debug {
            return;
        }
        match page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(screenshot) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
                debug!("{} screenshot: data:image/png;base64,{}", label, encoded);
            }
            Err(e) => debug!("スクリーンショット取得失敗: {}", e),
        }
    }

    /// スタイルシートを <style> 要素として追加
    async fn inject_stylesheet(&self, page: &Page) -> Result<(), ExportError> {
        let css = tokio::fs::read_to_string(&self.config.stylesheet_path).await?;
        let script = stylesheet_script(&css)?;

        let injected: bool = page
            .evaluate(script.as_str())
            .await
            .map_err(|e| ExportError::JavaScript(e.to_string()))?
            .into_value()
            .unwrap_or(false);

        if !injected {
            return Err(ExportError::JavaScript(
                "スタイルシートを追加できませんでした".into(),
            ));
        }
        debug!("スタイルシート追加: {:?}", self.config.stylesheet_path);
        Ok(())
    }
}

#[async_trait]
impl Exporter for ZennExporter {
    async fn initialize(&mut self) -> Result<(), ExportError> {
        info!("Opening chromium browser...");

        let mut builder = BrowserConfig::builder()
            .window_size(1280, 800)
            .request_timeout(Duration::from_secs(60))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--lang=ja-JP");

        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &self.config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        if self.config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let config = builder
            .build()
            .map_err(|e| ExportError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExportError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ExportError::BrowserInit(e.to_string()))?;

        Self::close_other_tabs(&browser, &page).await;

        if self.config.headless {
            Self::mask_headless_user_agent(&browser, &page).await?;
        }

        self.browser = Some(browser);
        self.page = Some(Arc::new(page));

        info!("ブラウザ初期化完了");
        Ok(())
    }

    async fn login(&mut self) -> Result<(), ExportError> {
        let page = self.get_page()?.clone();
        let timeout = self.config.timeout;
        info!("ログイン処理開始...");

        wait::goto_network_idle(&page, ZENN_ENTER_URL, timeout).await?;
        debug!("ログインページにアクセス完了");

        wait::wait_for_selector(&page, LOGIN_BUTTON_SELECTOR, timeout)
            .await?
            .click()
            .await
            .map_err(|e| ExportError::Login(format!("ログインボタンクリック: {}", e)))?;

        // Google ログイン
        let email_input = wait::wait_for_selector(&page, EMAIL_INPUT_SELECTOR, timeout).await?;
        email_input
            .click()
            .await
            .map_err(|e| ExportError::Login(format!("メールアドレス入力欄: {}", e)))?
            .type_str(&self.config.email)
            .await
            .map_err(|e| ExportError::Login(format!("メールアドレス入力: {}", e)))?;
        sleep(Duration::from_millis(1000)).await;
        email_input
            .press_key("Enter")
            .await
            .map_err(|e| ExportError::Login(format!("メールアドレス送信: {}", e)))?;
        sleep(Duration::from_millis(2000)).await;
        debug!("メールアドレス入力完了");

        let password_input =
            wait::wait_for_selector(&page, PASSWORD_INPUT_SELECTOR, timeout).await?;
        password_input
            .click()
            .await
            .map_err(|e| ExportError::Login(format!("パスワード入力欄: {}", e)))?
            .type_str(&self.config.password)
            .await
            .map_err(|e| ExportError::Login(format!("パスワード入力: {}", e)))?;
        sleep(Duration::from_millis(1000)).await;
        password_input
            .press_key("Enter")
            .await
            .map_err(|e| ExportError::Login(format!("パスワード送信: {}", e)))?;
        sleep(Duration::from_millis(1000)).await;
        debug!("パスワード入力完了");

        if let Some(method) = self.config.two_factor {
            self.submit_two_factor(&page, method).await?;
        }

        self.wait_for_zenn_home(&page).await?;
        self.debug_screenshot(&page, "Login").await;

        info!("ログイン完了");
        Ok(())
    }

    async fn export(&mut self) -> Result<Option<PathBuf>, ExportError> {
        let page = self.get_page()?.clone();
        info!("記事ページに移動中: {}", self.config.page_url);

        wait::goto_network_idle(&page, &self.config.page_url, self.config.timeout).await?;

        self.inject_stylesheet(&page).await?;
        wait::wait_render_ready(&page, self.config.timeout).await?;

        let Some(pdf_path) = pdf_target(&self.config) else {
            warn!("ヘッドレスモードではないためPDF出力をスキップします");
            return Ok(None);
        };

        if let Some(parent) = pdf_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = page
            .save_pdf(pdf_params(), pdf_path)
            .await
            .map_err(|e| ExportError::Pdf(e.to_string()))?;

        info!("PDF出力完了: {:?} ({}bytes)", pdf_path, bytes.len());
        Ok(Some(pdf_path.to_path_buf()))
    }

    async fn close(&mut self) -> Result<(), ExportError> {
        info!("ブラウザを終了中...");

        self.page = None;
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                debug!("ブラウザ終了コマンド失敗: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("ブラウザプロセス終了待機失敗: {}", e);
            }
        }

        info!("ブラウザ終了完了");
        Ok(())
    }
}

/// URLのホストが zenn.dev（またはそのサブドメイン）か
pub fn is_zenn_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| host == ZENN_HOST || host.ends_with(&format!(".{}", ZENN_HOST)))
}

/// PDFの出力先。ヘッドフルでは印刷できないため `None`
pub fn pdf_target(config: &ExportConfig) -> Option<&Path> {
    config
        .pdf_export_enabled()
        .then(|| config.pdf_path.as_path())
}

/// A4 で印刷する PDF パラメータ
pub fn pdf_params() -> PrintToPdfParams {
    PrintToPdfParams {
        paper_width: Some(A4_WIDTH_INCH),
        paper_height: Some(A4_HEIGHT_INCH),
        margin_top: Some(0.0),
        margin_bottom: Some(0.0),
        margin_left: Some(0.0),
        margin_right: Some(0.0),
        ..Default::default()
    }
}

fn strip_headless_marker(user_agent: &str) -> String {
    user_agent.replace("HeadlessChrome", "Chrome")
}

fn stylesheet_script(css: &str) -> Result<String, ExportError> {
    let literal = serde_json::to_string(css).map_err(|e| ExportError::JavaScript(e.to_string()))?;
    Ok(format!(
        r#"
        (function(css) {{
            var style = document.createElement('style');
            style.setAttribute('data-zenn-pdf', '');
            style.textContent = css;
            (document.head || document.documentElement).appendChild(style);
            return true;
        }})({})
        "#,
        literal
    ))
}
