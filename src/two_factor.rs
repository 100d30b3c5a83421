//! Google 2段階認証の方式判定
//!
//! 現在のURLと要求された方式から、どの操作で確認コード入力画面まで
//! たどり着くかを決める。ブラウザ操作そのものは `zenn::exporter` 側で行う。

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::ExportError;

/// 確認コード入力欄
pub const CODE_INPUT_SELECTOR: &str = "input[type=\"tel\"]";

/// 方式選択一覧のURL断片
const SELECTION_PATH: &str = "/challenge/selection";
/// チャレンジ画面共通のURL断片
const CHALLENGE_PATH: &str = "/challenge/";
/// パスワード入力画面（これもチャレンジ扱いのURL）
const PASSWORD_CHALLENGE_PATH: &str = "/challenge/pwd";

/// 「別の方法を試す」ボタンの表示テキスト（英語/日本語UI）
pub const TRY_ANOTHER_WAY_LABELS: [&str; 2] = ["Try another way", "別の方法を試す"];

/// 2段階認証の方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TwoFactorMethod {
    /// 認証システムアプリ (TOTP)
    #[default]
    App,
    /// SMSで送信されるコード
    Sms,
}

impl TwoFactorMethod {
    pub const ALL: [TwoFactorMethod; 2] = [TwoFactorMethod::App, TwoFactorMethod::Sms];

    /// 方式選択一覧で対象の方式を指す要素
    pub fn selector(self) -> &'static str {
        match self {
            TwoFactorMethod::App => "[data-challengetype=\"6\"]",
            TwoFactorMethod::Sms => "[data-sendmethod=\"SMS\"]",
        }
    }

    /// この方式のチャレンジ画面のURL断片
    pub fn challenge_path(self) -> &'static str {
        match self {
            TwoFactorMethod::App => "/challenge/totp",
            TwoFactorMethod::Sms => "/challenge/ipp",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TwoFactorMethod::App => "APP",
            TwoFactorMethod::Sms => "SMS",
        }
    }
}

impl fmt::Display for TwoFactorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TwoFactorMethod {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APP" => Ok(TwoFactorMethod::App),
            "SMS" => Ok(TwoFactorMethod::Sms),
            other => Err(ExportError::Config(format!(
                "TWO_FA_TOOL は APP または SMS を指定してください: {:?}",
                other
            ))),
        }
    }
}

/// 確認コード入力画面に進むための手順
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStep {
    /// 既に要求された方式の入力画面が表示されている
    AlreadyPresented,
    /// 方式選択一覧が表示されているので対象の方式を選ぶ
    SelectFromList,
    /// 別の方式が表示されているので「別の方法を試す」から選び直す
    SwitchMethod,
}

/// URLのパス部分。解析できなければ `None`
fn url_path(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| u.path().to_string())
}

/// パスワード送信後、2段階認証の画面（方式選択を含む）に進んだか
///
/// パスワード入力画面自体も `/challenge/pwd` なので除外する。
pub fn is_second_factor_page(url: &str) -> bool {
    url_path(url).is_some_and(|path| {
        path.contains(CHALLENGE_PATH) && !path.contains(PASSWORD_CHALLENGE_PATH)
    })
}

/// 現在のURLから次の手順を決める
pub fn plan(method: TwoFactorMethod, current_url: &str) -> ChallengeStep {
    let path = url_path(current_url).unwrap_or_default();
    if path.contains(method.challenge_path()) {
        ChallengeStep::AlreadyPresented
    } else if path.contains(SELECTION_PATH) {
        ChallengeStep::SelectFromList
    } else {
        ChallengeStep::SwitchMethod
    }
}
