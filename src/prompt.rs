//! 端末からの確認コード入力

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::error::ExportError;

pub const CODE_QUESTION: &str = "Enter your G-code: ";

#[async_trait]
pub trait CodePrompt: Send + Sync {
    /// 質問を表示して1行読み取る
    async fn ask(&self, question: &str) -> Result<String, ExportError>;
}

/// 行単位の入力元から読み取るプロンプト
///
/// 読み取りバッファは呼び出しをまたいで保持されるため、
/// 先読みされた次の行が失われない。
pub struct LinePrompt<R> {
    reader: Mutex<R>,
}

impl<R> LinePrompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }
}

/// 標準入力から読み取るプロンプト
pub type TerminalPrompt = LinePrompt<BufReader<Stdin>>;

impl Default for TerminalPrompt {
    fn default() -> Self {
        LinePrompt::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> CodePrompt for LinePrompt<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn ask(&self, question: &str) -> Result<String, ExportError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(question.as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = self.reader.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(ExportError::Prompt("標準入力が閉じられています".into()));
        }
        Ok(line)
    }
}

/// 確認コードを読み取り、空白を取り除いて返す
pub async fn read_code(prompt: &dyn CodePrompt) -> Result<String, ExportError> {
    let answer = prompt.ask(CODE_QUESTION).await?;
    let code: String = answer.chars().filter(|c| !c.is_whitespace()).collect();
    if code.is_empty() {
        return Err(ExportError::Prompt("確認コードが入力されていません".into()));
    }
    Ok(code)
}
