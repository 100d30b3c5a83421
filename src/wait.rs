//! ページ状態の待機ヘルパー
//!
//! chromiumoxide にはセレクタ待機やネットワークアイドル待機が無いため、
//! ポーリングと Network ドメインのイベントで代替する。

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::{Element, Page};
use futures::{Stream, StreamExt};
use tokio::time::{sleep, sleep_until};
use tracing::{debug, info, warn};

use crate::error::ExportError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// networkidle2: 実行中のリクエストがこの数以下の状態が `IDLE_WINDOW` 続けばアイドル
const MAX_INFLIGHT_REQUESTS: usize = 2;
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// 描画完了の判定。遅延読み込み画像とWebフォントを含む
const RENDER_READY_SCRIPT: &str = r#"
    document.readyState === 'complete'
        && (!document.fonts || document.fonts.status === 'loaded')
        && Array.from(document.images).every(img => img.complete)
"#;

/// 条件が `Some` を返すまで一定間隔で確認する。タイムアウト時は経過時間を返す
async fn poll<T, F, Fut>(timeout: Duration, mut check: F) -> Result<T, Duration>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();
    loop {
        if let Some(value) = check().await {
            return Ok(value);
        }
        if start.elapsed() > timeout {
            return Err(start.elapsed());
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// セレクタに一致する要素が現れるまで待機
pub async fn wait_for_selector(
    page: &Page,
    selector: &str,
    timeout: Duration,
) -> Result<Element, ExportError> {
    debug!("セレクタ待機: {}", selector);
    poll(timeout, || async move { page.find_element(selector).await.ok() })
        .await
        .map_err(|elapsed| {
            ExportError::Timeout(format!(
                "{:?}以内に要素 {} が見つかりませんでした",
                elapsed, selector
            ))
        })
}

/// 現在のURLが条件を満たすまで待機し、そのURLを返す
pub async fn wait_for_url<F>(
    page: &Page,
    predicate: F,
    timeout: Duration,
) -> Result<String, ExportError>
where
    F: Fn(&str) -> bool,
{
    let predicate = &predicate;
    let found = poll(timeout, || async move {
        page.url().await.ok().flatten().filter(|url| predicate(url.as_str()))
    })
    .await;

    match found {
        Ok(url) => {
            debug!("URL条件成立: {}", url);
            Ok(url)
        }
        Err(elapsed) => {
            let current = page.url().await.ok().flatten().unwrap_or_default();
            Err(ExportError::Timeout(format!(
                "{:?}以内に目的のページへ遷移しませんでした (現在: {})",
                elapsed, current
            )))
        }
    }
}

/// Network ドメインのイベントを開始/終了にまとめたもの
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Started(String),
    Finished(String),
}

type NetworkEvents = Pin<Box<dyn Stream<Item = NetworkEvent> + Send>>;

async fn network_events(page: &Page) -> Result<NetworkEvents, ExportError> {
    let listen_err = |e: chromiumoxide::error::CdpError| {
        ExportError::Navigation(format!("ネットワークイベント購読: {}", e))
    };

    let started = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(listen_err)?
        .map(|e| NetworkEvent::Started(e.request_id.inner().clone()));
    let finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(listen_err)?
        .map(|e| NetworkEvent::Finished(e.request_id.inner().clone()));
    let failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(listen_err)?
        .map(|e| NetworkEvent::Finished(e.request_id.inner().clone()));

    Ok(Box::pin(futures::stream::select(
        started,
        futures::stream::select(finished, failed),
    )))
}

/// ページへ移動し、ロード後にネットワークがアイドル（networkidle2）になるまで待機
///
/// アイドル待機がタイムアウトしてもエラーにはせず先へ進む。
pub async fn goto_network_idle(
    page: &Page,
    url: &str,
    timeout: Duration,
) -> Result<(), ExportError> {
    // 移動前に購読しておかないと最初のリクエストを取りこぼす
    let events = network_events(page).await?;

    page.goto(url)
        .await
        .map_err(|e| ExportError::Navigation(format!("{}: {}", url, e)))?;

    info!("ネットワークのアイドルを待機中...");
    if !wait_network_idle(events, timeout).await {
        warn!(
            "ネットワークアイドル待機がタイムアウトしました ({:?})。処理を続行します",
            timeout
        );
    }
    Ok(())
}

/// 実行中のリクエスト数を追跡し、アイドルになれば `true`
pub async fn wait_network_idle<S>(mut events: S, timeout: Duration) -> bool
where
    S: Stream<Item = NetworkEvent> + Unpin,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let mut inflight: HashSet<String> = HashSet::new();

    loop {
        let quiet = inflight.len() <= MAX_INFLIGHT_REQUESTS;
        tokio::select! {
            event = events.next() => match event {
                Some(NetworkEvent::Started(id)) => {
                    inflight.insert(id);
                }
                Some(NetworkEvent::Finished(id)) => {
                    inflight.remove(&id);
                }
                // ページが閉じられた
                None => return inflight.len() <= MAX_INFLIGHT_REQUESTS,
            },
            _ = sleep(IDLE_WINDOW), if quiet => {
                debug!("ネットワークアイドル (実行中 {}件)", inflight.len());
                return true;
            }
            _ = sleep_until(deadline) => {
                debug!("実行中のリクエスト: {}件", inflight.len());
                return false;
            }
        }
    }
}

/// 画像とWebフォントの読み込み完了を待機
///
/// 印刷前の最終確認なので、タイムアウトしてもエラーにはしない。
pub async fn wait_render_ready(page: &Page, timeout: Duration) -> Result<(), ExportError> {
    info!("画像・フォントの読み込みを待機中...");
    let ready = poll(timeout, || async move {
        page.evaluate(RENDER_READY_SCRIPT)
            .await
            .ok()
            .and_then(|v| v.into_value::<bool>().ok())
            .filter(|ready| *ready)
    })
    .await;

    match ready {
        Ok(_) => info!("描画準備完了"),
        Err(elapsed) => warn!(
            "画像・フォントの読み込み待機がタイムアウトしました ({:?})。処理を続行します",
            elapsed
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn started(id: &str) -> NetworkEvent {
        NetworkEvent::Started(id.to_string())
    }

    fn finished(id: &str) -> NetworkEvent {
        NetworkEvent::Finished(id.to_string())
    }

    #[tokio::test]
    async fn test_idle_when_at_most_two_requests_in_flight() {
        // 2件実行中のまま止まってもアイドル扱い
        let events = stream::iter(vec![started("1"), started("2"), started("3"), finished("1")])
            .chain(stream::pending());
        assert!(wait_network_idle(Box::pin(events), Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_not_idle_while_three_requests_in_flight() {
        let events = stream::iter(vec![started("1"), started("2"), started("3")])
            .chain(stream::pending());
        assert!(!wait_network_idle(Box::pin(events), Duration::from_millis(800)).await);
    }

    #[tokio::test]
    async fn test_idle_after_requests_drain() {
        let events = stream::iter(vec![
            started("a"),
            started("b"),
            started("c"),
            started("d"),
            finished("c"),
            finished("d"),
        ])
        .chain(stream::pending());
        assert!(wait_network_idle(Box::pin(events), Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_poll_returns_elapsed_on_timeout() {
        let result: Result<(), Duration> = poll(Duration::from_millis(300), || async { None }).await;
        let elapsed = result.unwrap_err();
        assert!(elapsed >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_poll_returns_first_value() {
        let mut calls = 0;
        let result = poll(Duration::from_secs(5), || {
            calls += 1;
            let n = calls;
            async move { (n >= 3).then_some(n) }
        })
        .await;
        assert_eq!(result, Ok(3));
    }
}
