//! 연결별 재전송 타이머.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// 고정 주기로 콜백을 호출하는 예약 작업.
///
/// 첫 호출은 한 주기 뒤입니다. 콜백이 `false`를 반환하거나 취소되면 멈춥니다.
/// drop 시 취소됩니다.
#[derive(Debug)]
pub struct RefreshTimer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    pub fn arm<F>(period: Duration, parent: &CancellationToken, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let token = parent.child_token();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !on_tick() {
                            break;
                        }
                    }
                }
            }
        });

        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let _timer = RefreshTimer::arm(Duration::from_secs(60), &CancellationToken::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(62)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let timer = RefreshTimer::arm(Duration::from_secs(10), &CancellationToken::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_secs(15)).await;
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(timer.is_cancelled());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_propagates() {
        let parent = CancellationToken::new();
        let timer = RefreshTimer::arm(Duration::from_secs(1), &parent, || true);

        parent.cancel();
        assert!(timer.is_cancelled());
    }
}
