use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{PayloadError, Result};

/// 取消原语，统一表达跨模块的可中断性契约。
///
/// # 设计背景（Why）
/// - 编码与解码都是可能长时间挂起的 I/O 操作，必须能被外部主动打断，
///   避免无意义的资源占用；
/// - 取消位需要在内容层、格式层与传输层之间无摩擦传播，因此选择最小
///   可行解：一枚共享的原子布尔。
///
/// # 逻辑解析（How）
/// - 内部以 [`AtomicBool`] 表达取消状态，通过 [`Arc`] 支持多方共享；
/// - `cancel` 在首次成功设置取消位时返回 `true`，重复调用返回 `false`，
///   提示调用方避免重复执行兜底逻辑；
/// - `child` 生成共享同一原子位的派生实例，便于跨子系统传播信号。
///
/// # 契约说明（What）
/// - **前置条件**：构造无需参数，默认处于“未取消”状态；
/// - **后置条件**：`cancel` 成功后 `is_cancelled` 全局可见，持有派生
///   令牌的任务应尽快终止。
///
/// # 设计取舍（Trade-offs）
/// - 不提供回调注册或唤醒机制；异步路径由 [`run_cancellable`] 以周期
///   轮询补足，调用频率极低时感知会滞后一个轮询周期。
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    inner: Arc<CancellationState>,
}

#[derive(Debug, Default)]
struct CancellationState {
    flag: AtomicBool,
}

impl Cancellation {
    /// 创建处于“未取消”状态的取消令牌。
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询当前是否已被标记取消。
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    /// 将当前令牌标记为取消。
    ///
    /// 返回 `true` 表示本次调用首次触发取消；`false` 表示之前已取消。
    pub fn cancel(&self) -> bool {
        self.inner
            .flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 派生共享同一原子位的子令牌。
    pub fn child(&self) -> Self {
        self.clone()
    }
}

/// 取消位的轮询周期；取消感知延迟的上界。
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 在给定取消令牌的约束下执行一段可挂起操作。
///
/// # 设计意图（Why）
/// - [`Cancellation`] 不携带唤醒机制，每个挂起点都需要一致的方式把
///   取消位织入 Future 的生命周期；集中在一个组合子里可避免各模块
///   自行拼装 `select!` 导致语义漂移。
///
/// # 执行逻辑（How）
/// 1. 先做一次同步预检：已取消则立即返回 [`PayloadError::Cancelled`]，
///    被包裹的 Future 完全不会被轮询（资源因此不会被获取）；
/// 2. 否则以 `tokio::select!` 同时驱动业务 Future 与取消轮询循环，
///    谁先完成以谁为准；
/// 3. 取消胜出时被包裹的 Future 被整体丢弃，其内部已获取的资源按
///    RAII 正常释放。
///
/// # 契约说明（What）
/// - **输入**：`operation` 为稳定操作标识，将出现在取消错误中；
/// - **前置条件**：`fut` 内部持有的资源必须在 Drop 时自行释放；
/// - **后置条件**：返回业务结果，或码值为 `payload.cancelled` 的错误。
pub async fn run_cancellable<T, F>(
    cancel: &Cancellation,
    operation: &'static str,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(PayloadError::cancelled(operation));
    }

    tokio::select! {
        result = fut => result,
        _ = watch_cancelled(cancel) => {
            tracing::trace!(operation, "pending operation aborted by cancellation signal");
            Err(PayloadError::cancelled(operation))
        }
    }
}

async fn watch_cancelled(cancel: &Cancellation) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// 首次取消返回 `true`，重复取消返回 `false`，派生令牌共享同一位。
    #[test]
    fn cancel_is_first_writer_wins_and_shared_with_children() {
        let token = Cancellation::new();
        let child = token.child();
        assert!(!child.is_cancelled());

        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(child.is_cancelled());
    }

    /// 已取消的令牌必须在业务 Future 被轮询之前短路。
    #[tokio::test]
    async fn pre_cancelled_short_circuits_before_polling() {
        let token = Cancellation::new();
        token.cancel();

        let polled = Arc::new(AtomicUsize::new(0));
        let probe = Arc::clone(&polled);
        let result: Result<()> = run_cancellable(&token, "probe", async move {
            probe.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        let err = result.expect_err("cancelled token must short-circuit");
        assert!(err.is_cancelled());
        assert_eq!(polled.load(Ordering::SeqCst), 0);
    }

    /// 运行途中到达的取消信号应中止挂起的 Future。
    #[tokio::test]
    async fn in_flight_cancellation_aborts_pending_future() {
        let token = Cancellation::new();
        let background = token.child();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            background.cancel();
        });

        let result: Result<()> = run_cancellable(&token, "long-wait", async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;

        assert!(result.expect_err("must be cancelled").is_cancelled());
    }
}
