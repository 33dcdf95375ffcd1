//! 传输与请求体的可脚本化测试桩，作为稳定测试 API 随本 crate 发布。
//!
//! # 设计定位（Why）
//! - 内容层的可测试性质（零长度短路、取消先于流获取、失败状态不触碰
//!   请求体）都依赖“可观察的协作方”：桩传输记录完整出站请求，计数
//!   字节源暴露获取次数；
//! - 与其让各测试文件重复定义私有桩，不如集中在此提供单点实现，接口
//!   演进时可获得集中编译错误提示。
//!
//! # 使用方式（How）
//! - [`StubTransport`]：预先排队若干响应，发送时驱动出站请求体完整
//!   编码并记录为 [`RecordedRequest`]；队列为空时回应 200 空体；
//! - [`CountingSource`]：包装一段字节并暴露共享获取计数器，测试据此
//!   断言“流从未被打开”。
//!
//! # 风险提示（Trade-offs）
//! - 桩传输对请求体的编码是急切的（写入内存游标），与真实传输的
//!   流式行为存在时序差异；验证背压类行为时应另写专用桩。

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::io::AsyncWrite;

use crate::async_trait;
use crate::body::{BodyReader, BodySource, ByteStreamSource};
use crate::contract::Cancellation;
use crate::error::Result;
use crate::media::MediaType;
use crate::transport::{Method, StatusCode, Transport, TransportRequest, TransportResponse};

/// 桩传输捕获到的一次完整出站请求。
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    /// 请求方法。
    pub method: Method,
    /// 请求目标的字符串表示。
    pub target: String,
    /// 按偏好排序的接受列表。
    pub accept: Vec<MediaType>,
    /// 请求体的媒体类型（无请求体时为 `None`）。
    pub content_type: Option<MediaType>,
    /// 请求体声明的内容长度。
    pub declared_length: Option<u64>,
    /// 驱动出站请求体得到的完整字节。
    pub body: Option<Bytes>,
}

/// 可脚本化的桩传输：按序吐出预排队的响应并记录每次请求。
///
/// # 契约说明（What）
/// - `push_response`/`push_status` 追加脚本响应，`send` 按 FIFO 消费；
/// - 队列耗尽后回应 `200` 加零长度请求体，保证测试不因漏排队而悬挂；
/// - `recorded` 返回捕获请求的快照，顺序与发送顺序一致。
#[derive(Debug, Default)]
pub struct StubTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl StubTransport {
    /// 构建空脚本的桩传输。
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个脚本响应。
    pub fn push_response(&self, response: TransportResponse) {
        lock(&self.responses).push_back(response);
    }

    /// 追加一个只有状态码、零长度请求体的脚本响应。
    pub fn push_status(&self, status: StatusCode) {
        self.push_response(TransportResponse::new(status, BodySource::empty()));
    }

    /// 追加一个 `200` 响应，请求体为给定字节。
    pub fn push_ok_body(&self, body: Bytes) {
        self.push_response(TransportResponse::new(
            StatusCode::new(200),
            BodySource::buffered(body),
        ));
    }

    /// 返回捕获请求的快照。
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(
        &self,
        request: TransportRequest,
        cancel: &Cancellation,
    ) -> Result<TransportResponse> {
        let (method, target, accept, content) = request.into_parts();

        let mut record = RecordedRequest {
            method,
            target: target.as_str().to_string(),
            accept,
            content_type: None,
            declared_length: None,
            body: None,
        };

        if let Some(content) = content {
            record.content_type = Some(content.media_type().clone());
            record.declared_length = content.content_length();

            let mut sink = Cursor::new(Vec::new());
            content
                .write_to(&mut sink as &mut (dyn AsyncWrite + Send + Unpin), cancel)
                .await?;
            record.body = Some(Bytes::from(sink.into_inner()));
        }

        lock(&self.requests).push(record);

        Ok(lock(&self.responses).pop_front().unwrap_or_else(|| {
            TransportResponse::new(StatusCode::new(200), BodySource::empty())
        }))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 带获取计数的字节流来源。
///
/// # 使用场景（Why）
/// - “已取消的解码不得打开请求体流”“零长度请求体不得触发编解码器”
///   两条性质都以获取次数为观察点：计数停留在 0 即为证明。
#[derive(Debug)]
pub struct CountingSource {
    bytes: Bytes,
    declared: Option<u64>,
    acquisitions: Arc<AtomicUsize>,
}

impl CountingSource {
    /// 以字节缓冲构建，声明长度即缓冲长度。
    pub fn new(bytes: Bytes) -> Self {
        let declared = Some(bytes.len() as u64);
        Self {
            bytes,
            declared,
            acquisitions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 覆盖声明长度（可设为 `None` 模拟未知长度）。
    pub fn with_declared_length(mut self, declared: Option<u64>) -> Self {
        self.declared = declared;
        self
    }

    /// 返回共享的获取计数器，供断言使用。
    pub fn acquisition_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.acquisitions)
    }
}

#[async_trait]
impl ByteStreamSource for CountingSource {
    fn declared_length(&self) -> Option<u64> {
        self.declared
    }

    async fn acquire(self: Box<Self>) -> Result<BodyReader> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Cursor::new(self.bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 队列耗尽后桩传输回应 200 空体，且每次请求都被记录。
    #[tokio::test]
    async fn stub_transport_records_and_falls_back_to_ok() {
        let transport = StubTransport::new();
        transport.push_status(StatusCode::new(404));

        let cancel = Cancellation::new();
        let first = transport
            .send(
                TransportRequest::new(Method::Get, "https://example.test/a".into()),
                &cancel,
            )
            .await
            .expect("scripted response");
        assert_eq!(first.status(), StatusCode::new(404));

        let second = transport
            .send(
                TransportRequest::new(Method::Get, "https://example.test/b".into()),
                &cancel,
            )
            .await
            .expect("fallback response");
        assert_eq!(second.status(), StatusCode::new(200));
        assert_eq!(second.body().declared_length(), Some(0));

        let recorded = transport.recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].target, "https://example.test/a");
        assert!(recorded[1].body.is_none());
    }

    /// 计数来源只在真正获取时递增。
    #[tokio::test]
    async fn counting_source_tracks_acquisitions() {
        let source = CountingSource::new(Bytes::from_static(b"\x01"));
        let counter = source.acquisition_counter();
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        let boxed: Box<dyn ByteStreamSource> = Box::new(source);
        let _reader = boxed.acquire().await.expect("acquire counting source");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
