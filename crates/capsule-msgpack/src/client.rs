use std::sync::Arc;

use capsule_core::{
    Cancellation, ErasedValue, Method, PayloadError, PayloadType, RequestTarget, Result,
    Transport, TransportRequest, TransportResponse, async_trait,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::content::MsgPackContent;
use crate::defaults;
use crate::format::MsgPackFormat;
use crate::options::MsgPackOptions;
use crate::registry::MsgPackTypeRegistry;

/// 面向传输的 MessagePack 扩展操作。
///
/// # 设计背景（Why）
/// - “拉取并解码”“编码并发送”是内容层最常见的两种端到端调用形状；
///   把它们作为 [`Transport`] 的毯式扩展提供，调用方注入任意传输实现
///   即可获得完整流程，无须自行拼装请求与协商器；
/// - 目标参数接受字符串与已解析 URL 两种形态（见 [`RequestTarget`]），
///   二者收敛到同一路径。
///
/// # 契约说明（What）
/// - **拉取**：`get_msgpack` 以接受头声明两种被认可的媒体类型
///   （规范形在前），非成功状态以 `transport.unsuccessful_response`
///   失败且不触碰请求体，成功后经 [`MsgPackFormat::read_body`] 解码；
/// - **发送**：`post_msgpack` / `put_msgpack` 把值包入
///   [`MsgPackContent`] 后作为请求体发出，响应原样返回，解码与否是
///   调用方的事；写入动词只有 `Post`/`Put`，`Get` 永不携带请求体；
/// - **快速失败**：空目标在任何网络活动之前以
///   `payload.invalid_argument` 拒绝；目标不可解析等寻址失败属传输
///   协作方内政，原样上浮。
#[async_trait]
pub trait MsgPackTransportExt: Transport {
    /// 发送 GET 请求并把响应体解码为 `T`（泛型层）。
    ///
    /// `options` 为 `None` 时使用进程级默认选项。返回 `Ok(None)`
    /// 表示响应体是逻辑空值（零长度或 nil 标记）。
    async fn get_msgpack<T>(
        &self,
        target: RequestTarget,
        options: Option<Arc<MsgPackOptions>>,
        cancel: &Cancellation,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        ensure_target(&target)?;
        let format = format_for(options);
        let response = self.send(accept_request(target), cancel).await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, "fetch failed before decode");
            return Err(PayloadError::UnsuccessfulResponse { status });
        }
        format.read_body::<T>(response.into_body(), cancel).await
    }

    /// 发送 GET 请求并按声明类型解码响应体（对象层）。
    ///
    /// 类型能力经 `registry` 查得；解码结果以 [`ErasedValue`] 归还，
    /// 调用方按声明类型 downcast 必定成功。
    async fn get_msgpack_erased(
        &self,
        target: RequestTarget,
        declared: &PayloadType,
        registry: &MsgPackTypeRegistry,
        options: Option<Arc<MsgPackOptions>>,
        cancel: &Cancellation,
    ) -> Result<Option<ErasedValue>> {
        ensure_target(&target)?;
        let format = format_for(options);
        let response = self.send(accept_request(target), cancel).await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, "fetch failed before decode");
            return Err(PayloadError::UnsuccessfulResponse { status });
        }
        format
            .read_body_erased(declared, response.into_body(), registry, cancel)
            .await
    }

    /// 把值编码为 MessagePack 并以 POST 发送，响应原样返回。
    async fn post_msgpack<T>(
        &self,
        target: RequestTarget,
        value: T,
        options: Option<Arc<MsgPackOptions>>,
        cancel: &Cancellation,
    ) -> Result<TransportResponse>
    where
        T: Serialize + Send + Sync + 'static,
    {
        send_encoded(self, Method::Post, target, value, options, cancel).await
    }

    /// 把值编码为 MessagePack 并以 PUT 发送，响应原样返回。
    async fn put_msgpack<T>(
        &self,
        target: RequestTarget,
        value: T,
        options: Option<Arc<MsgPackOptions>>,
        cancel: &Cancellation,
    ) -> Result<TransportResponse>
    where
        T: Serialize + Send + Sync + 'static,
    {
        send_encoded(self, Method::Put, target, value, options, cancel).await
    }
}

impl<X> MsgPackTransportExt for X where X: Transport + ?Sized {}

fn ensure_target(target: &RequestTarget) -> Result<()> {
    if target.is_empty() {
        return Err(PayloadError::invalid_argument("target"));
    }
    Ok(())
}

fn format_for(options: Option<Arc<MsgPackOptions>>) -> MsgPackFormat {
    match options {
        Some(options) => MsgPackFormat::with_options(options),
        None => MsgPackFormat::new(),
    }
}

fn accept_request(target: RequestTarget) -> TransportRequest {
    TransportRequest::new(Method::Get, target)
        .with_accept(defaults::media_type())
        .with_accept(defaults::alias_media_type())
}

async fn send_encoded<X, T>(
    transport: &X,
    method: Method,
    target: RequestTarget,
    value: T,
    options: Option<Arc<MsgPackOptions>>,
    cancel: &Cancellation,
) -> Result<TransportResponse>
where
    X: Transport + ?Sized,
    T: Serialize + Send + Sync + 'static,
{
    ensure_target(&target)?;
    let mut content = MsgPackContent::new(value);
    if let Some(options) = options {
        content = content.with_options(options);
    }
    tracing::debug!(method = method.as_str(), target = %target, "sending msgpack-encoded body");
    let request = TransportRequest::new(method, target).with_content(Box::new(content));
    transport.send(request, cancel).await
}
