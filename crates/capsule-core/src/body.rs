use std::io::Cursor;

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::async_trait;
use crate::error::{PayloadError, Result};
use crate::payload::ErasedValue;

/// 解码端读取请求体使用的统一读取器类型。
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

/// `ByteStreamSource` 抽象“可被一次性打开的字节流来源”。
///
/// # 设计背景（Why）
/// - 请求体流的获取是整个解码路径上唯一需要向传输层申请资源的动作，
///   必须满足两条纪律：取消信号在获取之前生效（已取消则完全不打开），
///   以及获取之后在任何退出路径上都保证释放；
/// - 以 `self: Box<Self>` 消费自身，把“单次获取”编码进类型系统，
///   杜绝重复打开同一来源。
///
/// # 契约说明（What）
/// - `declared_length`：传输层声明的内容长度，未知时返回 `None`；
///   声明为 `Some(0)` 的来源允许解码端完全跳过获取；
/// - `acquire`：消费自身换取读取器；释放以 [`BodyReader`] 的 Drop
///   为准，实现方不得要求显式关闭。
#[async_trait]
pub trait ByteStreamSource: Send {
    /// 传输层声明的内容长度（字节）。
    fn declared_length(&self) -> Option<u64>;

    /// 打开并消费本来源，换取可读流。
    async fn acquire(self: Box<Self>) -> Result<BodyReader>;
}

/// `MaterializedBody` 承载“值已在带外产生”的请求体。
///
/// # 设计背景（Why）
/// - 服务端短路等场景会把已经解码（或从未编码）的值直接附着在响应上；
///   解码端遇到这种请求体时必须原样取值，绝不可再次触发编解码器。
///
/// # 契约说明（What）
/// - **后置条件**：`take` 按请求类型取回值；类型不一致返回
///   `payload.type_mismatch` 并点名双方。
#[derive(Debug)]
pub struct MaterializedBody {
    value: ErasedValue,
}

impl MaterializedBody {
    /// 物化一个具体值。
    pub fn new<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            value: ErasedValue::new(value),
        }
    }

    /// 以既有擦除值构建。
    pub fn from_erased(value: ErasedValue) -> Self {
        Self { value }
    }

    /// 实际值的稳定类型名。
    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }

    /// 取回擦除值。
    pub fn into_erased(self) -> ErasedValue {
        self.value
    }

    /// 按请求类型取回值。
    pub fn take<T>(self) -> Result<T>
    where
        T: Send + Sync + 'static,
    {
        self.value.downcast::<T>().map_err(|kept| {
            PayloadError::type_mismatch(std::any::type_name::<T>(), kept.type_name())
        })
    }
}

/// `BodySource` 是请求体来源的封闭标签联合。
///
/// # 设计背景（Why）
/// - 解码端的短路策略依赖于来源种类：已物化的值直接返回，字节流才
///   进入“长度检查 → 获取 → 编解码”的主路径；
/// - 用标签联合替代运行时类型探测，使分派在 `match` 上一目了然。
///
/// # 契约说明（What）
/// - `Materialized`：值已在带外产生，解码端不得再次调用编解码器；
/// - `Streamable`：尚未读取的字节流来源，遵循 [`ByteStreamSource`]
///   的单次获取纪律。
#[derive(Debug)]
pub enum BodySource {
    /// 已物化的值。
    Materialized(MaterializedBody),
    /// 可读字节流。
    Streamable(Box<dyn ByteStreamSource>),
}

impl std::fmt::Debug for dyn ByteStreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStreamSource")
            .field("declared_length", &self.declared_length())
            .finish()
    }
}

impl BodySource {
    /// 以具体值构建已物化来源。
    pub fn materialized<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::Materialized(MaterializedBody::new(value))
    }

    /// 以字节流来源构建。
    pub fn streamable(source: impl ByteStreamSource + 'static) -> Self {
        Self::Streamable(Box::new(source))
    }

    /// 以既有字节缓冲构建。
    pub fn buffered(bytes: Bytes) -> Self {
        Self::streamable(BufferedSource::new(bytes))
    }

    /// 构建声明长度为零的空请求体。
    pub fn empty() -> Self {
        Self::buffered(Bytes::new())
    }

    /// 传输层声明的内容长度；已物化来源无长度概念。
    pub fn declared_length(&self) -> Option<u64> {
        match self {
            Self::Materialized(_) => None,
            Self::Streamable(source) => source.declared_length(),
        }
    }
}

/// `BufferedSource` 把一段内存字节暴露为字节流来源。
///
/// # 使用场景（Why）
/// - 传输实现把整个响应体读入内存后交给解码端，或测试需要以固定字节
///   构造请求体时，均复用本类型；声明长度即缓冲长度。
#[derive(Clone, Debug)]
pub struct BufferedSource {
    bytes: Bytes,
}

impl BufferedSource {
    /// 以字节缓冲构建来源。
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl ByteStreamSource for BufferedSource {
    fn declared_length(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }

    async fn acquire(self: Box<Self>) -> Result<BodyReader> {
        Ok(Box::new(Cursor::new(self.bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    /// 缓冲来源声明自身长度，获取后读出的字节与输入一致。
    #[tokio::test]
    async fn buffered_source_reports_length_and_replays_bytes() {
        let body = BodySource::buffered(Bytes::from_static(b"\x93\x01\x02\x03"));
        assert_eq!(body.declared_length(), Some(4));

        let BodySource::Streamable(source) = body else {
            panic!("buffered body must be streamable");
        };
        let mut reader = source.acquire().await.expect("acquire buffered source");
        let mut read = Vec::new();
        reader.read_to_end(&mut read).await.expect("read buffered");
        assert_eq!(read, b"\x93\x01\x02\x03");
    }

    /// 已物化来源按类型取值，错配时点名双方类型。
    #[test]
    fn materialized_body_takes_by_declared_type() {
        let body = MaterializedBody::new(1234_u64);
        assert_eq!(body.take::<u64>().expect("matching type"), 1234);

        let err = MaterializedBody::new(1234_u64)
            .take::<String>()
            .expect_err("type mismatch must be reported");
        assert!(err.to_string().contains("u64"));
        assert!(err.to_string().contains("String"));
    }

    /// 空请求体声明长度为零。
    #[test]
    fn empty_body_declares_zero_length() {
        assert_eq!(BodySource::empty().declared_length(), Some(0));
        assert_eq!(
            BodySource::materialized("out-of-band".to_string()).declared_length(),
            None
        );
    }
}
