use std::sync::Arc;

use bytes::Bytes;
use capsule_core::{
    Cancellation, ErasedValue, MediaType, OutboundContent, PayloadType, Result, async_trait,
    run_cancellable,
};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::codec;
use crate::defaults;
use crate::options::MsgPackOptions;
use crate::registry::ErasedEncodeFn;

/// 类型化 MessagePack 内容包装器（泛型层）。
///
/// # 设计背景（Why）
/// - 包装器把 `(声明类型, 值, 选项, 媒体类型)` 固化为一个不可变四元组，
///   编码推迟到传输层真正索要字节的时刻；
/// - 泛型层的“值属于声明类型”不变量由类型系统在编译期兑现，构造
///   因此不可能在该维度失败；需要运行时校验的类型擦除场景见
///   [`DynMsgPackContent`]。
///
/// # 逻辑解析（How）
/// - 省略的选项回落到 [`defaults::options`]，省略的媒体类型回落到
///   规范形 [`defaults::media_type`]；
/// - `value` 为 `None` 表示空缺值：编码产出 nil 标记而非零长度请求体；
/// - [`OutboundContent::write_to`] 每次调用完整重新编码（幂等但
///   浪费），字节不做缓存，与“逻辑上每次发送消费一次”的生命周期一致。
///
/// # 契约说明（What）
/// - **后置条件**：实例构造后不可变；并发编码两个不同包装器无须任何
///   协调，它们只共享只读的默认值。
#[derive(Clone, Debug)]
pub struct MsgPackContent<T> {
    value: Option<T>,
    options: Arc<MsgPackOptions>,
    media_type: MediaType,
}

impl<T> MsgPackContent<T>
where
    T: Serialize + Send + Sync,
{
    /// 包装一个值，选项与媒体类型取默认。
    pub fn new(value: T) -> Self {
        Self::from_option(Some(value))
    }

    /// 构造空缺值内容（编码为 nil 标记）。
    pub fn absent() -> Self {
        Self::from_option(None)
    }

    /// 以可空值构造。
    pub fn from_option(value: Option<T>) -> Self {
        Self {
            value,
            options: defaults::options(),
            media_type: defaults::media_type(),
        }
    }

    /// 覆盖序列化选项；传入的实例归本包装器独占引用，不会被修改。
    pub fn with_options(mut self, options: Arc<MsgPackOptions>) -> Self {
        self.options = options;
        self
    }

    /// 覆盖媒体类型。
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    /// 只读访问被包装的值。
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// 生效的序列化选项。
    pub fn options(&self) -> &MsgPackOptions {
        &self.options
    }

    /// 生效的媒体类型。
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// 立即编码为完整字节，供需要物化整个请求体的调用方使用。
    pub fn encode_to_bytes(&self) -> Result<Bytes> {
        codec::encode_value(self.value.as_ref(), &self.options)
    }
}

#[async_trait]
impl<T> OutboundContent for MsgPackContent<T>
where
    T: Serialize + Send + Sync,
{
    fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    fn content_length(&self) -> Option<u64> {
        // 长度在完整编码之前不可知，交由传输层做不定长封帧。
        None
    }

    async fn write_to(
        &self,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        cancel: &Cancellation,
    ) -> Result<()> {
        run_cancellable(cancel, "msgpack.content.write", async move {
            let bytes = self.encode_to_bytes()?;
            tracing::trace!(
                media_type = %self.media_type,
                len = bytes.len(),
                "streaming encoded content into transport sink"
            );
            sink.write_all(&bytes).await.map_err(capsule_core::PayloadError::transport)?;
            Ok(())
        })
        .await
    }
}

/// 类型化 MessagePack 内容包装器（对象层）。
///
/// # 设计背景（Why）
/// - 以 [`PayloadType`] 为参数的类型擦除调用形状无法使用泛型包装器；
///   对象层在构造期补上泛型层由编译器完成的两项校验：声明类型可
///   实例化、值确实属于声明类型；
/// - 编码函数指针在注册表登记时单态化生成，见
///   [`crate::registry::MsgPackTypeRegistry::content`]。
///
/// # 契约说明（What）
/// - **前置条件**：实例只能经注册表构造，校验失败分别以
///   `payload.unsupported_type` / `payload.type_mismatch` 报告；
/// - **后置条件**：构造成功后行为与泛型层完全一致，包括空缺值的
///   nil 编码与每次写入的完整重编码。
#[derive(Debug)]
pub struct DynMsgPackContent {
    declared: PayloadType,
    value: Option<ErasedValue>,
    encode: ErasedEncodeFn,
    options: Arc<MsgPackOptions>,
    media_type: MediaType,
}

impl DynMsgPackContent {
    pub(crate) fn from_registry(
        declared: PayloadType,
        value: Option<ErasedValue>,
        encode: ErasedEncodeFn,
    ) -> Self {
        Self {
            declared,
            value,
            encode,
            options: defaults::options(),
            media_type: defaults::media_type(),
        }
    }

    /// 覆盖序列化选项。
    pub fn with_options(mut self, options: Arc<MsgPackOptions>) -> Self {
        self.options = options;
        self
    }

    /// 覆盖媒体类型。
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    /// 声明类型描述符。
    pub fn declared_type(&self) -> &PayloadType {
        &self.declared
    }

    /// 生效的序列化选项。
    pub fn options(&self) -> &MsgPackOptions {
        &self.options
    }

    /// 立即编码为完整字节。
    pub fn encode_to_bytes(&self) -> Result<Bytes> {
        match &self.value {
            Some(value) => (self.encode)(value, &self.options),
            None => codec::encode_value::<()>(None, &self.options),
        }
    }
}

#[async_trait]
impl OutboundContent for DynMsgPackContent {
    fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    fn content_length(&self) -> Option<u64> {
        None
    }

    async fn write_to(
        &self,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        cancel: &Cancellation,
    ) -> Result<()> {
        run_cancellable(cancel, "msgpack.content.write", async move {
            let bytes = self.encode_to_bytes()?;
            tracing::trace!(
                media_type = %self.media_type,
                declared = self.declared.name(),
                len = bytes.len(),
                "streaming erased content into transport sink"
            );
            sink.write_all(&bytes).await.map_err(capsule_core::PayloadError::transport)?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FieldResolution;
    use serde::Deserialize;
    use std::io::Cursor;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: u32,
        label: String,
    }

    fn sample() -> Sample {
        Sample {
            id: 7,
            label: "capsule".to_string(),
        }
    }

    /// 默认构造回落到共享默认值，覆盖后互不影响。
    #[test]
    fn defaults_apply_until_overridden() {
        let content = MsgPackContent::new(sample());
        assert_eq!(content.media_type().as_str(), defaults::APPLICATION_X_MSGPACK);
        assert_eq!(content.options(), defaults::options().as_ref());

        let custom = MsgPackContent::new(sample())
            .with_media_type(MediaType::from_static(defaults::APPLICATION_MSGPACK))
            .with_options(Arc::new(
                MsgPackOptions::new().with_field_resolution(FieldResolution::Indexed),
            ));
        assert_eq!(custom.media_type().as_str(), defaults::APPLICATION_MSGPACK);
        assert_eq!(
            custom.options().field_resolution(),
            FieldResolution::Indexed
        );
    }

    /// Named 编码携带字段名，Indexed 编码不携带。
    #[test]
    fn field_resolution_changes_wire_shape() {
        let named = MsgPackContent::new(sample())
            .encode_to_bytes()
            .expect("named encode");
        let indexed = MsgPackContent::new(sample())
            .with_options(Arc::new(
                MsgPackOptions::new().with_field_resolution(FieldResolution::Indexed),
            ))
            .encode_to_bytes()
            .expect("indexed encode");

        let contains = |haystack: &Bytes, needle: &[u8]| {
            haystack.windows(needle.len()).any(|window| window == needle)
        };
        assert!(contains(&named, b"label"));
        assert!(!contains(&indexed, b"label"));
        assert!(indexed.len() < named.len());
    }

    /// 空缺值写出的正是单字节 nil 标记。
    #[tokio::test]
    async fn absent_content_streams_nil_marker() {
        let content = MsgPackContent::<Sample>::absent();
        let mut sink = Cursor::new(Vec::new());
        content
            .write_to(&mut sink, &Cancellation::new())
            .await
            .expect("write absent value");
        assert_eq!(sink.into_inner(), vec![0xc0]);
    }

    /// 已取消的令牌下不产生任何字节。
    #[tokio::test]
    async fn cancelled_write_produces_no_bytes() {
        let cancel = Cancellation::new();
        cancel.cancel();

        let content = MsgPackContent::new(sample());
        let mut sink = Cursor::new(Vec::new());
        let err = content
            .write_to(&mut sink, &cancel)
            .await
            .expect_err("cancelled write must fail");
        assert!(err.is_cancelled());
        assert!(sink.into_inner().is_empty());
    }

    /// 重复写入是幂等的：两次产出完全相同的字节序列。
    #[tokio::test]
    async fn repeated_writes_are_idempotent() {
        let content = MsgPackContent::new(sample());
        let cancel = Cancellation::new();

        let mut first = Cursor::new(Vec::new());
        let mut second = Cursor::new(Vec::new());
        content.write_to(&mut first, &cancel).await.expect("first");
        content.write_to(&mut second, &cancel).await.expect("second");
        assert_eq!(first.into_inner(), second.into_inner());
    }
}
