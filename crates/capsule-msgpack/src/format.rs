use std::sync::Arc;

use bytes::Bytes;
use capsule_core::{
    BodySource, ByteStreamSource, Cancellation, ErasedValue, FormatDescriptor, MediaType,
    PayloadError, PayloadType, Result, run_cancellable,
};
use serde::de::DeserializeOwned;
use tokio::io::AsyncReadExt;

use crate::codec;
use crate::defaults;
use crate::options::MsgPackOptions;
use crate::registry::MsgPackTypeRegistry;

/// MessagePack 能力/格式协商器。
///
/// # 设计背景（Why）
/// - 传输层在提交一个格式之前需要两类裁决：该类型能否被本格式编/解码
///   （资格），以及一段入站请求体是否需要真的走编解码器（短路）；
/// - 两类裁决都是无状态纯函数，协商器本身只携带描述符与选项快照，
///   可廉价克隆、跨线程共享。
///
/// # 资格规则（What）
/// - 一个类型可编码当且仅当它可解码：编解码器在解码时必须能构造出
///   具体实例，因此抽象/仅能力约束的形状双向不合格；
/// - 判定只看 [`PayloadType::is_instantiable`]，与注册状态无关；
///   注册缺失属于调用方式错误，在擦除解码时单独报告。
///
/// # 解码短路顺序（How）
/// 固定为：已物化的值 → 零长度请求体 → 编解码器。
/// 1. 已物化的值直接返回，绝不重新解码；该检查最先执行，因为它无需
///    信任声明长度即可给出答案；
/// 2. 声明长度恰为 0 的请求体返回逻辑空值，编解码器与流获取都被
///    跳过；
/// 3. 其余情况进入主路径：取消预检（已取消则不打开流）、单次流获取
///    （RAII 保证所有退出路径上的释放）、取消感知的读取、编解码。
#[derive(Clone, Debug)]
pub struct MsgPackFormat {
    descriptor: FormatDescriptor,
    options: Arc<MsgPackOptions>,
}

impl Default for MsgPackFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl MsgPackFormat {
    /// 以默认选项构建协商器。
    pub fn new() -> Self {
        Self::with_options(defaults::options())
    }

    /// 以给定选项构建协商器。
    pub fn with_options(options: Arc<MsgPackOptions>) -> Self {
        Self {
            descriptor: defaults::descriptor().clone(),
            options,
        }
    }

    /// 本格式的媒体类型描述符。
    pub fn descriptor(&self) -> &FormatDescriptor {
        &self.descriptor
    }

    /// 生效的序列化选项。
    pub fn options(&self) -> &MsgPackOptions {
        &self.options
    }

    /// 给定媒体类型是否被本格式接受。
    pub fn accepts(&self, media_type: &MediaType) -> bool {
        self.descriptor.accepts(media_type)
    }

    /// 类型是否可被本格式编码。
    pub fn can_encode(&self, declared: &PayloadType) -> bool {
        declared.is_instantiable()
    }

    /// 类型是否可被本格式解码；与 [`can_encode`](Self::can_encode)
    /// 遵循同一条规则。
    pub fn can_decode(&self, declared: &PayloadType) -> bool {
        declared.is_instantiable()
    }

    /// 把入站请求体解码为目标类型（泛型层）。
    ///
    /// # 契约说明（What）
    /// - **返回值**：`Ok(Some(value))` 为正常解码；`Ok(None)` 表示逻辑
    ///   空值（零长度请求体或 nil 标记）；
    /// - **取消语义**：已取消的信号在流获取之前生效，取消结果与解码
    ///   失败严格区分；
    /// - **错误语义**：已物化值的类型错配报 `payload.type_mismatch`，
    ///   编解码器失败原样上浮为 `codec.failure`。
    pub async fn read_body<T>(&self, body: BodySource, cancel: &Cancellation) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        match body {
            BodySource::Materialized(materialized) => {
                tracing::trace!(
                    value_type = materialized.type_name(),
                    "short-circuit: body already materialized, codec skipped"
                );
                materialized.take::<T>().map(Some)
            }
            BodySource::Streamable(source) => match read_streamable(source, cancel).await? {
                Some(bytes) => codec::decode_value::<Option<T>>(&bytes, &self.options),
                None => Ok(None),
            },
        }
    }

    /// 把入站请求体按声明类型解码（对象层）。
    ///
    /// 与泛型层语义一致，类型能力经 `registry` 查得；已物化的值同样
    /// 短路返回，但须通过声明类型的实例校验。
    pub async fn read_body_erased(
        &self,
        declared: &PayloadType,
        body: BodySource,
        registry: &MsgPackTypeRegistry,
        cancel: &Cancellation,
    ) -> Result<Option<ErasedValue>> {
        match body {
            BodySource::Materialized(materialized) => {
                let value = materialized.into_erased();
                declared.ensure_instance(&value)?;
                Ok(Some(value))
            }
            BodySource::Streamable(source) => match read_streamable(source, cancel).await? {
                Some(bytes) => registry.decode(declared, &bytes, &self.options),
                None => Ok(None),
            },
        }
    }
}

/// 流式请求体的公共读取路径：零长度短路 → 取消预检 → 获取 → 读取。
///
/// 返回 `Ok(None)` 表示零长度短路命中，编解码器无须介入。
async fn read_streamable(
    source: Box<dyn ByteStreamSource>,
    cancel: &Cancellation,
) -> Result<Option<Bytes>> {
    if source.declared_length() == Some(0) {
        tracing::trace!("short-circuit: zero-length body decodes to the no-value result");
        return Ok(None);
    }

    let bytes = run_cancellable(cancel, "msgpack.body.read", async move {
        let mut reader = source.acquire().await?;
        let mut buffered = Vec::new();
        reader
            .read_to_end(&mut buffered)
            .await
            .map_err(PayloadError::transport)?;
        Ok(Bytes::from(buffered))
    })
    .await?;

    // 读取与编解码之间再确认一次取消位：取消结果必须压过对编解码器的
    // 最后一次调用。
    if cancel.is_cancelled() {
        return Err(PayloadError::cancelled("msgpack.body.decode"));
    }
    Ok(Some(bytes))
}
