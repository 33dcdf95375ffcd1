//! 外部编解码器（`rmp-serde`）的唯一进出通道。
//!
//! # 设计定位（Why）
//! - 编解码边界契约是“原样转发选项、原样上浮错误”；把全部 `rmp-serde`
//!   调用收拢到一个模块，其余代码只面对 [`encode_value`] / [`decode_value`]
//!   两个入口，边界一目了然；
//! - 空缺值按格式原生的 nil 标记编码（单字节 `0xc0`），而非零长度
//!   请求体；解码方向以 `Option<T>` 为目标类型即可识别该标记。

use bytes::Bytes;
use capsule_core::{PayloadError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::options::{FieldResolution, MsgPackOptions};

/// 把值（或空缺）编码为 MessagePack 字节。
///
/// # 契约说明（What）
/// - `Some(value)` 按 `options` 的字段解析策略编码；
/// - `None` 编码为 nil 标记，保证“空缺值仍是合法编码”；
/// - 编解码器的失败以 `codec.failure` 包装，原因未经翻译。
pub(crate) fn encode_value<T>(value: Option<&T>, options: &MsgPackOptions) -> Result<Bytes>
where
    T: Serialize,
{
    let encoded = match value {
        Some(value) => match options.field_resolution() {
            FieldResolution::Named => rmp_serde::to_vec_named(value),
            FieldResolution::Indexed => rmp_serde::to_vec(value),
        },
        None => rmp_serde::to_vec(&()),
    }
    .map_err(PayloadError::codec)?;
    Ok(Bytes::from(encoded))
}

/// 把 MessagePack 字节解码为目标类型。
///
/// # 契约说明（What）
/// - 解码端同时接受 map 与数组两种结构体形状，`options` 原样转发但
///   当前编解码器在解码方向没有可调项；
/// - nil 标记由 `Option<T>` 目标类型吸收为 `None`。
pub(crate) fn decode_value<T>(bytes: &[u8], _options: &MsgPackOptions) -> Result<T>
where
    T: DeserializeOwned,
{
    rmp_serde::from_slice(bytes).map_err(PayloadError::codec)
}
