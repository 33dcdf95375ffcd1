//! 进程级格式默认值：规范媒体类型、互操作别名与共享序列化选项。
//!
//! # 契约说明（What）
//! - 所有默认值在首次访问时完成初始化，此后只读共享；不存在任何
//!   初始化前可观察的访问路径；
//! - 编码端在调用方未覆盖时使用 [`media_type`]（规范形），解码端经
//!   [`descriptor`] 同时接受规范形与别名。

use std::sync::{Arc, LazyLock};

use capsule_core::{FormatDescriptor, MediaType};

use crate::options::MsgPackOptions;

/// 规范媒体类型（厂商 `x-` 前缀形），编码端默认使用。
pub const APPLICATION_X_MSGPACK: &str = "application/x-msgpack";

/// 互操作别名，解码端与规范形等价接受。
pub const APPLICATION_MSGPACK: &str = "application/msgpack";

static DESCRIPTOR: LazyLock<FormatDescriptor> = LazyLock::new(|| {
    FormatDescriptor::new(MediaType::from_static(APPLICATION_X_MSGPACK))
        .with_alias(MediaType::from_static(APPLICATION_MSGPACK))
});

static OPTIONS: LazyLock<Arc<MsgPackOptions>> = LazyLock::new(|| Arc::new(MsgPackOptions::new()));

/// 规范媒体类型。
pub fn media_type() -> MediaType {
    MediaType::from_static(APPLICATION_X_MSGPACK)
}

/// 互操作别名媒体类型。
pub fn alias_media_type() -> MediaType {
    MediaType::from_static(APPLICATION_MSGPACK)
}

/// 本格式的媒体类型描述符（规范形 + 别名）。
pub fn descriptor() -> &'static FormatDescriptor {
    &DESCRIPTOR
}

/// 进程级共享的默认序列化选项。
pub fn options() -> Arc<MsgPackOptions> {
    Arc::clone(&OPTIONS)
}
