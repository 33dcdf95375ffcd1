use std::borrow::Cow;

use thiserror::Error;

use crate::transport::StatusCode;

/// `ErrorCause` 封装底层原因，保持 `Send + Sync` 以方便跨线程传递。
pub type ErrorCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// `Result` 为内容层统一的返回值别名，默认错误类型为 [`PayloadError`]。
///
/// # 设计意图（Why）
/// - 内容层的所有公开操作共享同一错误域，集中别名可避免在各处重复书写
///   `Result<_, PayloadError>` 样板；
/// - 第二泛型参数保持开放，传输实现仍可在内部使用自定义错误类型。
pub type Result<T, E = PayloadError> = core::result::Result<T, E>;

/// 内容层的稳定错误码常量集合，确保日志与断言具有稳定识别符。
///
/// # 契约说明（What）
/// - 错误码遵循 `<领域>.<语义>` 命名约定，一经发布不得变更含义；
/// - 每个 [`PayloadError`] 变体都恰好对应此处一个码值，经由
///   [`PayloadError::code`] 暴露。
pub mod codes {
    /// 必要参数缺失或为空，发生于任何 I/O 之前。
    pub const INVALID_ARGUMENT: &str = "payload.invalid_argument";
    /// 值与声明类型不一致（构造期或解码后的防御性检查）。
    pub const TYPE_MISMATCH: &str = "payload.type_mismatch";
    /// 类型不具备可实例化形状，或未在擦除注册表中登记。
    pub const UNSUPPORTED_TYPE: &str = "payload.unsupported_type";
    /// 拉取操作得到了非成功状态码。
    pub const UNSUCCESSFUL_RESPONSE: &str = "transport.unsuccessful_response";
    /// 外部编解码器报告的错误，原样透传。
    pub const CODEC_FAILURE: &str = "codec.failure";
    /// 传输协作方自身的失败（寻址、I/O 等），原样透传。
    pub const TRANSPORT_FAILURE: &str = "transport.failure";
    /// 操作被取消信号中止。
    pub const CANCELLED: &str = "payload.cancelled";
}

/// `PayloadError` 是内容层跨模块共享的封闭错误域。
///
/// # 设计背景（Why）
/// - 类型化负载层是纯转换层：错误既不在内部记录也不重试，必须以稳定
///   分类原样上浮给直接调用方，由其决定补救策略；
/// - 外部协作方（编解码器、传输）的错误不做翻译，仅包装为对应变体，
///   保证 `source()` 链路可回溯到原始原因。
///
/// # 契约说明（What）
/// - 每个变体对应 [`codes`] 中一个稳定错误码，`Display` 输出统一采用
///   `[code] message` 形式；
/// - **后置条件**：实例满足 `Send + Sync + 'static`，可安全跨线程传递。
///
/// # 风险提示（Trade-offs）
/// - 枚举标注 `#[non_exhaustive]`，下游匹配时必须保留兜底分支，换取
///   未来扩展空间。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PayloadError {
    /// 必要参数缺失或为空；在任何网络/编解码活动之前同步检出。
    #[error("[payload.invalid_argument] required argument `{name}` is missing or empty")]
    InvalidArgument {
        /// 缺失参数的名称。
        name: &'static str,
    },

    /// 值的运行时类型与声明类型不一致。
    #[error("[payload.type_mismatch] declared type `{declared}` is not compatible with runtime type `{actual}`")]
    TypeMismatch {
        /// 声明的类型名。
        declared: Cow<'static, str>,
        /// 实际的运行时类型名。
        actual: Cow<'static, str>,
    },

    /// 类型不满足本格式的编解码资格。
    #[error("[payload.unsupported_type] type `{name}` is not eligible for this format: {reason}")]
    UnsupportedType {
        /// 被拒绝的类型名。
        name: Cow<'static, str>,
        /// 拒绝原因（抽象形状、未注册等）。
        reason: Cow<'static, str>,
    },

    /// 响应状态码未表示成功，状态码随错误携带。
    #[error("[transport.unsuccessful_response] response status {status} does not indicate success")]
    UnsuccessfulResponse {
        /// 触发失败的状态码。
        status: StatusCode,
    },

    /// 外部编解码器的失败，未经翻译地透传。
    #[error("[codec.failure] codec rejected the payload")]
    Codec {
        /// 编解码器的原始错误。
        #[source]
        source: ErrorCause,
    },

    /// 传输协作方自身的失败，未经翻译地透传。
    #[error("[transport.failure] transport operation failed")]
    Transport {
        /// 传输层的原始错误。
        #[source]
        source: ErrorCause,
    },

    /// 操作被取消信号中止；与编解码失败严格区分。
    #[error("[payload.cancelled] operation `{operation}` was cancelled before completion")]
    Cancelled {
        /// 被中止的操作标识。
        operation: &'static str,
    },
}

impl PayloadError {
    /// 构造参数缺失错误。
    pub fn invalid_argument(name: &'static str) -> Self {
        Self::InvalidArgument { name }
    }

    /// 构造类型不匹配错误，同时点名声明类型与实际类型。
    pub fn type_mismatch(
        declared: impl Into<Cow<'static, str>>,
        actual: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::TypeMismatch {
            declared: declared.into(),
            actual: actual.into(),
        }
    }

    /// 构造类型资格不足错误。
    pub fn unsupported_type(
        name: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::UnsupportedType {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// 包装外部编解码器错误。
    pub fn codec(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Codec {
            source: Box::new(source),
        }
    }

    /// 包装传输协作方错误。
    pub fn transport(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport {
            source: Box::new(source),
        }
    }

    /// 构造取消错误，`operation` 标识被中止的操作。
    pub fn cancelled(operation: &'static str) -> Self {
        Self::Cancelled { operation }
    }

    /// 返回稳定错误码，供日志聚合与测试断言使用。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => codes::INVALID_ARGUMENT,
            Self::TypeMismatch { .. } => codes::TYPE_MISMATCH,
            Self::UnsupportedType { .. } => codes::UNSUPPORTED_TYPE,
            Self::UnsuccessfulResponse { .. } => codes::UNSUCCESSFUL_RESPONSE,
            Self::Codec { .. } => codes::CODEC_FAILURE,
            Self::Transport { .. } => codes::TRANSPORT_FAILURE,
            Self::Cancelled { .. } => codes::CANCELLED,
        }
    }

    /// 是否为取消结果。
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

const _: fn() = || {
    fn assert_error_traits<T: std::error::Error + Send + Sync + 'static>() {}

    assert_error_traits::<PayloadError>();
};
