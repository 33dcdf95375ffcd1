use std::borrow::Cow;
use std::fmt;

use tokio::io::AsyncWrite;
use url::Url;

use crate::async_trait;
use crate::body::BodySource;
use crate::contract::Cancellation;
use crate::error::Result;
use crate::media::MediaType;

/// 本层认可的请求方法；拉取只用 `Get`，写入只用 `Post`/`Put`。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// 读取资源。
    Get,
    /// 创建/提交资源。
    Post,
    /// 覆盖资源。
    Put,
}

impl Method {
    /// 返回方法的线上表示。
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

/// 响应状态码的最小封装，只约定“是否成功”一个判定。
///
/// # 契约说明（What）
/// - `is_success` 以 2xx 为成功区间；本层不解释其余语义（重定向、
///   鉴权等均属完整 HTTP 语义，超出边界）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// 以裸数值构建状态码。
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// 返回裸数值。
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// 是否表示成功（2xx）。
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 请求目标，接受原始字符串或已解析的 URL 两种形态。
///
/// # 设计背景（Why）
/// - 调用方手里可能只有字符串，也可能已经持有结构化 URL；两种输入
///   形态等价，收敛到同一表示后走完全相同的发送路径；
/// - 目标字符串的合法性由传输协作方负责裁决，本层只拦截“明显为空”
///   这一种在任何传输下都无意义的输入。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestTarget {
    /// 未解析的原始目标。
    Raw(Cow<'static, str>),
    /// 已解析的 URL。
    Parsed(Url),
}

impl RequestTarget {
    /// 返回目标的字符串表示。
    pub fn as_str(&self) -> &str {
        match self {
            Self::Raw(raw) => raw,
            Self::Parsed(url) => url.as_str(),
        }
    }

    /// 目标是否为空。
    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl From<&'static str> for RequestTarget {
    fn from(value: &'static str) -> Self {
        Self::Raw(Cow::Borrowed(value))
    }
}

impl From<String> for RequestTarget {
    fn from(value: String) -> Self {
        Self::Raw(Cow::Owned(value))
    }
}

impl From<Url> for RequestTarget {
    fn from(value: Url) -> Self {
        Self::Parsed(value)
    }
}

impl fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `OutboundContent` 是“按需序列化”的出站请求体契约。
///
/// # 设计背景（Why）
/// - 值在构造请求时并不立即编码；字节只在传输层真正索要时产生，
///   这既省去无谓的物化，也让取消可以在产生任何字节之前生效；
/// - 长度在编码完成前不可知，因此 `content_length` 返回 `None` 时
///   传输层必须采用分块/不定长封帧。
///
/// # 契约说明（What）
/// - `media_type`：本请求体的协商标签，编码端据此填充内容类型头；
/// - `write_to`：把编码结果流式写入给定 sink；逻辑上每次发送调用
///   一次。重复调用是允许的（实现必须保持幂等），但每次都会完整
///   重新编码，字节不做缓存；
/// - **取消语义**：实现必须在产生字节之前检查取消信号，并在整个
///   写入期间保持对信号的响应。
#[async_trait]
pub trait OutboundContent: Send + Sync {
    /// 请求体的媒体类型。
    fn media_type(&self) -> &MediaType;

    /// 编码前可知的内容长度；`None` 表示不可知，需不定长封帧。
    fn content_length(&self) -> Option<u64>;

    /// 把编码结果流式写入 sink。
    async fn write_to(
        &self,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        cancel: &Cancellation,
    ) -> Result<()>;
}

/// 出站请求：方法、目标、可接受的媒体类型与可选请求体。
///
/// # 契约说明（What）
/// - `accept` 列表的顺序即偏好顺序，传输层应按序写入接受头；
/// - `content` 为 `None` 时请求不携带请求体（典型为 `Get`）。
#[derive(Debug)]
pub struct TransportRequest {
    method: Method,
    target: RequestTarget,
    accept: Vec<MediaType>,
    content: Option<Box<dyn OutboundContent>>,
}

impl fmt::Debug for dyn OutboundContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundContent")
            .field("media_type", self.media_type())
            .field("content_length", &self.content_length())
            .finish()
    }
}

impl TransportRequest {
    /// 构建不带请求体的请求。
    pub fn new(method: Method, target: RequestTarget) -> Self {
        Self {
            method,
            target,
            accept: Vec::new(),
            content: None,
        }
    }

    /// 追加一个可接受的媒体类型。
    pub fn with_accept(mut self, media_type: MediaType) -> Self {
        self.accept.push(media_type);
        self
    }

    /// 附上出站请求体。
    pub fn with_content(mut self, content: Box<dyn OutboundContent>) -> Self {
        self.content = Some(content);
        self
    }

    /// 请求方法。
    pub fn method(&self) -> Method {
        self.method
    }

    /// 请求目标。
    pub fn target(&self) -> &RequestTarget {
        &self.target
    }

    /// 可接受的媒体类型列表，按偏好排序。
    pub fn accept(&self) -> &[MediaType] {
        &self.accept
    }

    /// 只读访问请求体。
    pub fn content(&self) -> Option<&dyn OutboundContent> {
        self.content.as_deref()
    }

    /// 拆解为各组成部分，供传输实现消费请求体。
    pub fn into_parts(
        self,
    ) -> (
        Method,
        RequestTarget,
        Vec<MediaType>,
        Option<Box<dyn OutboundContent>>,
    ) {
        (self.method, self.target, self.accept, self.content)
    }
}

/// 入站响应：状态码与请求体来源。
#[derive(Debug)]
pub struct TransportResponse {
    status: StatusCode,
    body: BodySource,
}

impl TransportResponse {
    /// 以状态码与请求体构建响应。
    pub fn new(status: StatusCode, body: BodySource) -> Self {
        Self { status, body }
    }

    /// 响应状态码。
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// 只读访问请求体来源。
    pub fn body(&self) -> &BodySource {
        &self.body
    }

    /// 取出请求体来源。
    pub fn into_body(self) -> BodySource {
        self.body
    }
}

/// `Transport` 是本层面向外部协作方的发送边界。
///
/// # 设计背景（Why）
/// - 内容层只需要“构造请求、异步发送、取回状态与请求体”三件事；
///   连接管理、重试、完整 HTTP 语义都是协作方的内政；
/// - trait 保持对象安全，调用方可以通过 `Arc<dyn Transport>` 注入
///   任意实现（真实客户端或测试桩）。
///
/// # 契约说明（What）
/// - **取消语义**：实现应在挂起点响应 `cancel`；取消结果以
///   `payload.cancelled` 上浮；
/// - **错误语义**：寻址失败、I/O 失败等传输自身的错误以
///   `transport.failure` 包装后原样上浮，本层不做翻译。
#[async_trait]
pub trait Transport: Send + Sync {
    /// 发送请求并取回响应。
    async fn send(
        &self,
        request: TransportRequest,
        cancel: &Cancellation,
    ) -> Result<TransportResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2xx 判定为成功，其余一律失败。
    #[test]
    fn status_success_window_is_2xx() {
        assert!(StatusCode::new(200).is_success());
        assert!(StatusCode::new(299).is_success());
        assert!(!StatusCode::new(199).is_success());
        assert!(!StatusCode::new(300).is_success());
        assert!(!StatusCode::new(500).is_success());
    }

    /// 字符串与已解析 URL 两种目标形态收敛到同一表示。
    #[test]
    fn request_target_forms_converge() {
        let raw = RequestTarget::from("https://example.test/values");
        let parsed =
            RequestTarget::from(Url::parse("https://example.test/values").expect("valid url"));
        assert_eq!(raw.as_str(), parsed.as_str());
        assert!(!raw.is_empty());
        assert!(RequestTarget::from(String::new()).is_empty());
    }

    /// 请求构建器保持接受列表的声明顺序。
    #[test]
    fn request_builder_preserves_accept_order() {
        let request = TransportRequest::new(Method::Get, "https://example.test".into())
            .with_accept(MediaType::from_static("application/x-msgpack"))
            .with_accept(MediaType::from_static("application/msgpack"));

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.accept().len(), 2);
        assert_eq!(request.accept()[0].as_str(), "application/x-msgpack");
        assert!(request.content().is_none());
    }
}
