#![deny(unsafe_code)]
#![doc = r#"
# capsule-core

## 设计动机（Why）
- **定位**：本 crate 定义 capsule 内容层的全部契约：类型化负载描述、
  媒体类型协商元数据、请求体来源、抽象传输边界以及统一的错误域。
- **架构角色**：具体格式实现（如 `capsule-msgpack`）只依赖这里声明的
  trait 与数据结构，不感知任何编解码细节；传输实现则站在另一侧，
  仅消费 [`transport`] 模块暴露的请求/响应形状。
- **设计理念**：契约先行。取消、错误分类与资源释放语义在此处一次性
  约定，格式层与传输层都不得私自扩展或弱化。

## 核心契约（What）
- **错误域**：[`error::PayloadError`] 携带稳定错误码，所有公开操作
  的失败都收敛到这一封闭分类；
- **取消原语**：[`contract::Cancellation`] 为跨层共享的轻量取消位，
  [`contract::run_cancellable`] 负责把它注入任何可挂起操作；
- **请求体联合**：[`body::BodySource`] 区分“已物化的值”与“可读字节
  流”两种来源，解码端按标签分派而非运行时探测；
- **传输边界**：[`transport::Transport`] 只要求“构造请求、发送、取回
  状态与请求体”，不承诺任何 HTTP 细节。

## 实现策略（How）
- 异步契约统一通过 [`async_trait`] 保持对象安全；
- 字节流读写依赖 Tokio 的 `AsyncRead`/`AsyncWrite`，调用方可自由桥接
  到任意 I/O 栈；
- [`test_stubs`] 提供可脚本化的传输桩与计数字节源，作为稳定测试 API
  随本 crate 发布。

## 风险与考量（Trade-offs）
- 取消原语不含唤醒机制，异步路径通过周期轮询感知取消，极端场景下
  存在一个轮询周期内的感知延迟；
- 传输边界刻意不建模重定向、连接管理等完整 HTTP 语义，需要这些能力
  的实现方应在自己的层内解决。
"#]

pub use async_trait::async_trait;

pub mod body;
pub mod contract;
pub mod error;
pub mod media;
pub mod payload;
pub mod prelude;
pub mod test_stubs;
pub mod transport;

pub use body::{BodyReader, BodySource, BufferedSource, ByteStreamSource, MaterializedBody};
pub use contract::{Cancellation, run_cancellable};
pub use error::{ErrorCause, PayloadError, Result, codes};
pub use media::{FormatDescriptor, MediaType};
pub use payload::{ErasedValue, PayloadType, TypeShape};
pub use transport::{
    Method, OutboundContent, RequestTarget, StatusCode, Transport, TransportRequest,
    TransportResponse,
};
