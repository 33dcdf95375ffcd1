#![deny(unsafe_code)]
#![doc = r#"
# capsule-msgpack

## 设计动机（Why）
- **定位**：基于 `capsule-core` 契约的 MessagePack 格式实现，提供类型化
  内容包装、媒体类型协商与面向传输的客户端操作三件套。
- **架构角色**：外部编解码器（`rmp-serde`）负责字节级算法，本 crate 只
  回答三个问题：这个类型能不能编/解码、这段请求体要不要真的解码、
  值何时以何种形式变成字节。
- **设计理念**：泛型层与对象层等价。编译期类型已知的调用点走
  [`MsgPackContent`] / [`MsgPackFormat::read_body`] 的零成本路径；以
  [`PayloadType`](capsule_core::PayloadType) 为参数的类型擦除调用点经
  [`MsgPackTypeRegistry`] 获得完全相同的语义。

## 核心契约（What）
- **格式默认值**：[`defaults`] 给出规范媒体类型 `application/x-msgpack`、
  互操作别名 `application/msgpack` 与进程级共享的默认序列化选项；
- **内容包装**：[`MsgPackContent`] 持有不可变的
  `(声明类型, 值, 选项, 媒体类型)` 四元组，字节在传输层索要时才产生，
  空缺值编码为 MessagePack nil 标记而非零长度请求体；
- **协商与解码**：[`MsgPackFormat`] 的资格规则是“具体形状即合格”，
  解码遵循固定短路顺序：已物化的值 → 零长度请求体 → 编解码器；
- **客户端操作**：[`MsgPackTransportExt`] 为任意
  [`Transport`](capsule_core::Transport) 补齐拉取解码与编码发送流程。

## 风险与考量（Trade-offs）
- 编码路径先在内存中物化完整字节再写入 sink：MessagePack 无法在编码
  前得知长度，分块写入的收益有限，换来的是实现与取消语义的简单；
- 对象层每次调用多一次 downcast 与装箱；热路径应优先使用泛型层。
"#]

mod codec;

pub mod client;
pub mod content;
pub mod defaults;
pub mod format;
pub mod options;
pub mod registry;

pub use client::MsgPackTransportExt;
pub use content::{DynMsgPackContent, MsgPackContent};
pub use format::MsgPackFormat;
pub use options::{FieldResolution, MsgPackOptions};
pub use registry::MsgPackTypeRegistry;
