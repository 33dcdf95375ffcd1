//! 常用契约的一站式导入，面向格式实现与传输实现双方。

pub use crate::async_trait;
pub use crate::body::{BodyReader, BodySource, BufferedSource, ByteStreamSource, MaterializedBody};
pub use crate::contract::{Cancellation, run_cancellable};
pub use crate::error::{ErrorCause, PayloadError, Result, codes};
pub use crate::media::{FormatDescriptor, MediaType};
pub use crate::payload::{ErasedValue, PayloadType, TypeShape};
pub use crate::transport::{
    Method, OutboundContent, RequestTarget, StatusCode, Transport, TransportRequest,
    TransportResponse,
};
