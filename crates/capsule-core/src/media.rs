use std::borrow::Cow;
use std::fmt;

/// `MediaType` 以 IANA `type/subtype` 约定描述负载的协商标签。
///
/// # 设计背景（Why）
/// - 内容协商的双方需要一个跨实现稳定的格式标识；媒体类型是行业通行
///   做法，与各语言生态天然兼容；
/// - 通过 `Cow<'static, str>` 同时容纳静态常量与运行时协商出的扩展
///   类型，避免不必要的复制。
///
/// # 逻辑解析（How）
/// - `from_static`/`new` 分别接收字面量与动态字符串；
/// - `essence` 去掉 `;` 之后的参数段（如 `q=0.5`），`matches` 在
///   essence 上做 ASCII 大小写无关比较，符合媒体类型的比较规则。
///
/// # 契约说明（What）
/// - **前置条件**：传入值应满足 `type/subtype` 格式，推荐全小写；
/// - **后置条件**：实例可安全克隆、跨线程共享并长期缓存。
///
/// # 风险提示（Trade-offs）
/// - 为保持灵活性并未校验语法合法性；边界系统如需防注入应自行校验。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MediaType(Cow<'static, str>);

impl MediaType {
    /// 以静态字面量创建媒体类型，不触发分配。
    pub const fn from_static(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }

    /// 创建新的媒体类型。
    pub fn new(value: impl Into<Cow<'static, str>>) -> Self {
        Self(value.into())
    }

    /// 返回底层字符串表示。
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 返回去掉参数段后的 `type/subtype` 本体。
    pub fn essence(&self) -> &str {
        match self.0.split_once(';') {
            Some((essence, _)) => essence.trim_end(),
            None => &self.0,
        }
    }

    /// 判断两个媒体类型在协商意义上是否等价。
    ///
    /// 比较发生在 essence 上且忽略 ASCII 大小写，参数段不参与匹配。
    pub fn matches(&self, other: &MediaType) -> bool {
        self.essence().eq_ignore_ascii_case(other.essence())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `FormatDescriptor` 聚合一个格式的规范媒体类型与互操作别名。
///
/// # 设计背景（Why）
/// - 同一二进制格式在现网常存在多个流通中的媒体类型（规范形与历史
///   别名）；解码端必须将它们视为等价，编码端则始终使用规范形；
/// - 将“主类型 + 别名列表”固化为一个不可变描述，协商逻辑只需面对
///   单一入口 [`FormatDescriptor::accepts`]。
///
/// # 契约说明（What）
/// - **前置条件**：`primary` 为编码路径默认使用的规范媒体类型；
/// - **后置条件**：实例不可变，可在进程内长期共享。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatDescriptor {
    primary: MediaType,
    aliases: Vec<MediaType>,
}

impl FormatDescriptor {
    /// 以规范媒体类型构建描述符。
    pub fn new(primary: MediaType) -> Self {
        Self {
            primary,
            aliases: Vec::new(),
        }
    }

    /// 追加一个解码端等价接受的别名。
    pub fn with_alias(mut self, alias: MediaType) -> Self {
        self.aliases.push(alias);
        self
    }

    /// 获取规范媒体类型。
    pub fn primary(&self) -> &MediaType {
        &self.primary
    }

    /// 获取别名列表。
    pub fn aliases(&self) -> &[MediaType] {
        &self.aliases
    }

    /// 遍历全部被认可的媒体类型，规范形在前。
    pub fn recognized(&self) -> impl Iterator<Item = &MediaType> {
        core::iter::once(&self.primary).chain(self.aliases.iter())
    }

    /// 判断给定媒体类型是否被本格式接受。
    pub fn accepts(&self, candidate: &MediaType) -> bool {
        self.recognized().any(|known| known.matches(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// essence 比较忽略大小写与参数段。
    #[test]
    fn matching_ignores_case_and_parameters() {
        let canonical = MediaType::from_static("application/x-msgpack");
        let shouted = MediaType::new("Application/X-MsgPack");
        let with_params = MediaType::new("application/x-msgpack; q=0.8");

        assert!(canonical.matches(&shouted));
        assert!(canonical.matches(&with_params));
        assert_eq!(with_params.essence(), "application/x-msgpack");
    }

    /// 描述符接受规范形与全部别名，拒绝无关类型。
    #[test]
    fn descriptor_accepts_primary_and_aliases_only() {
        let descriptor = FormatDescriptor::new(MediaType::from_static("application/x-msgpack"))
            .with_alias(MediaType::from_static("application/msgpack"));

        assert!(descriptor.accepts(&MediaType::new("application/msgpack")));
        assert!(descriptor.accepts(&MediaType::new("APPLICATION/X-MSGPACK")));
        assert!(!descriptor.accepts(&MediaType::new("application/json")));
        assert_eq!(descriptor.recognized().count(), 2);
    }
}
