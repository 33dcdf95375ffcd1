/// 结构体字段到 MessagePack 形状的解析策略。
///
/// # 设计背景（Why）
/// - MessagePack 对结构体有两种流通编码：以字段名为键的 map（自描述，
///   与异构生产者互操作性好）与按声明顺序排列的数组（紧凑，要求双方
///   共享字段顺序约定）；
/// - 该选择就是本格式的“schema 解析策略”，必须在编码端固定下来并由
///   双方约定一致。
///
/// # 契约说明（What）
/// - `Named`：字段名作键的 map 编码，默认值；
/// - `Indexed`：按声明顺序的数组编码；
/// - 解码端同时接受两种形状，故该策略只约束编码方向。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FieldResolution {
    /// 字段名作键的 map 编码。
    #[default]
    Named,
    /// 按声明顺序的数组编码。
    Indexed,
}

/// `MsgPackOptions` 是传递给外部编解码器的不透明选项包。
///
/// # 设计背景（Why）
/// - 内容层对选项内容不做任何解释，只负责缺省替换与原样转发；选项的
///   含义完全由编解码边界定义；
/// - 一份共享实例（见 [`crate::defaults::options`]）服务所有未显式
///   覆盖的包装器；调用方自备的实例归该包装器独占引用，绝不被修改。
///
/// # 契约说明（What）
/// - **后置条件**：实例构造后不可变；`with_*` 方法返回新值而非原地
///   修改，适合链式构建。
///
/// # 风险提示（Trade-offs）
/// - 结构体标注 `#[non_exhaustive]`，跨 crate 构造必须经由
///   [`MsgPackOptions::new`]，为未来追加选项保留余地。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct MsgPackOptions {
    field_resolution: FieldResolution,
}

impl MsgPackOptions {
    /// 构建默认选项（`Named` 解析策略）。
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定字段解析策略。
    pub fn with_field_resolution(mut self, resolution: FieldResolution) -> Self {
        self.field_resolution = resolution;
        self
    }

    /// 获取字段解析策略。
    pub fn field_resolution(&self) -> FieldResolution {
        self.field_resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 默认策略是自描述的 map 编码。
    #[test]
    fn default_resolution_is_named() {
        assert_eq!(MsgPackOptions::new().field_resolution(), FieldResolution::Named);
    }

    /// 构建器返回新值，原实例保持不变。
    #[test]
    fn builder_returns_new_value() {
        let base = MsgPackOptions::new();
        let indexed = base.clone().with_field_resolution(FieldResolution::Indexed);
        assert_eq!(base.field_resolution(), FieldResolution::Named);
        assert_eq!(indexed.field_resolution(), FieldResolution::Indexed);
    }
}
