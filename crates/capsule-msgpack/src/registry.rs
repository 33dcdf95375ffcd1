use std::any::TypeId;
use std::collections::HashMap;

use bytes::Bytes;
use capsule_core::{ErasedValue, PayloadError, PayloadType, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec;
use crate::content::DynMsgPackContent;
use crate::options::MsgPackOptions;

/// 对象层的擦除编码函数：在注册时单态化生成。
pub(crate) type ErasedEncodeFn = fn(&ErasedValue, &MsgPackOptions) -> Result<Bytes>;

/// 对象层的擦除解码函数：nil 标记解码为 `None`。
pub(crate) type ErasedDecodeFn = fn(&[u8], &MsgPackOptions) -> Result<Option<ErasedValue>>;

#[derive(Clone)]
struct TypeEntry {
    declared: PayloadType,
    encode: ErasedEncodeFn,
    decode: ErasedDecodeFn,
}

/// `MsgPackTypeRegistry` 为类型擦除的调用形状提供编解码回退。
///
/// # 设计背景（Why）
/// - 泛型调用点的编解码能力由 trait 约束在编译期给出；以
///   [`PayloadType`] 为参数的调用点（插件、脚本桥接等）则需要一个
///   运行时注册表，把“类型对象”映射回单态化的编解码函数；
/// - 注册表与泛型层在语义上严格等价：同一个类型经两条路径编出的
///   字节完全相同。
///
/// # 逻辑解析（How）
/// - [`register`](Self::register) 为具体类型登记一条目，内含该类型的
///   描述符与两枚单态化函数指针；
/// - [`content`](Self::content) 构造对象层内容包装器，构造期完成
///   资格与实例校验；
/// - [`decode`](Self::decode) 按声明类型解码字节，结果以
///   [`ErasedValue`] 归还，调用方自行 downcast。
///
/// # 契约说明（What）
/// - **前置条件**：注册表无内部可变性，注册应在装配阶段完成，之后
///   以共享引用分发；
/// - **资格规则**：抽象描述符在查表之前即被拒绝；具体但未注册的
///   描述符以注册缺失为由拒绝，两者共用 `payload.unsupported_type`。
///
/// # 风险提示（Trade-offs）
/// - 相比泛型层，每次调用多一次哈希查找、一次 downcast 与一次装箱；
///   热路径应优先选择泛型 API。
#[derive(Clone, Default)]
pub struct MsgPackTypeRegistry {
    entries: HashMap<TypeId, TypeEntry>,
}

impl MsgPackTypeRegistry {
    /// 构建空注册表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个具体类型。重复登记同一类型是幂等的覆盖。
    pub fn register<T>(&mut self)
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let declared = PayloadType::of::<T>();
        self.entries.insert(
            declared.type_id(),
            TypeEntry {
                declared,
                encode: encode_erased::<T>,
                decode: decode_erased::<T>,
            },
        );
    }

    /// 链式登记，便于装配阶段一次写完。
    pub fn with<T>(mut self) -> Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.register::<T>();
        self
    }

    /// 查询声明类型是否已登记。
    pub fn contains(&self, declared: &PayloadType) -> bool {
        self.entries.contains_key(&declared.type_id())
    }

    /// 为声明类型构造对象层内容包装器。
    ///
    /// # 契约说明（What）
    /// - **校验顺序**：先做资格检查（抽象形状拒绝、未注册拒绝），再做
    ///   实例校验（值的运行时类型必须等于声明类型）；
    /// - **后置条件**：返回的包装器不可变，编码行为与泛型层一致。
    pub fn content(
        &self,
        declared: &PayloadType,
        value: Option<ErasedValue>,
    ) -> Result<DynMsgPackContent> {
        let entry = self.entry(declared)?;
        if let Some(value) = &value {
            declared.ensure_instance(value)?;
        }
        Ok(DynMsgPackContent::from_registry(
            entry.declared,
            value,
            entry.encode,
        ))
    }

    /// 按声明类型解码一段字节；nil 标记产出 `Ok(None)`。
    pub fn decode(
        &self,
        declared: &PayloadType,
        bytes: &[u8],
        options: &MsgPackOptions,
    ) -> Result<Option<ErasedValue>> {
        let entry = self.entry(declared)?;
        (entry.decode)(bytes, options)
    }

    fn entry(&self, declared: &PayloadType) -> Result<&TypeEntry> {
        if !declared.is_instantiable() {
            return Err(PayloadError::unsupported_type(
                declared.name(),
                "abstract shapes have no concrete decode target",
            ));
        }
        self.entries.get(&declared.type_id()).ok_or_else(|| {
            PayloadError::unsupported_type(declared.name(), "type is not registered for erased dispatch")
        })
    }
}

fn encode_erased<T>(value: &ErasedValue, options: &MsgPackOptions) -> Result<Bytes>
where
    T: Serialize + Send + Sync + 'static,
{
    match value.as_any().downcast_ref::<T>() {
        Some(typed) => codec::encode_value(Some(typed), options),
        // 注册表构造路径已校验过实例类型；此分支只防御绕过构造的调用。
        None => Err(PayloadError::type_mismatch(
            std::any::type_name::<T>(),
            value.type_name(),
        )),
    }
}

fn decode_erased<T>(bytes: &[u8], options: &MsgPackOptions) -> Result<Option<ErasedValue>>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let decoded: Option<T> = codec::decode_value(bytes, options)?;
    Ok(decoded.map(ErasedValue::new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsule_core::codes;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: u32,
    }

    trait Opaque: Send + Sync {}

    /// 注册后经对象层编码，与泛型层字节完全一致。
    #[test]
    fn erased_encode_matches_generic_layer() {
        let registry = MsgPackTypeRegistry::new().with::<Sample>();
        let declared = PayloadType::of::<Sample>();

        let erased = registry
            .content(&declared, Some(ErasedValue::new(Sample { id: 42 })))
            .expect("registered type")
            .encode_to_bytes()
            .expect("erased encode");

        let generic = crate::content::MsgPackContent::new(Sample { id: 42 })
            .encode_to_bytes()
            .expect("generic encode");
        assert_eq!(erased, generic);
    }

    /// 解码结果可 downcast 回原始类型，nil 产出 `None`。
    #[test]
    fn erased_decode_round_trips() {
        let registry = MsgPackTypeRegistry::new().with::<Sample>();
        let declared = PayloadType::of::<Sample>();
        let options = MsgPackOptions::new();

        let bytes = codec::encode_value(Some(&Sample { id: 9 }), &options).expect("encode");
        let value = registry
            .decode(&declared, &bytes, &options)
            .expect("decode")
            .expect("value present");
        assert_eq!(value.downcast::<Sample>().expect("right type"), Sample { id: 9 });

        let nil = registry
            .decode(&declared, &[0xc0], &options)
            .expect("decode nil");
        assert!(nil.is_none());
    }

    /// 资格检查：抽象形状与未注册类型都被拒绝，实例错配被点名。
    #[test]
    fn eligibility_and_instance_checks_guard_construction() {
        let registry = MsgPackTypeRegistry::new().with::<Sample>();

        let abstract_decl = PayloadType::abstract_of::<dyn Opaque>();
        let err = registry
            .content(&abstract_decl, None)
            .expect_err("abstract shape");
        assert_eq!(err.code(), codes::UNSUPPORTED_TYPE);

        let unregistered = PayloadType::of::<String>();
        let err = registry
            .content(&unregistered, None)
            .expect_err("unregistered type");
        assert_eq!(err.code(), codes::UNSUPPORTED_TYPE);

        let declared = PayloadType::of::<Sample>();
        let err = registry
            .content(&declared, Some(ErasedValue::new("wrong".to_string())))
            .expect_err("instance mismatch");
        assert_eq!(err.code(), codes::TYPE_MISMATCH);
    }
}
