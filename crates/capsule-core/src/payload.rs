use std::any::{Any, TypeId, type_name};

use crate::error::{PayloadError, Result};

/// 类型形状标签，决定一个声明类型能否被编解码器实例化。
///
/// # 契约说明（What）
/// - `Concrete`：可实例化的具体形状，编码与解码双向合格；
/// - `Abstract`：trait 对象等仅有能力约束、没有具体构造形状的类型，
///   编解码器无法为其选择解码目标，双向均不合格。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeShape {
    /// 具体、可实例化的类型。
    Concrete,
    /// 抽象或仅能力约束的类型（如 trait 对象）。
    Abstract,
}

/// `PayloadType` 是运行时可携带的具象化类型描述符。
///
/// # 设计背景（Why）
/// - 泛型调用点的类型信息由编译器静态保证，但类型擦除的调用形状
///   （以“类型对象”为参数的 API）仍需要一个运行时标签来回答
///   “能否编解码”“值是否属于该类型”两类问题；
/// - 描述符只携带回答这两个问题所需的最小元数据：稳定名称、
///   [`TypeId`] 与形状标签，不引入任何反射机制。
///
/// # 逻辑解析（How）
/// - [`PayloadType::of`] 为具体类型构建描述符，形状恒为 `Concrete`；
/// - [`PayloadType::abstract_of`] 为 trait 对象等不可实例化类型构建
///   `Abstract` 描述符，供资格检查拒绝；
/// - [`PayloadType::ensure_instance`] 在构造期校验擦除值与声明类型的
///   一致性，失败时点名双方类型名。
///
/// # 契约说明（What）
/// - **后置条件**：描述符是 `Copy` 的纯数据，可自由缓存与跨线程传递。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PayloadType {
    name: &'static str,
    id: TypeId,
    shape: TypeShape,
}

impl PayloadType {
    /// 为具体类型构建描述符。
    pub fn of<T>() -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
            shape: TypeShape::Concrete,
        }
    }

    /// 为抽象/仅能力约束的类型构建不可实例化的描述符。
    pub fn abstract_of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
            shape: TypeShape::Abstract,
        }
    }

    /// 获取稳定类型名。
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 获取底层 [`TypeId`]。
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// 获取形状标签。
    pub fn shape(&self) -> TypeShape {
        self.shape
    }

    /// 是否具备可实例化形状。
    pub fn is_instantiable(&self) -> bool {
        matches!(self.shape, TypeShape::Concrete)
    }

    /// 校验擦除值确实属于本声明类型。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：描述符应当可实例化；抽象描述符直接返回
    ///   `payload.unsupported_type`；
    /// - **后置条件**：校验通过意味着后续按本类型 downcast 必定成功；
    ///   失败返回 `payload.type_mismatch` 并点名声明与实际类型。
    pub fn ensure_instance(&self, value: &ErasedValue) -> Result<()> {
        if !self.is_instantiable() {
            return Err(PayloadError::unsupported_type(
                self.name,
                "abstract shapes cannot carry values",
            ));
        }
        if self.id != value.type_id() {
            return Err(PayloadError::type_mismatch(self.name, value.type_name()));
        }
        Ok(())
    }
}

/// `ErasedValue` 是携带自身类型名的擦除值容器。
///
/// # 设计背景（Why）
/// - `dyn Any` 只保留 [`TypeId`]，丢失了类型名；而类型不匹配错误必须
///   同时点名声明类型与实际类型才有排障价值，因此在擦除时把名称一并
///   钉住。
///
/// # 契约说明（What）
/// - **后置条件**：`downcast` 成功即返回原值；失败时原样归还容器，
///   调用方可继续尝试或构造错误。
#[derive(Debug)]
pub struct ErasedValue {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
    type_id: TypeId,
}

impl ErasedValue {
    /// 擦除一个具体值。
    pub fn new<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// 实际值的稳定类型名。
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 实际值的 [`TypeId`]。
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// 以只读方式访问内部值。
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }

    /// 尝试取回具体类型的值；失败时归还自身。
    pub fn downcast<T>(self) -> core::result::Result<T, Self>
    where
        T: Send + Sync + 'static,
    {
        if self.type_id == TypeId::of::<T>() {
            match self.value.downcast::<T>() {
                Ok(boxed) => Ok(*boxed),
                Err(value) => Err(Self {
                    value,
                    type_name: self.type_name,
                    type_id: self.type_id,
                }),
            }
        } else {
            Err(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;

    trait Marker: Send + Sync {}

    /// 具体描述符可实例化，trait 对象描述符不可。
    #[test]
    fn shape_splits_concrete_from_abstract() {
        let concrete = PayloadType::of::<String>();
        let erased = PayloadType::abstract_of::<dyn Marker>();

        assert!(concrete.is_instantiable());
        assert_eq!(concrete.shape(), TypeShape::Concrete);
        assert!(!erased.is_instantiable());
        assert_eq!(erased.shape(), TypeShape::Abstract);
    }

    /// 实例校验：匹配通过，错配点名双方类型，抽象形状直接拒绝。
    #[test]
    fn ensure_instance_validates_and_names_both_sides() {
        let declared = PayloadType::of::<u32>();
        assert!(declared.ensure_instance(&ErasedValue::new(7_u32)).is_ok());

        let err = declared
            .ensure_instance(&ErasedValue::new("seven".to_string()))
            .expect_err("u32 declaration must reject a String value");
        assert_eq!(err.code(), codes::TYPE_MISMATCH);
        let rendered = err.to_string();
        assert!(rendered.contains("u32"));
        assert!(rendered.contains("String"));

        let abstract_decl = PayloadType::abstract_of::<dyn Marker>();
        let err = abstract_decl
            .ensure_instance(&ErasedValue::new(7_u32))
            .expect_err("abstract declarations carry no values");
        assert_eq!(err.code(), codes::UNSUPPORTED_TYPE);
    }

    /// downcast 成功取回原值，失败原样归还容器。
    #[test]
    fn downcast_round_trips_or_returns_container() {
        let erased = ErasedValue::new(41_i64);
        let erased = erased.downcast::<String>().expect_err("wrong type");
        assert_eq!(erased.type_name(), type_name::<i64>());
        assert_eq!(erased.downcast::<i64>().expect("right type"), 41);
    }
}
