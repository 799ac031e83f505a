use crate::reflection::{CachedType, ItemName, Metadata, Reflect, Rename};
use crate::value::{ConversionError, Instance, Value};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    NonPublic,
}

type Getter = Arc<dyn Fn(&dyn Any) -> Result<Option<Value>, ConversionError> + Send + Sync>;
type Setter = Arc<dyn Fn(&dyn Any, Option<Value>) -> Result<(), ConversionError> + Send + Sync>;

fn owner<'c, T: Any>(cell: &'c dyn Any) -> Result<&'c RefCell<T>, ConversionError> {
    cell.downcast_ref::<RefCell<T>>().ok_or_else(|| {
        ConversionError::new(format!("instance is not '{}'", std::any::type_name::<T>()))
    })
}

fn read_with<T, F>(get: impl Fn(&T) -> F + Send + Sync + 'static) -> Getter
where
    T: Any,
    F: Reflect,
{
    Arc::new(move |cell: &dyn Any| {
        let target = owner::<T>(cell)?.try_borrow().map_err(|_| {
            ConversionError::new(format!(
                "'{}' is being modified",
                std::any::type_name::<T>()
            ))
        })?;
        Ok(get(&*target).to_value())
    })
}

fn write_with<T, F>(set: impl Fn(&mut T, F) + Send + Sync + 'static) -> Setter
where
    T: Any,
    F: Reflect,
{
    Arc::new(move |cell: &dyn Any, value: Option<Value>| {
        let value = F::from_value(value)?;
        let mut target = owner::<T>(cell)?.try_borrow_mut().map_err(|_| {
            ConversionError::new(format!(
                "'{}' is already borrowed",
                std::any::type_name::<T>()
            ))
        })?;
        set(&mut *target, value);
        Ok(())
    })
}

/// Declares one member of `T` inside [`TypeInfo::object`](crate::reflection::TypeInfo::object).
pub struct Member<T> {
    name: String,
    ty: fn() -> CachedType,
    kind: MemberKind,
    visibility: Visibility,
    getter: Option<Getter>,
    setter: Option<Setter>,
    metadata: Metadata,
    contract: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Reflect> Member<T> {
    fn declare<F: Reflect>(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            ty: F::cached_type,
            kind,
            visibility: Visibility::Public,
            getter: None,
            setter: None,
            metadata: Metadata::new(),
            contract: false,
            _marker: PhantomData,
        }
    }

    /// A readable and writable property.
    pub fn property<F: Reflect>(
        name: impl Into<String>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> Self {
        let mut member = Self::declare::<F>(name, MemberKind::Property);
        member.getter = Some(read_with(move |target: &T| get(target).clone()));
        member.setter = Some(write_with(set));
        member
    }

    /// A plain field. Fields are only mapped when field inclusion is enabled.
    pub fn field<F: Reflect>(
        name: impl Into<String>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> Self {
        let mut member = Self::property(name, get, set);
        member.kind = MemberKind::Field;
        member
    }

    /// A read-only property whose value is computed.
    pub fn getter<F: Reflect>(
        name: impl Into<String>,
        get: impl Fn(&T) -> F + Send + Sync + 'static,
    ) -> Self {
        let mut member = Self::declare::<F>(name, MemberKind::Property);
        member.getter = Some(read_with(get));
        member
    }

    /// A write-only property.
    pub fn setter<F: Reflect>(
        name: impl Into<String>,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> Self {
        let mut member = Self::declare::<F>(name, MemberKind::Property);
        member.setter = Some(write_with(set));
        member
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    pub fn with_attribute<A: Any + Send + Sync>(mut self, attribute: A) -> Self {
        self.metadata = self.metadata.with(attribute);
        self
    }

    pub fn ignored(self) -> Self {
        self.with_attribute(crate::reflection::Ignore)
    }

    pub fn renamed(self, name: impl Into<String>) -> Self {
        self.with_attribute(Rename(name.into()))
    }

    pub fn item_name(self, name: impl Into<String>) -> Self {
        self.with_attribute(ItemName(name.into()))
    }

    /// Marks the member as part of an implemented collection contract.
    pub fn from_contract(mut self) -> Self {
        self.contract = true;
        self
    }

    pub(crate) fn build(self, declaring_type: Arc<str>) -> CachedMember {
        CachedMember(Arc::new(MemberData {
            name: self.name,
            declaring_type,
            ty: self.ty,
            kind: self.kind,
            visibility: self.visibility,
            getter: self.getter,
            setter: self.setter,
            metadata: self.metadata,
            contract: self.contract,
        }))
    }
}

struct MemberData {
    name: String,
    declaring_type: Arc<str>,
    ty: fn() -> CachedType,
    kind: MemberKind,
    visibility: Visibility,
    getter: Option<Getter>,
    setter: Option<Setter>,
    metadata: Metadata,
    contract: bool,
}

/// A cached property or field of an object type.
#[derive(Clone)]
pub struct CachedMember(Arc<MemberData>);

impl CachedMember {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn declaring_type(&self) -> &str {
        &self.0.declaring_type
    }

    pub fn ty(&self) -> CachedType {
        (self.0.ty)()
    }

    pub fn kind(&self) -> MemberKind {
        self.0.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.0.visibility
    }

    pub fn is_public(&self) -> bool {
        self.0.visibility == Visibility::Public
    }

    pub fn is_field(&self) -> bool {
        self.0.kind == MemberKind::Field
    }

    pub fn is_property(&self) -> bool {
        self.0.kind == MemberKind::Property
    }

    pub fn can_read(&self) -> bool {
        self.0.getter.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.0.setter.is_some()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.0.metadata
    }

    pub fn is_contract(&self) -> bool {
        self.0.contract
    }

    pub fn get(&self, instance: &Instance) -> Result<Option<Value>, ConversionError> {
        match &self.0.getter {
            Some(getter) => getter(instance.cell()),
            None => Err(ConversionError::new(format!("'{}' is not readable", self.name()))),
        }
    }

    pub fn set(&self, instance: &Instance, value: Option<Value>) -> Result<(), ConversionError> {
        match &self.0.setter {
            Some(setter) => setter(instance.cell(), value),
            None => Err(ConversionError::new(format!("'{}' is not writable", self.name()))),
        }
    }
}

impl PartialEq for CachedMember {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CachedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} ({:?}, {:?})",
            self.declaring_type(),
            self.name(),
            self.kind(),
            self.visibility()
        )
    }
}
