//! Type descriptors and the builders used by `Reflect::type_info`.

use crate::error::BoxError;
use crate::reflection::cached_type::{SimpleKind, TypeKind};
use crate::reflection::member::{CachedMember, Member};
use crate::reflection::{CachedType, Metadata, Reflect};
use crate::value::{ConversionError, Instance, Value};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// The raw description a type gives of itself. Cached as a [`CachedType`].
#[derive(Clone)]
pub struct TypeInfo {
    name: String,
    kind: TypeKind,
    metadata: Metadata,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            metadata: Metadata::new(),
        }
    }

    pub fn simple(kind: SimpleKind) -> Self {
        Self::new(kind.display_name(), TypeKind::Simple(kind))
    }

    /// Starts describing a struct with members and constructors.
    pub fn object<T: Reflect>(name: impl Into<String>) -> ObjectBuilder<T> {
        ObjectBuilder {
            name: name.into(),
            members: Vec::new(),
            constructors: Vec::new(),
            list_contract: None,
            dict_contract: None,
            metadata: Metadata::new(),
            _marker: PhantomData,
        }
    }

    /// Starts describing a fieldless enum.
    pub fn enumeration<T>(name: impl Into<String>) -> EnumBuilder<T>
    where
        T: Reflect + PartialEq + Send + Sync,
    {
        EnumBuilder {
            name: name.into(),
            variants: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_attribute<A: Any + Send + Sync>(mut self, attribute: A) -> Self {
        self.metadata = self.metadata.with(attribute);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Creates a fresh, empty instance of a collection type.
pub(crate) type CreateFn = Arc<dyn Fn(&CachedType) -> Instance + Send + Sync>;

type ItemsFn = Arc<dyn Fn(&dyn Any) -> Vec<Option<Value>> + Send + Sync>;
type PushFn = Arc<dyn Fn(&dyn Any, Option<Value>) -> Result<(), ConversionError> + Send + Sync>;
type EntriesFn = Arc<dyn Fn(&dyn Any) -> Vec<(Option<Value>, Option<Value>)> + Send + Sync>;
type InsertFn =
    Arc<dyn Fn(&dyn Any, Option<Value>, Option<Value>) -> Result<(), ConversionError> + Send + Sync>;

fn storage<'c, C: Any>(cell: &'c dyn Any) -> Result<&'c RefCell<C>, ConversionError> {
    cell.downcast_ref::<RefCell<C>>().ok_or_else(|| {
        ConversionError::new(format!("storage is not '{}'", std::any::type_name::<C>()))
    })
}

fn busy<C>() -> ConversionError {
    ConversionError::new(format!(
        "'{}' is already borrowed",
        std::any::type_name::<C>()
    ))
}

// -----------------------------------------------------------------------------
// Sequences

/// Access to a sequence stored in an instance cell of type `RefCell<C>`.
///
/// A sequence without `push` is read-only: it can be serialized but not
/// filled. Without `create` no empty instance can be made for it.
#[derive(Clone)]
pub struct ListInfo {
    element: fn() -> CachedType,
    items: ItemsFn,
    push: Option<PushFn>,
    create: Option<CreateFn>,
}

impl ListInfo {
    /// A read-only sequence over container `C` with elements `E`.
    pub fn new<C, E>(items: impl Fn(&C) -> Vec<E> + Send + Sync + 'static) -> Self
    where
        C: Any,
        E: Reflect,
    {
        Self {
            element: E::cached_type,
            items: Arc::new(move |cell: &dyn Any| match storage::<C>(cell) {
                Ok(cell) => cell
                    .try_borrow()
                    .map(|container| items(&*container).iter().map(E::to_value).collect())
                    .unwrap_or_default(),
                Err(_) => Vec::new(),
            }),
            push: None,
            create: None,
        }
    }

    /// The `Vec<E>` layout shared by vectors, boxed slices and `Arc<[E]>`.
    pub fn of_vec<E: Reflect>() -> Self {
        Self::new::<Vec<E>, E>(|items| items.clone())
            .with_push(|items: &mut Vec<E>, item: E| items.push(item))
            .with_create(Vec::<E>::new)
    }

    /// Makes the sequence appendable.
    pub fn with_push<C, E>(mut self, push: impl Fn(&mut C, E) + Send + Sync + 'static) -> Self
    where
        C: Any,
        E: Reflect,
    {
        self.push = Some(Arc::new(move |cell: &dyn Any, value: Option<Value>| {
            let item = E::from_value(value)?;
            let cell = storage::<C>(cell)?;
            let mut container = cell.try_borrow_mut().map_err(|_| busy::<C>())?;
            push(&mut *container, item);
            Ok(())
        }));
        self
    }

    /// Lets the default factory create an empty container.
    pub fn with_create<C: Any>(mut self, create: impl Fn() -> C + Send + Sync + 'static) -> Self {
        self.create = Some(Arc::new(move |ty: &CachedType| {
            Instance::with_type(ty.clone(), create())
        }));
        self
    }

    pub fn element(&self) -> CachedType {
        (self.element)()
    }

    pub fn items(&self, instance: &Instance) -> Vec<Option<Value>> {
        (self.items)(instance.cell())
    }

    pub fn can_push(&self) -> bool {
        self.push.is_some()
    }

    pub fn push(&self, instance: &Instance, value: Option<Value>) -> Result<(), ConversionError> {
        match &self.push {
            Some(push) => push(instance.cell(), value),
            None => Err(ConversionError::new(format!(
                "'{}' is read-only",
                instance.ty().name()
            ))),
        }
    }

    pub(crate) fn create(&self, ty: &CachedType) -> Option<Instance> {
        self.create.as_ref().map(|create| create(ty))
    }
}

impl fmt::Debug for ListInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListInfo")
            .field("element", &self.element().name())
            .field("push", &self.push.is_some())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Dictionaries

/// Access to a key/value container stored in an instance cell.
#[derive(Clone)]
pub struct DictionaryInfo {
    key: fn() -> CachedType,
    value: fn() -> CachedType,
    entries: EntriesFn,
    insert: Option<InsertFn>,
    create: Option<CreateFn>,
}

impl DictionaryInfo {
    /// A read-only dictionary over container `C`.
    pub fn new<C, K, V>(entries: impl Fn(&C) -> Vec<(K, V)> + Send + Sync + 'static) -> Self
    where
        C: Any,
        K: Reflect,
        V: Reflect,
    {
        Self {
            key: K::cached_type,
            value: V::cached_type,
            entries: Arc::new(move |cell: &dyn Any| match storage::<C>(cell) {
                Ok(cell) => cell
                    .try_borrow()
                    .map(|container| {
                        entries(&*container)
                            .iter()
                            .map(|(key, value)| (key.to_value(), value.to_value()))
                            .collect()
                    })
                    .unwrap_or_default(),
                Err(_) => Vec::new(),
            }),
            insert: None,
            create: None,
        }
    }

    /// Makes the dictionary writable. Inserting an existing key replaces it.
    pub fn with_insert<C, K, V>(mut self, insert: impl Fn(&mut C, K, V) + Send + Sync + 'static) -> Self
    where
        C: Any,
        K: Reflect,
        V: Reflect,
    {
        self.insert = Some(Arc::new(move |cell: &dyn Any, key: Option<Value>, value: Option<Value>| {
            let key = K::from_value(key)?;
            let value = V::from_value(value)?;
            let cell = storage::<C>(cell)?;
            let mut container = cell.try_borrow_mut().map_err(|_| busy::<C>())?;
            insert(&mut *container, key, value);
            Ok(())
        }));
        self
    }

    pub fn with_create<C: Any>(mut self, create: impl Fn() -> C + Send + Sync + 'static) -> Self {
        self.create = Some(Arc::new(move |ty: &CachedType| {
            Instance::with_type(ty.clone(), create())
        }));
        self
    }

    pub fn key_type(&self) -> CachedType {
        (self.key)()
    }

    pub fn value_type(&self) -> CachedType {
        (self.value)()
    }

    pub fn entries(&self, instance: &Instance) -> Vec<(Option<Value>, Option<Value>)> {
        (self.entries)(instance.cell())
    }

    pub fn can_insert(&self) -> bool {
        self.insert.is_some()
    }

    pub fn insert(
        &self,
        instance: &Instance,
        key: Option<Value>,
        value: Option<Value>,
    ) -> Result<(), ConversionError> {
        match &self.insert {
            Some(insert) => insert(instance.cell(), key, value),
            None => Err(ConversionError::new(format!(
                "'{}' is read-only",
                instance.ty().name()
            ))),
        }
    }

    pub(crate) fn create(&self, ty: &CachedType) -> Option<Instance> {
        self.create.as_ref().map(|create| create(ty))
    }
}

impl fmt::Debug for DictionaryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictionaryInfo")
            .field("key", &self.key_type().name())
            .field("value", &self.value_type().name())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Enums

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    name: String,
    discriminant: i64,
}

impl EnumVariant {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn discriminant(&self) -> i64 {
        self.discriminant
    }
}

/// Variant table of a fieldless enum.
#[derive(Clone)]
pub struct EnumInfo {
    variants: Arc<[EnumVariant]>,
    position: Arc<dyn Fn(&dyn Any) -> Option<usize> + Send + Sync>,
    instantiate: Arc<dyn Fn(usize) -> Option<Box<dyn Any>> + Send + Sync>,
}

impl EnumInfo {
    pub fn variants(&self) -> &[EnumVariant] {
        &self.variants
    }

    /// Index of the variant `value` holds.
    pub fn position(&self, value: &dyn Any) -> Option<usize> {
        (self.position)(value)
    }

    pub fn instantiate(&self, index: usize) -> Option<Box<dyn Any>> {
        (self.instantiate)(index)
    }

    pub fn index_of_name(&self, name: &str, case_sensitive: bool) -> Option<usize> {
        self.variants.iter().position(|variant| {
            if case_sensitive {
                variant.name == name
            } else {
                variant.name.eq_ignore_ascii_case(name)
            }
        })
    }

    pub fn index_of_discriminant(&self, discriminant: i64) -> Option<usize> {
        self.variants
            .iter()
            .position(|variant| variant.discriminant == discriminant)
    }
}

impl fmt::Debug for EnumInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.variants.iter()).finish()
    }
}

pub struct EnumBuilder<T> {
    name: String,
    variants: Vec<(EnumVariant, T)>,
    metadata: Metadata,
}

impl<T> EnumBuilder<T>
where
    T: Reflect + PartialEq + Send + Sync,
{
    pub fn variant(mut self, name: impl Into<String>, value: T, discriminant: i64) -> Self {
        let variant = EnumVariant {
            name: name.into(),
            discriminant,
        };
        self.variants.push((variant, value));
        self
    }

    pub fn attribute<A: Any + Send + Sync>(mut self, attribute: A) -> Self {
        self.metadata = self.metadata.with(attribute);
        self
    }

    pub fn build(self) -> TypeInfo {
        let (variants, values): (Vec<_>, Vec<_>) = self.variants.into_iter().unzip();
        let values: Arc<[T]> = values.into();
        let lookup = values.clone();
        let info = EnumInfo {
            variants: variants.into(),
            position: Arc::new(move |value: &dyn Any| {
                let value = value.downcast_ref::<T>()?;
                lookup.iter().position(|candidate| candidate == value)
            }),
            instantiate: Arc::new(move |index: usize| {
                values
                    .get(index)
                    .map(|value| Box::new(value.clone()) as Box<dyn Any>)
            }),
        };
        TypeInfo {
            name: self.name,
            kind: TypeKind::Enum(info),
            metadata: self.metadata,
        }
    }
}

// -----------------------------------------------------------------------------
// Objects

/// A dependency handed to constructors through the object factory.
pub type Dependency = Arc<dyn Any + Send + Sync>;

type InvokeFn = Arc<dyn Fn(&[Dependency]) -> Result<Value, BoxError> + Send + Sync>;

#[derive(Clone)]
struct Parameter {
    type_name: &'static str,
    matches: fn(&(dyn Any + Send + Sync)) -> bool,
}

fn is_dependency<D: Any>(candidate: &(dyn Any + Send + Sync)) -> bool {
    candidate.is::<D>()
}

fn find_dependency<D: Any>(dependencies: &[Dependency]) -> Result<&D, BoxError> {
    dependencies
        .iter()
        .find_map(|dependency| (**dependency).downcast_ref::<D>())
        .ok_or_else(|| format!("missing dependency '{}'", std::any::type_name::<D>()).into())
}

/// One way of creating an instance of an object type.
#[derive(Clone)]
pub struct Constructor {
    parameters: Arc<[Parameter]>,
    invoke: InvokeFn,
}

impl Constructor {
    pub fn new<T: Reflect>(create: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            parameters: Vec::new().into(),
            invoke: Arc::new(move |_: &[Dependency]| Ok(Value::Instance(Instance::new(create())))),
        }
    }

    /// A constructor that may fail; the factory then tries the next one.
    pub fn try_new<T: Reflect>(
        create: impl Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            parameters: Vec::new().into(),
            invoke: Arc::new(move |_: &[Dependency]| create().map(|value| Value::Instance(Instance::new(value)))),
        }
    }

    pub fn with_dependency<D, T>(create: impl Fn(&D) -> T + Send + Sync + 'static) -> Self
    where
        D: Any,
        T: Reflect,
    {
        Self {
            parameters: vec![Parameter {
                type_name: std::any::type_name::<D>(),
                matches: is_dependency::<D>,
            }]
            .into(),
            invoke: Arc::new(move |dependencies: &[Dependency]| {
                let dependency = find_dependency::<D>(dependencies)?;
                Ok(Value::Instance(Instance::new(create(dependency))))
            }),
        }
    }

    pub fn with_dependencies<A, B, T>(create: impl Fn(&A, &B) -> T + Send + Sync + 'static) -> Self
    where
        A: Any,
        B: Any,
        T: Reflect,
    {
        Self {
            parameters: vec![
                Parameter {
                    type_name: std::any::type_name::<A>(),
                    matches: is_dependency::<A>,
                },
                Parameter {
                    type_name: std::any::type_name::<B>(),
                    matches: is_dependency::<B>,
                },
            ]
            .into(),
            invoke: Arc::new(move |dependencies: &[Dependency]| {
                let first = find_dependency::<A>(dependencies)?;
                let second = find_dependency::<B>(dependencies)?;
                Ok(Value::Instance(Instance::new(create(first, second))))
            }),
        }
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter_names(&self) -> Vec<&'static str> {
        self.parameters.iter().map(|p| p.type_name).collect()
    }

    /// Whether every parameter can be taken from `dependencies`.
    pub fn is_satisfied_by(&self, dependencies: &[Dependency]) -> bool {
        self.parameters.iter().all(|parameter| {
            dependencies
                .iter()
                .any(|dependency| (parameter.matches)(&**dependency))
        })
    }

    pub fn invoke(&self, dependencies: &[Dependency]) -> Result<Value, BoxError> {
        (self.invoke)(dependencies)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor({})", self.parameter_names().join(", "))
    }
}

/// Members, constructors and implemented collection contracts of a struct.
#[derive(Clone)]
pub struct ObjectInfo {
    members: Arc<[CachedMember]>,
    constructors: Arc<[Constructor]>,
    list_contract: Option<ListInfo>,
    dict_contract: Option<DictionaryInfo>,
}

impl ObjectInfo {
    pub fn members(&self) -> &[CachedMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&CachedMember> {
        self.members.iter().find(|member| member.name() == name)
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn list_contract(&self) -> Option<&ListInfo> {
        self.list_contract.as_ref()
    }

    pub fn dictionary_contract(&self) -> Option<&DictionaryInfo> {
        self.dict_contract.as_ref()
    }
}

impl fmt::Debug for ObjectInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectInfo")
            .field(
                "members",
                &self.members.iter().map(CachedMember::name).collect::<Vec<_>>(),
            )
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

pub struct ObjectBuilder<T> {
    name: String,
    members: Vec<Member<T>>,
    constructors: Vec<Constructor>,
    list_contract: Option<ListInfo>,
    dict_contract: Option<DictionaryInfo>,
    metadata: Metadata,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Reflect> ObjectBuilder<T> {
    pub fn member(mut self, member: Member<T>) -> Self {
        self.members.push(member);
        self
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Registers `T::default` as a zero-argument constructor.
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(Constructor::new(T::default))
    }

    /// Declares that `T` also behaves as a sequence.
    pub fn implements_list(mut self, contract: ListInfo) -> Self {
        self.list_contract = Some(contract);
        self
    }

    /// Declares that `T` also behaves as a dictionary.
    pub fn implements_dictionary(mut self, contract: DictionaryInfo) -> Self {
        self.dict_contract = Some(contract);
        self
    }

    pub fn attribute<A: Any + Send + Sync>(mut self, attribute: A) -> Self {
        self.metadata = self.metadata.with(attribute);
        self
    }

    pub fn build(self) -> TypeInfo {
        let declaring: Arc<str> = self.name.as_str().into();
        let members = self
            .members
            .into_iter()
            .map(|member| member.build(declaring.clone()))
            .collect::<Vec<_>>();
        TypeInfo {
            name: self.name,
            kind: TypeKind::Object(ObjectInfo {
                members: members.into(),
                constructors: self.constructors.into(),
                list_contract: self.list_contract,
                dict_contract: self.dict_contract,
            }),
            metadata: self.metadata,
        }
    }
}
