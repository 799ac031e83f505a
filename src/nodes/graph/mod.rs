//! Object-graph nodes: the [`Node`] view of a typed value.
//!
//! A [`GraphNode`] wraps one position of an object graph. Serializing walks
//! its children, which are built on the fly from the instance; deserializing
//! adds children to it, each bound to the member, list or dictionary it is
//! written back into once it has been filled.

mod dictionary;
mod enumerable;
pub(crate) mod lazy;
mod object;
mod value;

use super::{Element, Mode, Node, NodeType};
use crate::error::MappingError;
use crate::factory;
use crate::options::Options;
use crate::reflection::{CachedMember, CachedType, DictionaryInfo, ListInfo, Metadata, ObjectInfo, TypeKind};
use crate::value::{Instance, Value};
use lazy::ValueSource;
use std::cell::Cell;
use std::rc::Rc;

/// Materialization state of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Nothing was read or written yet.
    Uninitialized,
    Initialized,
    /// Explicitly set to null.
    ForcedNull,
}

#[derive(Debug, Clone)]
enum Segment {
    Root(String),
    Member(String),
    Item(usize),
    Entry(String),
}

/// The ancestor chain of a node, used for paths and cycle detection.
#[derive(Debug)]
struct Trail {
    parent: Option<Rc<Trail>>,
    segment: Segment,
    identity: Option<usize>,
}

impl Trail {
    fn root(name: &str, identity: Option<usize>) -> Rc<Trail> {
        Rc::new(Trail {
            parent: None,
            segment: Segment::Root(name.to_string()),
            identity,
        })
    }

    fn push(self: &Rc<Self>, segment: Segment, identity: Option<usize>) -> Rc<Trail> {
        Rc::new(Trail {
            parent: Some(self.clone()),
            segment,
            identity,
        })
    }

    fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(trail) = current {
            segments.push(&trail.segment);
            current = trail.parent.as_deref();
        }
        let mut path = String::new();
        for segment in segments.into_iter().rev() {
            match segment {
                Segment::Root(name) => path.push_str(name),
                Segment::Member(name) => {
                    path.push('.');
                    path.push_str(name);
                }
                Segment::Item(index) => path.push_str(&format!("[{index}]")),
                Segment::Entry(key) => path.push_str(&format!("[\"{key}\"]")),
            }
        }
        path
    }

    /// Whether this node or one of its ancestors holds `identity`.
    fn contains(&self, identity: usize) -> bool {
        let mut current = Some(self);
        while let Some(trail) = current {
            if trail.identity == Some(identity) {
                return true;
            }
            current = trail.parent.as_deref();
        }
        false
    }
}

/// How a node maps its value.
#[derive(Debug, Clone)]
pub(crate) enum GraphKind {
    Object(ObjectInfo),
    Enumerable(ListInfo),
    Dictionary(DictionaryInfo),
    Value,
    /// A node tree stored as a value (`Element` members and untyped
    /// composite values).
    Embedded(NodeType),
}

impl GraphKind {
    fn node_type(&self) -> NodeType {
        match self {
            GraphKind::Object(_) => NodeType::Object,
            GraphKind::Enumerable(_) => NodeType::Array,
            GraphKind::Dictionary(_) => NodeType::Dictionary,
            GraphKind::Value => NodeType::Value,
            GraphKind::Embedded(node_type) => *node_type,
        }
    }

    fn is_composite(&self) -> bool {
        matches!(
            self,
            GraphKind::Object(_) | GraphKind::Enumerable(_) | GraphKind::Dictionary(_)
        )
    }
}

/// Where a deserialized child is written once it is complete.
enum Binding {
    Detached,
    Member { parent: Instance, member: CachedMember },
    Item { list: Instance, info: ListInfo },
    Entry { dict: Instance, info: DictionaryInfo, key: Option<Value> },
}

/// Everything needed to build a child node.
struct Seed {
    name: Option<String>,
    segment: Segment,
    specified: CachedType,
    member: Option<CachedMember>,
    metadata: Metadata,
    /// The serialized value, or the existing value reused when deserializing.
    value: Option<Value>,
    binding: Binding,
    /// The node type of the source node being read.
    hint: Option<NodeType>,
}

/// A node backed by a typed value.
pub struct GraphNode<'a> {
    options: &'a Options,
    mode: Mode,
    name: Option<String>,
    trail: Rc<Trail>,
    specified: CachedType,
    ty: CachedType,
    member: Option<CachedMember>,
    metadata: Metadata,
    source: ValueSource<'a>,
    kind: GraphKind,
    binding: Binding,
    state: Cell<NodeState>,
    matched: Vec<String>,
    added: usize,
}

/// The type whose shape is mapped: the runtime type of the value when
/// `use_actual_type` is on or the declared type is untyped, otherwise the
/// declared type.
fn effective_type(
    specified: &CachedType,
    value: Option<&Value>,
    mode: Mode,
    options: &Options,
) -> CachedType {
    let underlying = specified.underlying();
    match (mode, value) {
        (Mode::Serialize, Some(value)) if options.use_actual_type() || underlying.is_dynamic() => {
            value.cached_type()
        }
        _ => underlying,
    }
}

fn classify(
    ty: &CachedType,
    value: Option<&Value>,
    mode: Mode,
    options: &Options,
    hint: Option<NodeType>,
) -> GraphKind {
    match (mode, value) {
        (Mode::Serialize, None) => GraphKind::Value,
        (_, Some(Value::Node(element))) => GraphKind::Embedded(element.node_type),
        _ => classify_type(ty, mode, options, hint),
    }
}

fn classify_type(ty: &CachedType, mode: Mode, options: &Options, hint: Option<NodeType>) -> GraphKind {
    if ty.is_node() {
        return GraphKind::Embedded(hint.unwrap_or(NodeType::Object));
    }
    if ty.is_dynamic() {
        return match hint {
            Some(node_type) if mode == Mode::Deserialize && node_type.is_composite() => {
                GraphKind::Embedded(node_type)
            }
            _ => GraphKind::Value,
        };
    }
    if mode == Mode::Deserialize && options.deserialization().parser(ty).is_some() {
        return GraphKind::Value;
    }
    match ty.kind() {
        TypeKind::Object(info) => {
            if let Some(list) = info
                .list_contract()
                .filter(|_| !options.treat_enumerable_impls_as_objects())
            {
                GraphKind::Enumerable(list.clone())
            } else if let Some(dict) = info
                .dictionary_contract()
                .filter(|_| !options.treat_dictionary_impls_as_objects())
            {
                GraphKind::Dictionary(dict.clone())
            } else {
                GraphKind::Object(info.clone())
            }
        }
        TypeKind::List(info) | TypeKind::Array(info) | TypeKind::Enumerable(info) => {
            GraphKind::Enumerable(info.clone())
        }
        TypeKind::Dictionary(info) => GraphKind::Dictionary(info.clone()),
        _ => GraphKind::Value,
    }
}

fn root_rejected(ty: &CachedType, name: &str) -> Option<MappingError> {
    if ty.is_simple() || ty.is_dynamic() {
        Some(MappingError::not_supported(
            ty.name(),
            name,
            "only composite types can be mapped at the root",
        ))
    } else {
        None
    }
}

impl<'a> GraphNode<'a> {
    /// The root node for serializing `value` of declared type `ty`.
    pub fn for_serialize(
        value: Option<Value>,
        ty: &CachedType,
        options: &'a Options,
    ) -> Result<Self, MappingError> {
        let effective = effective_type(ty, value.as_ref(), Mode::Serialize, options);
        let name = options.naming().type_name(&effective);
        if let Some(error) = root_rejected(&effective, &name) {
            return Err(error);
        }
        let kind = match &value {
            Some(value) => classify(&effective, Some(value), Mode::Serialize, options, None),
            None => classify_type(&effective, Mode::Serialize, options, None),
        };
        log::debug!("serializing {} as {}", effective.rust_name(), kind.node_type());
        Ok(Self {
            options,
            mode: Mode::Serialize,
            trail: Trail::root(&name, value.as_ref().and_then(Value::identity)),
            name: Some(name),
            specified: ty.clone(),
            ty: effective,
            member: None,
            metadata: ty.metadata().clone(),
            source: ValueSource::Simple(value),
            kind,
            binding: Binding::Detached,
            state: Cell::new(NodeState::Initialized),
            matched: Vec::new(),
            added: 0,
        })
    }

    /// The root node for deserializing into a new value of type `ty`.
    pub fn for_deserialize(ty: &CachedType, options: &'a Options) -> Result<Self, MappingError> {
        let effective = ty.underlying();
        let name = options.naming().type_name(&effective);
        if let Some(error) = root_rejected(&effective, &name) {
            return Err(error);
        }
        let kind = classify_type(&effective, Mode::Deserialize, options, None);
        log::debug!("deserializing {} from {}", effective.rust_name(), kind.node_type());
        let source = Self::source_for(&effective, &kind, None, options);
        Ok(Self {
            options,
            mode: Mode::Deserialize,
            trail: Trail::root(&name, None),
            name: Some(name),
            specified: ty.clone(),
            ty: effective,
            member: None,
            metadata: ty.metadata().clone(),
            source,
            kind,
            binding: Binding::Detached,
            state: Cell::new(NodeState::Uninitialized),
            matched: Vec::new(),
            added: 0,
        })
    }

    /// Composite values are created on first use, unless an existing value
    /// can be filled instead.
    fn source_for(
        ty: &CachedType,
        kind: &GraphKind,
        existing: Option<Value>,
        options: &'a Options,
    ) -> ValueSource<'a> {
        if !kind.is_composite() {
            return ValueSource::Simple(None);
        }
        let ty = ty.clone();
        ValueSource::lazy(
            existing,
            Box::new(move || {
                factory::create_instance(&ty, options.object_factory(), options.dependencies())
            }),
        )
    }

    fn child(&self, seed: Seed) -> GraphNode<'a> {
        let options = self.options;
        let ty = effective_type(&seed.specified, seed.value.as_ref(), self.mode, options);
        let kind = classify(&ty, seed.value.as_ref(), self.mode, options, seed.hint);
        let (identity, source, state) = match self.mode {
            Mode::Serialize => (
                seed.value.as_ref().and_then(Value::identity),
                ValueSource::Simple(seed.value),
                NodeState::Initialized,
            ),
            Mode::Deserialize => (
                None,
                Self::source_for(&ty, &kind, seed.value, options),
                NodeState::Uninitialized,
            ),
        };
        GraphNode {
            options,
            mode: self.mode,
            name: seed.name,
            trail: self.trail.push(seed.segment, identity),
            specified: seed.specified,
            ty,
            member: seed.member,
            metadata: seed.metadata,
            source,
            kind,
            binding: seed.binding,
            state: Cell::new(state),
            matched: Vec::new(),
            added: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The declared type of this position.
    pub fn specified_type(&self) -> &CachedType {
        &self.specified
    }

    /// The type whose shape is mapped.
    pub fn effective_type(&self) -> &CachedType {
        &self.ty
    }

    /// The member this node maps, if it is a member node.
    pub fn member(&self) -> Option<&CachedMember> {
        self.member.as_ref()
    }

    pub fn state(&self) -> NodeState {
        self.state.get()
    }

    pub fn options(&self) -> &'a Options {
        self.options
    }

    pub(crate) fn kind(&self) -> &GraphKind {
        &self.kind
    }

    /// The unconverted value, creating it if it is still pending.
    pub fn raw_value(&self) -> Result<Option<Value>, MappingError> {
        if self.state.get() == NodeState::ForcedNull {
            return Ok(None);
        }
        let value = match &self.source {
            ValueSource::Simple(value) => value.clone(),
            ValueSource::Lazy(lazy) => {
                let created = lazy.force().map_err(|error| self.locate(error))?;
                self.state.set(NodeState::Initialized);
                Some(created.clone())
            }
            ValueSource::Node(element) => Some(Value::Node(Box::new(element.clone()))),
        };
        Ok(value)
    }

    /// Creates the value if it is still pending. Idempotent.
    pub fn initialize(&self) -> Result<(), MappingError> {
        self.raw_value().map(|_| ())
    }

    fn locate(&self, error: MappingError) -> MappingError {
        match error {
            MappingError::ValueNotSupported { path, reason } if path.is_empty() => {
                MappingError::ValueNotSupported {
                    path: self.path(),
                    reason,
                }
            }
            other => other,
        }
    }

    /// The instance behind a composite node.
    pub(crate) fn instance(&self) -> Result<Instance, MappingError> {
        match self.raw_value()? {
            Some(Value::Instance(instance)) => Ok(instance),
            other => Err(MappingError::ValueNotSupported {
                path: self.path(),
                reason: format!(
                    "expected an instance of '{}' but found {}",
                    self.ty.name(),
                    other.map_or_else(|| "null".to_string(), |value| value.to_string())
                ),
            }),
        }
    }

    /// The instance to enumerate, without creating one while deserializing.
    fn current_instance(&self) -> Result<Option<Instance>, MappingError> {
        let value = match self.mode {
            Mode::Serialize => self.raw_value()?,
            Mode::Deserialize => self.source.peek().cloned(),
        };
        Ok(match value {
            Some(Value::Instance(instance)) => Some(instance),
            _ => None,
        })
    }

    /// Replaces the value with one produced by a value reader.
    pub(crate) fn set_coerced(&mut self, value: Option<Value>) -> Result<(), MappingError> {
        if value.is_none() && !self.specified.is_nullable() {
            return Err(MappingError::cannot_be_null(&self.path(), self.specified.name()));
        }
        self.state.set(if value.is_some() {
            NodeState::Initialized
        } else {
            NodeState::ForcedNull
        });
        self.source = ValueSource::Simple(value);
        Ok(())
    }

    /// Stores a node tree as the value of an embedded node.
    pub(crate) fn embed(&mut self, element: Element) {
        self.source = ValueSource::Node(element);
        self.state.set(NodeState::Initialized);
    }

    /// The final value of a root node.
    pub fn into_value(self) -> Result<Option<Value>, MappingError> {
        if self.state.get() == NodeState::ForcedNull {
            return Ok(None);
        }
        let path = self.path();
        self.source.into_value().map_err(|error| match error {
            MappingError::ValueNotSupported { path: p, reason } if p.is_empty() => {
                MappingError::ValueNotSupported { path, reason }
            }
            other => other,
        })
    }

    /// Visits the children of a composite node. Serializing skips null
    /// values unless `include_null_members` is set, and values already held
    /// by an ancestor.
    pub fn for_each_graph_child(
        &self,
        visit: &mut dyn FnMut(&GraphNode<'a>) -> Result<(), MappingError>,
    ) -> Result<(), MappingError> {
        let Some(instance) = self.current_instance()? else {
            return Ok(());
        };
        match &self.kind {
            GraphKind::Object(info) => self.visit_members(info, &instance, visit),
            GraphKind::Enumerable(info) => self.visit_items(info, &instance, visit),
            GraphKind::Dictionary(info) => self.visit_entries(info, &instance, visit),
            GraphKind::Value | GraphKind::Embedded(_) => Ok(()),
        }
    }

    fn yield_child(
        &self,
        seed: Seed,
        visit: &mut dyn FnMut(&GraphNode<'a>) -> Result<(), MappingError>,
    ) -> Result<(), MappingError> {
        if self.mode == Mode::Serialize {
            if seed.value.is_none() && !self.options.serialization().include_null_members() {
                log::trace!("skipping null {:?} under {}", seed.name, self.path());
                return Ok(());
            }
            if let Some(identity) = seed.value.as_ref().and_then(Value::identity) {
                if self.trail.contains(identity) {
                    log::debug!("skipping cyclic reference {:?} under {}", seed.name, self.path());
                    return Ok(());
                }
            }
        }
        visit(&self.child(seed))
    }

    /// Adds a child read from a source node and writes it back into this
    /// node's value once `modify` has filled it.
    pub fn add_child(
        &mut self,
        node_type: NodeType,
        name: Option<&str>,
        metadata: &Metadata,
        modify: &mut dyn FnMut(&mut GraphNode<'a>) -> Result<(), MappingError>,
    ) -> Result<(), MappingError> {
        if self.mode == Mode::Serialize {
            return Err(MappingError::ValueNotSupported {
                path: self.path(),
                reason: "children cannot be added while serializing".to_string(),
            });
        }
        let seed = match self.kind.clone() {
            GraphKind::Object(info) => self.member_target(&info, node_type, name)?,
            GraphKind::Enumerable(info) => Some(self.item_target(&info, node_type, name, metadata)?),
            GraphKind::Dictionary(info) => Some(self.entry_target(&info, node_type, name, metadata)?),
            GraphKind::Value | GraphKind::Embedded(_) => {
                return Err(MappingError::NodeTypeMismatch {
                    path: self.path(),
                    expected: self.kind.node_type().to_string(),
                    found: node_type.to_string(),
                })
            }
        };
        let Some(seed) = seed else {
            return Ok(());
        };
        let mut child = self.child(seed);
        log::trace!("reading {}", child.path());
        modify(&mut child)?;
        child.commit()
    }

    /// Writes a completed child into its parent.
    fn commit(self) -> Result<(), MappingError> {
        let path = self.path();
        let state = self.state.get();
        let GraphNode {
            binding, source, ..
        } = self;
        let untouched = state == NodeState::Uninitialized;
        match binding {
            Binding::Detached => Ok(()),
            Binding::Member { parent, member } => {
                if untouched {
                    return Ok(());
                }
                let value = Self::final_value(state, source)?;
                let target = member.ty();
                write_back(&path, &target, value, |value| member.set(&parent, value))
            }
            Binding::Item { list, info } => {
                if untouched && matches!(source, ValueSource::Simple(None)) {
                    log::debug!("leaving out null item {path}");
                    return Ok(());
                }
                let value = Self::final_value(state, source)?;
                write_back(&path, &info.element(), value, |value| info.push(&list, value))
            }
            Binding::Entry { dict, info, key } => {
                if untouched && matches!(source, ValueSource::Simple(None)) {
                    log::debug!("leaving out null entry {path}");
                    return Ok(());
                }
                let value = Self::final_value(state, source)?;
                write_back(&path, &info.value_type(), value, |value| {
                    info.insert(&dict, key.clone(), value)
                })
            }
        }
    }

    fn final_value(state: NodeState, source: ValueSource<'a>) -> Result<Option<Value>, MappingError> {
        match state {
            NodeState::ForcedNull => Ok(None),
            _ => source.into_value(),
        }
    }
}

fn write_back(
    path: &str,
    target: &CachedType,
    value: Option<Value>,
    write: impl FnOnce(Option<Value>) -> Result<(), crate::value::ConversionError>,
) -> Result<(), MappingError> {
    let shown = value.as_ref().map_or_else(|| "null".to_string(), ToString::to_string);
    let from = value
        .as_ref()
        .map_or_else(|| "null".to_string(), |value| value.cached_type().name().to_string());
    write(value).map_err(|error| MappingError::ValueConversion {
        path: path.to_string(),
        value: shown,
        from,
        to: target.name().to_string(),
        reason: error.to_string(),
    })
}

impl Node for GraphNode<'_> {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    fn set_node_type(&mut self, node_type: NodeType) -> Result<(), MappingError> {
        if node_type == self.node_type() {
            return Ok(());
        }
        Err(MappingError::ValueNotSupported {
            path: self.path(),
            reason: format!(
                "'{}' is mapped as {}, it cannot become {node_type}",
                self.ty.name(),
                self.node_type()
            ),
        })
    }

    fn has_fixed_node_type(&self) -> bool {
        true
    }

    fn format(&self) -> &str {
        "object"
    }

    fn path(&self) -> String {
        self.trail.path()
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn value(&self) -> Result<Option<Value>, MappingError> {
        let raw = self.raw_value()?;
        Ok(match (self.mode, &self.kind) {
            (Mode::Serialize, GraphKind::Value) => crate::coercion::write(raw, self.options),
            _ => raw,
        })
    }

    fn set_value(&mut self, value: Option<Value>) -> Result<(), MappingError> {
        self.assign(value)
    }

    fn for_each_child(
        &self,
        visit: &mut dyn FnMut(&dyn Node) -> Result<(), MappingError>,
    ) -> Result<(), MappingError> {
        match &self.source {
            ValueSource::Node(element) => element.for_each_child(visit),
            ValueSource::Simple(Some(Value::Node(element))) => element.for_each_child(visit),
            _ => self.for_each_graph_child(&mut |child: &GraphNode<'_>| visit(child)),
        }
    }

    fn add(
        &mut self,
        node_type: NodeType,
        name: Option<&str>,
        metadata: &Metadata,
        modify: &mut dyn FnMut(&mut dyn Node) -> Result<(), MappingError>,
    ) -> Result<(), MappingError> {
        self.add_child(node_type, name, metadata, &mut |child: &mut GraphNode<'_>| {
            modify(child)
        })
    }

    fn validate(&self) -> Result<(), MappingError> {
        match &self.kind {
            GraphKind::Object(info) if self.mode == Mode::Deserialize => self.validate_members(info),
            _ => Ok(()),
        }
    }
}
