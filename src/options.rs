//! Mapping configuration.
//!
//! [`Options`] is built once through [`OptionsBuilder`] and is read-only
//! afterwards, so it can be shared between threads and passes.

use crate::conventions::filters::MemberFilters;
use crate::conventions::naming::{EnumNaming, NamingConventions};
use crate::conventions::{
    NodeReaderFn, NodeWriterFn, ReaderConventions, ReaderPredicateFn, TypeMatch,
    WriterConventions, WriterPredicateFn,
};
use crate::error::BoxError;
use crate::factory::ObjectFactory;
use crate::nodes::{GraphNode, Node};
use crate::reflection::{CachedMember, CachedType, Dependency, Reflect};
use crate::value::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Parses text into a value of one specific type.
pub type ParserFn = dyn Fn(&str) -> Result<Option<Value>, BoxError> + Send + Sync;

/// How NaN and infinities are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonNumericFloat {
    /// Keep the float as is; the format decides.
    #[default]
    Raw,
    /// Write `NaN`, `Infinity` or `-Infinity` as text.
    Name,
    /// Write zero.
    Zero,
}

#[derive(Clone, Default)]
pub struct SerializationOptions {
    include_null_members: bool,
    enum_values_as_numeric: bool,
    non_numeric_floats: NonNumericFloat,
    writers: WriterConventions,
}

impl SerializationOptions {
    pub fn include_null_members(&self) -> bool {
        self.include_null_members
    }

    pub fn enum_values_as_numeric(&self) -> bool {
        self.enum_values_as_numeric
    }

    pub fn non_numeric_floats(&self) -> NonNumericFloat {
        self.non_numeric_floats
    }

    pub fn writers(&self) -> &WriterConventions {
        &self.writers
    }
}

#[derive(Clone, Default)]
pub struct DeserializationOptions {
    ignore_name_case: bool,
    ignore_unmatched_members: bool,
    fail_on_missing_members: bool,
    ignore_array_item_names: bool,
    check_root_name: bool,
    ignore_nulls_for_value_types: bool,
    case_sensitive_enum_names: bool,
    parsers: HashMap<TypeId, Arc<ParserFn>>,
    friendly_parse_messages: HashMap<TypeId, String>,
    readers: ReaderConventions,
}

impl DeserializationOptions {
    pub fn ignore_name_case(&self) -> bool {
        self.ignore_name_case
    }

    pub fn ignore_unmatched_members(&self) -> bool {
        self.ignore_unmatched_members
    }

    pub fn fail_on_missing_members(&self) -> bool {
        self.fail_on_missing_members
    }

    pub fn ignore_array_item_names(&self) -> bool {
        self.ignore_array_item_names
    }

    pub fn check_root_name(&self) -> bool {
        self.check_root_name
    }

    pub fn ignore_nulls_for_value_types(&self) -> bool {
        self.ignore_nulls_for_value_types
    }

    pub fn case_sensitive_enum_names(&self) -> bool {
        self.case_sensitive_enum_names
    }

    pub fn parser(&self, ty: &CachedType) -> Option<&ParserFn> {
        self.parsers.get(&ty.id()).map(|parser| &**parser)
    }

    pub fn friendly_parse_message(&self, ty: &CachedType) -> Option<&str> {
        self.friendly_parse_messages.get(&ty.id()).map(String::as_str)
    }

    pub fn readers(&self) -> &ReaderConventions {
        &self.readers
    }
}

/// The frozen configuration of a mapping pass.
#[derive(Clone, Default)]
pub struct Options {
    members: MemberFilters,
    naming: NamingConventions,
    use_actual_type: bool,
    treat_enumerable_impls_as_objects: bool,
    treat_dictionary_impls_as_objects: bool,
    dependencies: Vec<Dependency>,
    object_factory: Option<Arc<dyn ObjectFactory>>,
    serialization: SerializationOptions,
    deserialization: DeserializationOptions,
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    pub fn members(&self) -> &MemberFilters {
        &self.members
    }

    pub fn naming(&self) -> &NamingConventions {
        &self.naming
    }

    pub fn use_actual_type(&self) -> bool {
        self.use_actual_type
    }

    pub fn treat_enumerable_impls_as_objects(&self) -> bool {
        self.treat_enumerable_impls_as_objects
    }

    pub fn treat_dictionary_impls_as_objects(&self) -> bool {
        self.treat_dictionary_impls_as_objects
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn object_factory(&self) -> Option<&dyn ObjectFactory> {
        self.object_factory.as_deref()
    }

    pub fn serialization(&self) -> &SerializationOptions {
        &self.serialization
    }

    pub fn deserialization(&self) -> &DeserializationOptions {
        &self.deserialization
    }

    /// Compares two node names, honoring `ignore_name_case`.
    pub fn names_match(&self, expected: &str, actual: &str) -> bool {
        if self.deserialization.ignore_name_case {
            expected.to_lowercase() == actual.to_lowercase()
        } else {
            expected == actual
        }
    }
}

/// Builds an [`Options`].
///
/// ```
/// use graft_core::Options;
///
/// let options = Options::builder()
///     .include_public_fields()
///     .use_camel_case_naming()
///     .deserialization(|d| d.ignore_name_case().ignore_unmatched_members())
///     .build();
/// assert!(options.deserialization().ignore_name_case());
/// ```
#[derive(Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    pub fn include_public_fields(mut self) -> Self {
        self.options.members.include_public_fields = true;
        self
    }

    pub fn include_non_public_properties(mut self) -> Self {
        self.options.members.include_non_public_properties = true;
        self
    }

    pub fn include_non_public_fields(mut self) -> Self {
        self.options.members.include_non_public_fields = true;
        self
    }

    /// Restricts mapping to members accepted by at least one include rule.
    pub fn include_members_when(
        mut self,
        predicate: impl Fn(&CachedMember) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.options.members.includes.push(Arc::new(predicate));
        self
    }

    pub fn exclude_members_when(
        mut self,
        predicate: impl Fn(&CachedMember) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.options.members.excludes.push(Arc::new(predicate));
        self
    }

    /// Skips members whose declared type matches.
    pub fn exclude_types_when(
        mut self,
        predicate: impl Fn(&CachedType) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.options.members.type_excludes.push(Arc::new(predicate));
        self
    }

    pub fn with_member_naming_convention(
        mut self,
        convention: impl Fn(&str, &CachedMember) -> String + Send + Sync + 'static,
    ) -> Self {
        self.options.naming.add_member_rule(None, Arc::new(convention));
        self
    }

    pub fn with_member_naming_convention_when(
        mut self,
        predicate: impl Fn(&CachedMember) -> bool + Send + Sync + 'static,
        convention: impl Fn(&str, &CachedMember) -> String + Send + Sync + 'static,
    ) -> Self {
        self.options
            .naming
            .add_member_rule(Some(Arc::new(predicate)), Arc::new(convention));
        self
    }

    pub fn with_field_naming_convention(
        self,
        convention: impl Fn(&str, &CachedMember) -> String + Send + Sync + 'static,
    ) -> Self {
        self.with_member_naming_convention_when(CachedMember::is_field, convention)
    }

    pub fn with_property_naming_convention(
        self,
        convention: impl Fn(&str, &CachedMember) -> String + Send + Sync + 'static,
    ) -> Self {
        self.with_member_naming_convention_when(CachedMember::is_property, convention)
    }

    pub fn use_camel_case_naming(self) -> Self {
        self.with_member_naming_convention(|name, _| crate::conventions::naming::camel_case(name))
    }

    pub fn use_snake_case_naming(self) -> Self {
        self.with_member_naming_convention(|name, _| crate::conventions::naming::snake_case(name))
    }

    pub fn use_pascal_case_naming(self) -> Self {
        self.with_member_naming_convention(|name, _| crate::conventions::naming::pascal_case(name))
    }

    pub fn use_lower_case_naming(self) -> Self {
        self.with_member_naming_convention(|name, _| name.to_lowercase())
    }

    /// Renames root types.
    pub fn with_type_naming_convention(
        mut self,
        convention: impl Fn(&str, &CachedType) -> String + Send + Sync + 'static,
    ) -> Self {
        self.options.naming.add_type_rule(Arc::new(convention));
        self
    }

    /// Renames collection items. An `ItemName` attribute still wins.
    pub fn with_array_item_naming_convention(
        mut self,
        convention: impl Fn(&str, &CachedType) -> String + Send + Sync + 'static,
    ) -> Self {
        self.options.naming.add_item_rule(Arc::new(convention));
        self
    }

    /// Format for collection type names; `{0}` is replaced by the item name.
    pub fn with_enumerable_type_name_format(mut self, format: impl Into<String>) -> Self {
        self.options.naming.enumerable_format = format.into();
        self
    }

    /// Format for dictionary type names; `{0}` is replaced by the value type name.
    pub fn with_dictionary_type_name_format(mut self, format: impl Into<String>) -> Self {
        self.options.naming.dictionary_format = format.into();
        self
    }

    pub fn use_snake_case_enum_names(mut self) -> Self {
        self.options.naming.enum_naming = EnumNaming::SnakeCase;
        self
    }

    /// Maps values by their runtime type instead of their declared type.
    pub fn use_actual_type(mut self) -> Self {
        self.options.use_actual_type = true;
        self
    }

    pub fn treat_enumerable_impls_as_objects(mut self) -> Self {
        self.options.treat_enumerable_impls_as_objects = true;
        self
    }

    pub fn treat_dictionary_impls_as_objects(mut self) -> Self {
        self.options.treat_dictionary_impls_as_objects = true;
        self
    }

    /// Adds a value constructors may ask for.
    pub fn with_dependency<D: Any + Send + Sync>(mut self, dependency: D) -> Self {
        self.options.dependencies.push(Arc::new(dependency));
        self
    }

    pub fn with_object_factory(mut self, factory: impl ObjectFactory + 'static) -> Self {
        self.options.object_factory = Some(Arc::new(factory));
        self
    }

    pub fn serialization(
        mut self,
        configure: impl FnOnce(SerializationBuilder) -> SerializationBuilder,
    ) -> Self {
        let builder = configure(SerializationBuilder {
            options: std::mem::take(&mut self.options.serialization),
        });
        self.options.serialization = builder.options;
        self
    }

    pub fn deserialization(
        mut self,
        configure: impl FnOnce(DeserializationBuilder) -> DeserializationBuilder,
    ) -> Self {
        let builder = configure(DeserializationBuilder {
            options: std::mem::take(&mut self.options.deserialization),
        });
        self.options.deserialization = builder.options;
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}

pub struct SerializationBuilder {
    options: SerializationOptions,
}

impl SerializationBuilder {
    pub fn include_null_members(mut self) -> Self {
        self.options.include_null_members = true;
        self
    }

    pub fn enum_values_as_numeric(mut self) -> Self {
        self.options.enum_values_as_numeric = true;
        self
    }

    pub fn non_numeric_floats(mut self, handling: NonNumericFloat) -> Self {
        self.options.non_numeric_floats = handling;
        self
    }

    /// Replaces the default mapping of matching nodes. The most recently
    /// added matching writer wins.
    pub fn with_writer(
        mut self,
        type_match: TypeMatch,
        writer: impl Fn(&GraphNode<'_>, &mut dyn Node, &Options) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let writer: Arc<NodeWriterFn> = Arc::new(writer);
        self.options.writers.add_writer(type_match, None, writer);
        self
    }

    pub fn with_writer_when(
        mut self,
        type_match: TypeMatch,
        predicate: impl Fn(&GraphNode<'_>, &dyn Node, &Options) -> Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
        writer: impl Fn(&GraphNode<'_>, &mut dyn Node, &Options) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let predicate: Arc<WriterPredicateFn> = Arc::new(predicate);
        let writer: Arc<NodeWriterFn> = Arc::new(writer);
        self.options
            .writers
            .add_writer(type_match, Some(predicate), writer);
        self
    }

    /// Writes values of type `T` (or `Option<T>`) through `writer`.
    pub fn with_value_writer<T: Reflect>(
        mut self,
        writer: impl Fn(&T, &GraphNode<'_>, &Options) -> Result<Option<Value>, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.options.writers.add_value_writer::<T>(None, writer);
        self
    }

    pub fn with_value_writer_when<T: Reflect>(
        mut self,
        predicate: impl Fn(&GraphNode<'_>, &dyn Node, &Options) -> Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
        writer: impl Fn(&T, &GraphNode<'_>, &Options) -> Result<Option<Value>, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let predicate: Arc<WriterPredicateFn> = Arc::new(predicate);
        self.options
            .writers
            .add_value_writer::<T>(Some(predicate), writer);
        self
    }

    /// Runs after the node was written. Every matching visitor runs.
    pub fn with_visitor(
        mut self,
        type_match: TypeMatch,
        visitor: impl Fn(&GraphNode<'_>, &mut dyn Node, &Options) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let visitor: Arc<NodeWriterFn> = Arc::new(visitor);
        self.options.writers.add_visitor(type_match, None, visitor);
        self
    }

    /// Like [`with_visitor`](Self::with_visitor), but only runs where
    /// `predicate` holds. Use `TypeMatch::any()` to gate on the predicate
    /// alone.
    pub fn with_visitor_when(
        mut self,
        type_match: TypeMatch,
        predicate: impl Fn(&GraphNode<'_>, &dyn Node, &Options) -> Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
        visitor: impl Fn(&GraphNode<'_>, &mut dyn Node, &Options) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let predicate: Arc<WriterPredicateFn> = Arc::new(predicate);
        let visitor: Arc<NodeWriterFn> = Arc::new(visitor);
        self.options
            .writers
            .add_visitor(type_match, Some(predicate), visitor);
        self
    }
}

pub struct DeserializationBuilder {
    options: DeserializationOptions,
}

impl DeserializationBuilder {
    pub fn ignore_name_case(mut self) -> Self {
        self.options.ignore_name_case = true;
        self
    }

    pub fn ignore_unmatched_members(mut self) -> Self {
        self.options.ignore_unmatched_members = true;
        self
    }

    pub fn fail_on_missing_members(mut self) -> Self {
        self.options.fail_on_missing_members = true;
        self
    }

    pub fn ignore_array_item_names(mut self) -> Self {
        self.options.ignore_array_item_names = true;
        self
    }

    /// Rejects named roots whose name differs from the expected type name.
    pub fn check_root_name(mut self) -> Self {
        self.options.check_root_name = true;
        self
    }

    /// Keeps the current value when null arrives for a non-nullable type.
    pub fn ignore_nulls_for_value_types(mut self) -> Self {
        self.options.ignore_nulls_for_value_types = true;
        self
    }

    pub fn case_sensitive_enum_names(mut self) -> Self {
        self.options.case_sensitive_enum_names = true;
        self
    }

    /// Replaces the built-in parser for `T`.
    pub fn with_parser<T: Reflect>(
        mut self,
        parser: impl Fn(&str) -> Result<T, BoxError> + Send + Sync + 'static,
    ) -> Self {
        let parser: Arc<ParserFn> = Arc::new(move |text: &str| parser(text).map(|value| value.to_value()));
        self.options.parsers.insert(T::cached_type().id(), parser);
        self
    }

    /// Message shown when a value of type `T` cannot be parsed. `{value}` is
    /// replaced by the offending text.
    pub fn with_friendly_parse_message<T: Reflect>(mut self, message: impl Into<String>) -> Self {
        self.options
            .friendly_parse_messages
            .insert(T::cached_type().id(), message.into());
        self
    }

    /// Replaces the default mapping of matching nodes. The most recently
    /// added matching reader wins.
    pub fn with_reader(
        mut self,
        type_match: TypeMatch,
        reader: impl Fn(&dyn Node, &mut GraphNode<'_>, &Options) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let reader: Arc<NodeReaderFn> = Arc::new(reader);
        self.options.readers.add_reader(type_match, None, reader);
        self
    }

    pub fn with_reader_when(
        mut self,
        type_match: TypeMatch,
        predicate: impl Fn(&dyn Node, &GraphNode<'_>, &Options) -> Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
        reader: impl Fn(&dyn Node, &mut GraphNode<'_>, &Options) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let predicate: Arc<ReaderPredicateFn> = Arc::new(predicate);
        let reader: Arc<NodeReaderFn> = Arc::new(reader);
        self.options
            .readers
            .add_reader(type_match, Some(predicate), reader);
        self
    }

    /// Produces values of type `T` (or `Option<T>`) from the raw source value.
    pub fn with_value_reader<T: Reflect>(
        mut self,
        reader: impl Fn(Option<Value>, &GraphNode<'_>, &Options) -> Result<T, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.options.readers.add_value_reader::<T>(None, reader);
        self
    }

    pub fn with_value_reader_when<T: Reflect>(
        mut self,
        predicate: impl Fn(&dyn Node, &GraphNode<'_>, &Options) -> Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
        reader: impl Fn(Option<Value>, &GraphNode<'_>, &Options) -> Result<T, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let predicate: Arc<ReaderPredicateFn> = Arc::new(predicate);
        self.options
            .readers
            .add_value_reader::<T>(Some(predicate), reader);
        self
    }

    /// Runs after the node was read. Every matching visitor runs.
    pub fn with_visitor(
        mut self,
        type_match: TypeMatch,
        visitor: impl Fn(&dyn Node, &mut GraphNode<'_>, &Options) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let visitor: Arc<NodeReaderFn> = Arc::new(visitor);
        self.options.readers.add_visitor(type_match, None, visitor);
        self
    }

    pub fn with_visitor_when(
        mut self,
        type_match: TypeMatch,
        predicate: impl Fn(&dyn Node, &GraphNode<'_>, &Options) -> Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
        visitor: impl Fn(&dyn Node, &mut GraphNode<'_>, &Options) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let predicate: Arc<ReaderPredicateFn> = Arc::new(predicate);
        let visitor: Arc<NodeReaderFn> = Arc::new(visitor);
        self.options
            .readers
            .add_visitor(type_match, Some(predicate), visitor);
        self
    }
}
