//! Naming conventions for members, root types and collection items.

use crate::reflection::{CachedMember, CachedType, ItemName, Metadata, Rename, TypeKind};
use convert_case::{Case, Casing};
use std::sync::Arc;

pub type MemberNamingFn = dyn Fn(&str, &CachedMember) -> String + Send + Sync;
pub type MemberPredicateFn = dyn Fn(&CachedMember) -> bool + Send + Sync;
pub type TypeNamingFn = dyn Fn(&str, &CachedType) -> String + Send + Sync;

/// How enum values are written when they are written by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumNaming {
    #[default]
    Name,
    SnakeCase,
}

#[derive(Clone)]
struct MemberRule {
    when: Option<Arc<MemberPredicateFn>>,
    rename: Arc<MemberNamingFn>,
}

/// The naming chains. Each rule receives the name produced so far.
#[derive(Clone)]
pub struct NamingConventions {
    members: Vec<MemberRule>,
    types: Vec<Arc<TypeNamingFn>>,
    items: Vec<Arc<TypeNamingFn>>,
    pub(crate) enumerable_format: String,
    pub(crate) dictionary_format: String,
    pub(crate) enum_naming: EnumNaming,
}

impl Default for NamingConventions {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            types: Vec::new(),
            items: Vec::new(),
            enumerable_format: "ArrayOf{0}".to_string(),
            dictionary_format: "DictionaryOf{0}".to_string(),
            enum_naming: EnumNaming::Name,
        }
    }
}

impl NamingConventions {
    pub(crate) fn add_member_rule(
        &mut self,
        when: Option<Arc<MemberPredicateFn>>,
        rename: Arc<MemberNamingFn>,
    ) {
        self.members.push(MemberRule { when, rename });
    }

    pub(crate) fn add_type_rule(&mut self, rename: Arc<TypeNamingFn>) {
        self.types.push(rename);
    }

    pub(crate) fn add_item_rule(&mut self, rename: Arc<TypeNamingFn>) {
        self.items.push(rename);
    }

    pub fn enum_naming(&self) -> EnumNaming {
        self.enum_naming
    }

    /// The node name of a member. A `Rename` attribute replaces the declared
    /// name before the rules run.
    pub fn member_name(&self, member: &CachedMember) -> String {
        let base = match member.metadata().get::<Rename>() {
            Some(Rename(name)) => name.clone(),
            None => member.name().to_string(),
        };
        self.members
            .iter()
            .filter(|rule| rule.when.as_ref().map_or(true, |when| when(member)))
            .fold(base, |name, rule| (rule.rename)(&name, member))
    }

    /// The node name of a root of type `ty`.
    pub fn type_name(&self, ty: &CachedType) -> String {
        let ty = ty.underlying();
        let base = self.base_type_name(&ty);
        self.types.iter().fold(base, |name, rule| rule(&name, &ty))
    }

    /// The node name of items of a collection. `collection` is the metadata
    /// of the collection member; its `ItemName` attribute wins.
    pub fn item_name(&self, element: &CachedType, collection: &Metadata) -> String {
        if let Some(ItemName(name)) = collection.get::<ItemName>() {
            return name.clone();
        }
        let element = element.underlying();
        let base = self.base_type_name(&element);
        self.items.iter().fold(base, |name, rule| rule(&name, &element))
    }

    pub fn enum_name(&self, variant: &str) -> String {
        match self.enum_naming {
            EnumNaming::Name => variant.to_string(),
            EnumNaming::SnakeCase => snake_case(variant),
        }
    }

    fn base_type_name(&self, ty: &CachedType) -> String {
        match ty.kind() {
            TypeKind::List(info) | TypeKind::Array(info) | TypeKind::Enumerable(info) => self
                .enumerable_format
                .replace("{0}", &self.item_name(&info.element(), &Metadata::new())),
            TypeKind::Dictionary(info) => self
                .dictionary_format
                .replace("{0}", &self.base_type_name(&info.value_type().underlying())),
            _ => ty.name().to_string(),
        }
    }
}

pub fn camel_case(name: &str) -> String {
    name.to_case(Case::Camel)
}

pub fn snake_case(name: &str) -> String {
    name.to_case(Case::Snake)
}

pub fn pascal_case(name: &str) -> String {
    name.to_case(Case::Pascal)
}
