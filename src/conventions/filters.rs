//! Which members take part in mapping.

use crate::nodes::Mode;
use crate::reflection::{CachedMember, CachedType, Ignore, MemberKind, Visibility};
use std::sync::Arc;

pub type MemberFilterFn = dyn Fn(&CachedMember) -> bool + Send + Sync;
pub type TypeFilterFn = dyn Fn(&CachedType) -> bool + Send + Sync;

/// Accessibility toggles plus user include/exclude rules.
///
/// Public properties are always accessible; the other member categories
/// have to be switched on.
#[derive(Clone, Default)]
pub struct MemberFilters {
    pub(crate) include_public_fields: bool,
    pub(crate) include_non_public_properties: bool,
    pub(crate) include_non_public_fields: bool,
    pub(crate) includes: Vec<Arc<MemberFilterFn>>,
    pub(crate) excludes: Vec<Arc<MemberFilterFn>>,
    pub(crate) type_excludes: Vec<Arc<TypeFilterFn>>,
}

impl MemberFilters {
    pub fn includes_public_fields(&self) -> bool {
        self.include_public_fields
    }

    pub fn includes_non_public_properties(&self) -> bool {
        self.include_non_public_properties
    }

    pub fn includes_non_public_fields(&self) -> bool {
        self.include_non_public_fields
    }

    pub fn is_accessible(&self, member: &CachedMember) -> bool {
        match (member.visibility(), member.kind()) {
            (Visibility::Public, MemberKind::Property) => true,
            (Visibility::Public, MemberKind::Field) => self.include_public_fields,
            (Visibility::NonPublic, MemberKind::Property) => self.include_non_public_properties,
            (Visibility::NonPublic, MemberKind::Field) => self.include_non_public_fields,
        }
    }

    pub fn excludes_type(&self, ty: &CachedType) -> bool {
        self.type_excludes.iter().any(|exclude| exclude(ty))
    }

    /// Whether `member` is mapped in `mode`: it must be accessible, readable
    /// when serializing or writable when deserializing, accepted by the
    /// include rules if there are any, and rejected by no exclude rule.
    pub fn is_eligible(&self, member: &CachedMember, mode: Mode) -> bool {
        if member.metadata().contains::<Ignore>() || !self.is_accessible(member) {
            return false;
        }
        let usable = match mode {
            Mode::Serialize => member.can_read(),
            Mode::Deserialize => member.can_write(),
        };
        if !usable {
            return false;
        }
        if !self.includes.is_empty() && !self.includes.iter().any(|include| include(member)) {
            return false;
        }
        !self.excludes.iter().any(|exclude| exclude(member)) && !self.excludes_type(&member.ty())
    }
}
