use super::{Binding, GraphNode, Seed, Segment};
use crate::error::MappingError;
use crate::nodes::{Mode, Node, NodeType};
use crate::reflection::{CachedMember, ObjectInfo};
use crate::value::{Instance, Value};

impl<'a> GraphNode<'a> {
    /// Members that take part in the current pass. Members declared by an
    /// implemented collection contract only show up when that contract is
    /// mapped as an object.
    fn eligible_members(&self, info: &ObjectInfo) -> Vec<CachedMember> {
        let options = self.options;
        let contracts_visible = (info.list_contract().is_some()
            && options.treat_enumerable_impls_as_objects())
            || (info.dictionary_contract().is_some() && options.treat_dictionary_impls_as_objects());
        info.members()
            .iter()
            .filter(|member| {
                options.members().is_eligible(member, self.mode)
                    && (!member.is_contract() || contracts_visible)
            })
            .cloned()
            .collect()
    }

    pub(super) fn visit_members(
        &self,
        info: &ObjectInfo,
        instance: &Instance,
        visit: &mut dyn FnMut(&GraphNode<'a>) -> Result<(), MappingError>,
    ) -> Result<(), MappingError> {
        let naming = self.options.naming();
        for member in self.eligible_members(info) {
            let value = member
                .get(instance)
                .map_err(|error| MappingError::ValueNotSupported {
                    path: format!("{}.{}", self.path(), member.name()),
                    reason: error.to_string(),
                })?;
            let seed = Seed {
                name: Some(naming.member_name(&member)),
                segment: Segment::Member(member.name().to_string()),
                specified: member.ty(),
                metadata: member.metadata().clone(),
                member: Some(member),
                value,
                binding: Binding::Detached,
                hint: None,
            };
            self.yield_child(seed, visit)?;
        }
        Ok(())
    }

    /// Binds an incoming child to the member whose node name matches.
    pub(super) fn member_target(
        &mut self,
        info: &ObjectInfo,
        node_type: NodeType,
        name: Option<&str>,
    ) -> Result<Option<Seed>, MappingError> {
        let options = self.options;
        let found = name.and_then(|name| {
            self.eligible_members(info)
                .into_iter()
                .find(|member| options.names_match(&options.naming().member_name(member), name))
        });
        let Some(member) = found else {
            let name = name.unwrap_or("<unnamed>");
            if options.deserialization().ignore_unmatched_members() {
                log::debug!("ignoring unmatched node '{name}' at {}", self.path());
                return Ok(None);
            }
            return Err(MappingError::unrecognized(&self.path(), name));
        };
        self.matched.push(member.name().to_string());
        let parent = self.instance()?;
        let existing = if member.can_read() {
            member
                .get(&parent)
                .ok()
                .flatten()
                .filter(|value| matches!(value, Value::Instance(_)))
        } else {
            None
        };
        Ok(Some(Seed {
            name: name.map(str::to_string),
            segment: Segment::Member(member.name().to_string()),
            specified: member.ty(),
            metadata: member.metadata().clone(),
            value: existing,
            binding: Binding::Member {
                parent,
                member: member.clone(),
            },
            member: Some(member),
            hint: Some(node_type),
        }))
    }

    /// Fails with `MissingNode` when `fail_on_missing_members` is set and an
    /// eligible member never received a node.
    pub(super) fn validate_members(&self, info: &ObjectInfo) -> Result<(), MappingError> {
        let options = self.options;
        if self.mode != Mode::Deserialize || !options.deserialization().fail_on_missing_members() {
            return Ok(());
        }
        let missing: Vec<String> = self
            .eligible_members(info)
            .iter()
            .filter(|member| !self.matched.iter().any(|name| name == member.name()))
            .map(|member| options.naming().member_name(member))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        let names = missing
            .iter()
            .map(|name| format!("'{name}'"))
            .collect::<Vec<_>>()
            .join(", ");
        Err(MappingError::MissingNode {
            path: self.path(),
            friendly: format!("{names} must be provided."),
            names,
        })
    }
}
