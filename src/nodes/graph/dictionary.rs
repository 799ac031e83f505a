use super::{Binding, GraphNode, Seed, Segment};
use crate::coercion;
use crate::error::MappingError;
use crate::nodes::{Node, NodeType};
use crate::reflection::{DictionaryInfo, Metadata};
use crate::value::Instance;

impl<'a> GraphNode<'a> {
    pub(super) fn visit_entries(
        &self,
        info: &DictionaryInfo,
        instance: &Instance,
        visit: &mut dyn FnMut(&GraphNode<'a>) -> Result<(), MappingError>,
    ) -> Result<(), MappingError> {
        for (key, value) in info.entries(instance) {
            let key = coercion::key_text(key, self.options);
            let seed = Seed {
                name: Some(key.clone()),
                segment: Segment::Entry(key),
                specified: info.value_type(),
                member: None,
                metadata: Metadata::new(),
                value,
                binding: Binding::Detached,
                hint: None,
            };
            self.yield_child(seed, visit)?;
        }
        Ok(())
    }

    /// Binds an incoming child to the dictionary entry keyed by its name.
    /// Adding an existing key replaces the entry.
    pub(super) fn entry_target(
        &mut self,
        info: &DictionaryInfo,
        node_type: NodeType,
        name: Option<&str>,
        metadata: &Metadata,
    ) -> Result<Seed, MappingError> {
        let value_type = info.value_type();
        if value_type.underlying().is_dynamic() {
            return Err(MappingError::not_supported(
                self.ty.name(),
                &self.path(),
                "values of an untyped dictionary cannot be deserialized",
            ));
        }
        if !info.can_insert() {
            return Err(MappingError::not_supported(
                self.ty.name(),
                &self.path(),
                "the dictionary cannot be inserted into",
            ));
        }
        let Some(name) = name else {
            return Err(MappingError::UnnamedChildrenNotSupported { path: self.path() });
        };
        let path = format!("{}[\"{name}\"]", self.path());
        let key = coercion::parse_key(name, &info.key_type(), self.options, &path)?;
        let dict = self.instance()?;
        Ok(Seed {
            name: Some(name.to_string()),
            segment: Segment::Entry(name.to_string()),
            specified: value_type,
            member: None,
            metadata: metadata.clone(),
            value: None,
            binding: Binding::Entry {
                dict,
                info: info.clone(),
                key,
            },
            hint: Some(node_type),
        })
    }
}
