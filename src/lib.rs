//! Maps typed Rust object graphs to a format-neutral node tree and back.
//!
//! Types opt in by implementing [`Reflect`]. [`serialize`] walks a value into
//! an [`Element`] tree, [`deserialize`] builds a value from any [`Node`]
//! tree, and [`Options`] carries the conventions that shape both directions.

pub mod api;
mod coercion;
pub mod conventions;
pub mod error;
pub mod factory;
pub mod mapper;
pub mod nodes;
pub mod options;
pub mod reflection;
mod serialization;
pub mod value;

pub use api::{deserialize, deserialize_json, serialize, serialize_into, serialize_json, serialize_yaml};
pub use conventions::TypeMatch;
pub use error::{BoxError, MappingError};
pub use factory::{DefaultObjectFactory, ObjectFactory};
pub use mapper::NodeMapper;
pub use nodes::{Element, GraphNode, Mode, Node, NodeState, NodeType};
pub use options::{NonNumericFloat, Options, OptionsBuilder};
pub use reflection::{
    CachedMember, CachedType, Constructor, Ignore, ItemName, Member, Metadata, Reflect, Rename,
    TypeInfo,
};
pub use value::Value;
