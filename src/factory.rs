//! Instance creation for deserialization.

use crate::error::{BoxError, MappingError};
use crate::nodes::Element;
use crate::reflection::{CachedType, Dependency, TypeKind};
use crate::value::Value;
use std::sync::Arc;

/// Creates empty instances of composite types.
///
/// Any `Fn(&CachedType, &[Dependency]) -> Result<Value, BoxError>` is a
/// factory; its errors are reported as [`MappingError::ObjectCreation`].
pub trait ObjectFactory: Send + Sync {
    fn create_instance(
        &self,
        ty: &CachedType,
        dependencies: &[Dependency],
    ) -> Result<Value, MappingError>;
}

impl<F> ObjectFactory for F
where
    F: Fn(&CachedType, &[Dependency]) -> Result<Value, BoxError> + Send + Sync,
{
    fn create_instance(
        &self,
        ty: &CachedType,
        dependencies: &[Dependency],
    ) -> Result<Value, MappingError> {
        self(ty, dependencies).map_err(|error| MappingError::ObjectCreation {
            type_name: ty.name().to_string(),
            reason: error.to_string(),
            cause: Some(Arc::from(error)),
        })
    }
}

/// Constructs collections as empty containers and objects through their
/// registered constructors.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultObjectFactory;

impl ObjectFactory for DefaultObjectFactory {
    fn create_instance(
        &self,
        ty: &CachedType,
        dependencies: &[Dependency],
    ) -> Result<Value, MappingError> {
        match ty.kind() {
            TypeKind::Simple(_) | TypeKind::Enum(_) => {
                Err(MappingError::SimpleTypeInstantiationNotSupported {
                    type_name: ty.name().to_string(),
                })
            }
            TypeKind::Nullable(inner) => self.create_instance(&inner(), dependencies),
            TypeKind::Dynamic => Err(MappingError::not_supported(
                ty.name(),
                "",
                "untyped values have no type to instantiate",
            )),
            TypeKind::Node { .. } => Ok(Value::Node(Box::new(Element::object()))),
            TypeKind::List(info) | TypeKind::Array(info) | TypeKind::Enumerable(info) => info
                .create(ty)
                .map(Value::Instance)
                .ok_or_else(|| no_default(ty)),
            TypeKind::Dictionary(info) => info
                .create(ty)
                .map(Value::Instance)
                .ok_or_else(|| no_default(ty)),
            TypeKind::Object(_) => construct(ty, dependencies),
        }
    }
}

fn no_default(ty: &CachedType) -> MappingError {
    MappingError::not_supported(ty.name(), "", "the collection declares no way to create it")
}

/// Without dependencies only a zero-argument constructor is used. With
/// dependencies, constructors that take some of them come first (in
/// declaration order), then the zero-argument one.
fn construct(ty: &CachedType, dependencies: &[Dependency]) -> Result<Value, MappingError> {
    let constructors = ty.constructors();
    let with_parameters = constructors
        .iter()
        .filter(|constructor| !dependencies.is_empty() && constructor.arity() > 0)
        .filter(|constructor| constructor.is_satisfied_by(dependencies));
    let without_parameters = constructors.iter().filter(|constructor| constructor.arity() == 0);

    let mut last_error: Option<BoxError> = None;
    let mut tried = 0;
    for constructor in with_parameters.chain(without_parameters) {
        tried += 1;
        match constructor.invoke(dependencies) {
            Ok(value) => return Ok(value),
            Err(error) => {
                log::debug!("constructor {constructor:?} of {} failed: {error}", ty.name());
                last_error = Some(error);
            }
        }
    }
    let reason = match (&last_error, tried) {
        (Some(error), _) => format!("every usable constructor failed, the last with: {error}"),
        (None, 0) if constructors.is_empty() => "no constructor is registered".to_string(),
        (None, _) => format!(
            "no constructor can be satisfied from {} available dependencies",
            dependencies.len()
        ),
    };
    Err(MappingError::ObjectCreation {
        type_name: ty.name().to_string(),
        reason,
        cause: last_error.map(Arc::from),
    })
}

/// Creates an instance of `ty` through `custom` or the default factory.
pub fn create_instance(
    ty: &CachedType,
    custom: Option<&dyn ObjectFactory>,
    dependencies: &[Dependency],
) -> Result<Value, MappingError> {
    log::trace!("creating an instance of {}", ty.rust_name());
    match custom {
        Some(factory) => factory.create_instance(ty, dependencies),
        None => DefaultObjectFactory.create_instance(ty, dependencies),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{Constructor, Member, Reflect, TypeInfo};
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq)]
    struct Clock {
        zone: String,
    }

    #[derive(Debug, Clone, Default)]
    struct Report {
        zone: String,
    }

    impl Reflect for Report {
        fn type_info() -> TypeInfo {
            TypeInfo::object::<Report>("Report")
                .member(Member::property("Zone", |r: &Report| &r.zone, |r: &mut Report, v| r.zone = v))
                .default_constructor()
                .constructor(Constructor::with_dependency(|clock: &Clock| Report {
                    zone: clock.zone.clone(),
                }))
                .build()
        }
    }

    #[derive(Debug, Clone)]
    struct Fragile;

    impl Reflect for Fragile {
        fn type_info() -> TypeInfo {
            TypeInfo::object::<Fragile>("Fragile")
                .constructor(Constructor::try_new(|| -> Result<Fragile, BoxError> {
                    Err("out of parts".into())
                }))
                .build()
        }
    }

    #[test]
    fn test_simple_types_are_not_instantiated() {
        let err = create_instance(&i32::cached_type(), None, &[]).unwrap_err();
        assert!(matches!(err, MappingError::SimpleTypeInstantiationNotSupported { .. }));
    }

    #[test]
    fn test_collections_start_empty() {
        let value = create_instance(&<Option<HashMap<String, i32>>>::cached_type(), None, &[]).unwrap();
        let map = <HashMap<String, i32>>::from_value(Some(value)).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_constructor_selection_uses_dependencies() {
        let report = create_instance(&Report::cached_type(), None, &[]).unwrap();
        assert_eq!(Report::from_value(Some(report)).unwrap().zone, "");

        let dependencies: Vec<Dependency> = vec![Arc::new(Clock {
            zone: "UTC".to_string(),
        })];
        let report = create_instance(&Report::cached_type(), None, &dependencies).unwrap();
        assert_eq!(Report::from_value(Some(report)).unwrap().zone, "UTC");
    }

    #[test]
    fn test_failures_carry_the_last_cause() {
        let err = create_instance(&Fragile::cached_type(), None, &[]).unwrap_err();
        match err {
            MappingError::ObjectCreation { type_name, cause, .. } => {
                assert_eq!(type_name, "Fragile");
                assert_eq!(cause.unwrap().to_string(), "out of parts");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_custom_factories_replace_the_default() {
        let custom = |ty: &CachedType, _: &[Dependency]| -> Result<Value, BoxError> {
            Err(format!("{} is not allowed", ty.name()).into())
        };
        let err = create_instance(&Report::cached_type(), Some(&custom), &[]).unwrap_err();
        assert!(matches!(err, MappingError::ObjectCreation { .. }));
        assert!(err.to_string().contains("Report is not allowed"));
    }
}
