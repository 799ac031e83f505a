use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;

/// Error type returned by user supplied conventions, parsers and factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared cause attached to wrapping errors. Kept behind an `Arc` so that
/// [`MappingError`] stays `Clone`.
pub type ErrorCause = Arc<dyn std::error::Error + Send + Sync>;

/// Everything that can abort a mapping pass.
///
/// Each variant carries a diagnostic message that includes the node path.
/// Variants that also carry a user-facing message are "friendly": they are
/// propagated unchanged when raised from inside a reader or writer.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum MappingError {
    #[error("Type '{type_name}' is not supported at '{path}': {reason}")]
    #[diagnostic(
        code(graft::type_not_supported),
        help("Non-generic collections cannot be deserialized and simple types cannot be mapped at the root.")
    )]
    TypeNotSupported {
        type_name: String,
        path: String,
        reason: String,
    },

    #[error("Simple type '{type_name}' cannot be instantiated directly")]
    #[diagnostic(
        code(graft::simple_type_instantiation),
        help("Simple values are produced by value conversion, never by an object factory.")
    )]
    SimpleTypeInstantiationNotSupported { type_name: String },

    #[error("Could not create an instance of '{type_name}': {reason}")]
    #[diagnostic(
        code(graft::object_creation),
        help("Register a constructor whose parameters can be satisfied from the configured dependencies.")
    )]
    ObjectCreation {
        type_name: String,
        reason: String,
        #[source]
        cause: Option<ErrorCause>,
    },

    #[error("Value at '{path}' cannot be null, '{type_name}' does not accept null values")]
    #[diagnostic(code(graft::value_cannot_be_null))]
    ValueCannotBeNull {
        path: String,
        type_name: String,
        #[help]
        friendly: String,
    },

    #[error("Could not parse '{value}' as '{type_name}' at '{path}': {reason}")]
    #[diagnostic(code(graft::value_parse))]
    ValueParse {
        path: String,
        value: String,
        type_name: String,
        reason: String,
        #[help]
        friendly: String,
    },

    #[error("Could not convert '{value}' from '{from}' to '{to}' at '{path}': {reason}")]
    #[diagnostic(
        code(graft::value_conversion),
        help("The value cannot be bridged to the target type by numeric or textual conversion.")
    )]
    ValueConversion {
        path: String,
        value: String,
        from: String,
        to: String,
        reason: String,
    },

    #[error("Item at '{path}' is named '{actual}' but '{expected}' was expected")]
    #[diagnostic(code(graft::invalid_item_name))]
    InvalidItemName {
        path: String,
        expected: String,
        actual: String,
        #[help]
        friendly: String,
    },

    #[error("Node '{name}' is not recognized at '{path}'")]
    #[diagnostic(code(graft::unrecognized_node))]
    UnrecognizedNode {
        path: String,
        name: String,
        #[help]
        friendly: String,
    },

    #[error("Expected node(s) {names} missing at '{path}'")]
    #[diagnostic(code(graft::missing_node))]
    MissingNode {
        path: String,
        names: String,
        #[help]
        friendly: String,
    },

    #[error("Reader failed at '{path}': {cause}")]
    #[diagnostic(code(graft::reader))]
    Reader {
        path: String,
        #[source]
        cause: ErrorCause,
    },

    #[error("Writer failed at '{path}': {cause}")]
    #[diagnostic(code(graft::writer))]
    Writer {
        path: String,
        #[source]
        cause: ErrorCause,
    },

    #[error("Dictionary at '{path}' cannot accept unnamed children")]
    #[diagnostic(
        code(graft::unnamed_children),
        help("Every dictionary entry needs a name to use as its key.")
    )]
    UnnamedChildrenNotSupported { path: String },

    #[error("Operation not supported at '{path}': {reason}")]
    #[diagnostic(code(graft::value_not_supported))]
    ValueNotSupported { path: String, reason: String },

    #[error("Node at '{path}' is a {found} node but a {expected} node was expected")]
    #[diagnostic(code(graft::node_type_mismatch))]
    NodeTypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Root node is named '{actual}' but '{expected}' was expected")]
    #[diagnostic(code(graft::invalid_root_name))]
    InvalidRootName {
        expected: String,
        actual: String,
        #[help]
        friendly: String,
    },

    #[error("{message}")]
    #[diagnostic(code(graft::friendly))]
    Friendly { message: String },

    #[error("{format} codec error: {message}")]
    #[diagnostic(code(graft::codec))]
    Codec {
        format: &'static str,
        message: String,
    },
}

impl MappingError {
    /// Creates an error carrying only a user-facing message. Conventions raise
    /// it to report a problem that must reach the caller verbatim.
    pub fn friendly(message: impl Into<String>) -> Self {
        MappingError::Friendly {
            message: message.into(),
        }
    }

    /// Returns `true` when the error already carries a user-facing message.
    pub fn is_friendly(&self) -> bool {
        self.friendly_message().is_some()
    }

    /// The user-facing message, if this kind of error has one.
    pub fn friendly_message(&self) -> Option<&str> {
        match self {
            MappingError::ValueCannotBeNull { friendly, .. }
            | MappingError::ValueParse { friendly, .. }
            | MappingError::InvalidItemName { friendly, .. }
            | MappingError::UnrecognizedNode { friendly, .. }
            | MappingError::MissingNode { friendly, .. }
            | MappingError::InvalidRootName { friendly, .. } => Some(friendly),
            MappingError::Friendly { message } => Some(message),
            _ => None,
        }
    }

    pub(crate) fn not_supported(type_name: impl Into<String>, path: &str, reason: &str) -> Self {
        MappingError::TypeNotSupported {
            type_name: type_name.into(),
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn cannot_be_null(path: &str, type_name: impl Into<String>) -> Self {
        MappingError::ValueCannotBeNull {
            path: path.to_string(),
            type_name: type_name.into(),
            friendly: "Value cannot be null.".to_string(),
        }
    }

    pub(crate) fn unrecognized(path: &str, name: &str) -> Self {
        MappingError::UnrecognizedNode {
            path: path.to_string(),
            name: name.to_string(),
            friendly: format!("'{name}' is not recognized."),
        }
    }

    pub(crate) fn codec(format: &'static str, error: impl std::fmt::Display) -> Self {
        MappingError::Codec {
            format,
            message: error.to_string(),
        }
    }
}
