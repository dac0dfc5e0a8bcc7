use thiserror::Error;

use crate::metadata::typesystem::TypeId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Size estimation itself is total and never fails; these errors come from the code around
/// it, such as registering type definitions in a [`crate::metadata::typesystem::TypeRegistry`]
/// or validating an [`crate::EstimatorConfig`].
///
/// # Error Categories
///
/// ## Type Registration Errors
/// - [`Error::TypeInsert`] - A definition with the same id or full name is already registered
/// - [`Error::TypeNotFound`] - Requested type id is not registered
/// - [`Error::Malformed`] - A definition is structurally invalid
///
/// ## Configuration Errors
/// - [`Error::InvalidConfig`] - Estimator configuration failed validation
///
/// # Examples
///
/// ```rust
/// use layoutscope::{Error, metadata::typesystem::{TypeId, TypeRegistry}};
///
/// let registry = TypeRegistry::new();
/// match registry.get(TypeId::new(0x0200_0042)) {
///     Ok(def) => println!("found {}", def.fullname()),
///     Err(Error::TypeNotFound(id)) => println!("no type {:?}", id),
///     Err(e) => println!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A type definition is damaged and could not be registered.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Failed to insert a new type into the `TypeRegistry`.
    ///
    /// Raised when a definition reuses an id or a full name that is already taken.
    #[error("Failed to insert new type into TypeRegistry - {0}")]
    TypeInsert(TypeId),

    /// Failed to find type in the `TypeRegistry`.
    #[error("Failed to find type in TypeRegistry - {0}")]
    TypeNotFound(TypeId),

    /// The estimator configuration is not usable.
    #[error("Invalid estimator configuration - {0}")]
    InvalidConfig(String),
}
