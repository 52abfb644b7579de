//! Registration errors. Every variant is fatal at startup.

use thiserror::Error;

/// A command table that cannot be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Empty name or alias, or one containing whitespace.
    #[error("Invalid command name '{name}'")]
    InvalidName {
        /// Offending name.
        name: String,
    },

    /// Name or alias already used in the same scope.
    #[error("'{name}' is already registered in {scope}")]
    DuplicateName {
        /// Colliding name or alias.
        name: String,
        /// Top level or the full name of the parent group.
        scope: String,
    },

    /// A group declared arguments.
    #[error("Group '{name}' cannot declare arguments")]
    GroupWithArguments {
        /// Group name.
        name: String,
    },

    /// A group declared a handler.
    #[error("Group '{name}' cannot have a handler")]
    GroupWithHandler {
        /// Group name.
        name: String,
    },

    /// A command declared no handler.
    #[error("Command '{name}' has no handler")]
    MissingHandler {
        /// Command name.
        name: String,
    },

    /// The declared parent is not registered yet.
    #[error("Parent '{parent}' of '{name}' is not registered")]
    UnknownParent {
        /// Command name.
        name: String,
        /// Declared parent path.
        parent: String,
    },

    /// The declared parent is a leaf command.
    #[error("Parent '{parent}' of '{name}' is not a group")]
    ParentNotGroup {
        /// Command name.
        name: String,
        /// Declared parent path.
        parent: String,
    },

    /// Deeper than group, sub-group, command.
    #[error("'{name}' is nested too deeply")]
    NestingTooDeep {
        /// Full name the node would have had.
        name: String,
    },

    /// A command declared the Disabled level.
    #[error("Command '{name}' cannot require the Disabled level")]
    DisabledPermission {
        /// Command name.
        name: String,
    },

    /// Empty or whitespace-containing argument name.
    #[error("Command '{name}' has an invalid argument name '{argument}'")]
    InvalidArgumentName {
        /// Command name.
        name: String,
        /// Offending argument name.
        argument: String,
    },

    /// Two arguments of one command share a name.
    #[error("Command '{name}' declares argument '{argument}' twice")]
    DuplicateArgument {
        /// Command name.
        name: String,
        /// Repeated argument name.
        argument: String,
    },

    /// A required argument follows an optional one.
    #[error("Required argument '{argument}' of '{name}' follows an optional argument")]
    RequiredAfterOptional {
        /// Command name.
        name: String,
        /// The required argument.
        argument: String,
    },

    /// A rest argument that is not the last one, or not a string.
    #[error("Rest argument '{argument}' of '{name}' must be the last argument and a string")]
    MisplacedRest {
        /// Command name.
        name: String,
        /// Offending argument name.
        argument: String,
    },

    /// Bounds on a non-numeric argument.
    #[error("Argument '{argument}' of '{name}' has bounds but is not numeric")]
    BoundsOnNonNumeric {
        /// Command name.
        name: String,
        /// Offending argument name.
        argument: String,
    },
}
