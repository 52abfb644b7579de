//! Early-return macros for validation errors.

/// Returns a validation error for a field.
///
/// ```rust
/// use slowmander_common::{invalid, Result};
///
/// fn check_token(token: &str) -> Result<()> {
///     if token.is_empty() {
///         invalid!("discord.token", "Discord token cannot be empty");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! invalid {
    ($field:expr, $msg:literal $(,)?) => {
        return Err($crate::SlowmanderError::invalid($field, $msg))
    };
    ($field:expr, $fmt:literal, $($arg:tt)*) => {
        return Err($crate::SlowmanderError::invalid($field, format!($fmt, $($arg)*)))
    };
}

/// Returns a validation error for a field unless the condition holds.
///
/// ```rust
/// use slowmander_common::{ensure_valid, Result};
///
/// fn check_owner(id: u64) -> Result<()> {
///     ensure_valid!(id != 0, "discord.owner_ids", "Owner ids must be non-zero");
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure_valid {
    ($cond:expr, $field:expr, $($msg:tt)+) => {
        if !$cond {
            $crate::invalid!($field, $($msg)+);
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{Result, SlowmanderError};

    fn check_prefix(prefix: &str) -> Result<()> {
        ensure_valid!(!prefix.is_empty(), "prefix", "Prefix cannot be empty");
        ensure_valid!(
            prefix.len() <= 4,
            "prefix",
            "Prefix is {} characters long",
            prefix.len()
        );
        Ok(())
    }

    #[test]
    fn test_ensure_valid_passes_and_fails() {
        assert!(check_prefix("!").is_ok());

        let err = check_prefix("").unwrap_err();
        assert!(matches!(err, SlowmanderError::Validation { .. }));
        assert_eq!(err.field(), Some("prefix"));

        let err = check_prefix("!!!!!").unwrap_err();
        assert!(err.to_string().contains("5 characters"));
    }

    #[test]
    fn test_invalid_formats_message() {
        fn reject(guild: u64) -> Result<()> {
            invalid!(format!("guilds.{guild}"), "Guild {} is configured twice", guild);
        }

        let err = reject(7).unwrap_err();
        assert_eq!(err.to_string(), "Invalid `guilds.7`: Guild 7 is configured twice");
    }
}
