//! Input validation and shell quoting
//!
//! Every value spliced into a remote command line goes through this module,
//! either as a validated token or as a single-quoted shell word.

use crate::error::{NetcheckError, NetcheckResult};

/// Maximum length for interface names (Linux kernel limit is 15)
const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Maximum length for NetworkManager connection ids
const MAX_CONNECTION_NAME_LEN: usize = 255;

/// Validate interface name to prevent command injection
///
/// Interface names must be alphanumeric with optional dashes, dots and
/// underscores, and no longer than 15 characters (Linux kernel limit)
pub fn validate_interface_name(name: &str) -> NetcheckResult<()> {
    if name.is_empty() {
        return Err(NetcheckError::InvalidParameter(
            "Interface name cannot be empty".to_string()
        ));
    }

    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(NetcheckError::InvalidParameter(
            format!("Interface name too long (max {} characters)", MAX_INTERFACE_NAME_LEN)
        ));
    }

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
            return Err(NetcheckError::InvalidParameter(
                format!("Invalid interface name '{}': contains invalid character '{}'", name, c)
            ));
        }
    }

    // Don't allow names starting with dash (could be interpreted as option)
    if name.starts_with('-') {
        return Err(NetcheckError::InvalidParameter(
            "Interface name cannot start with dash".to_string()
        ));
    }

    Ok(())
}

/// Validate a NetworkManager property key such as `GENERAL.STATE` or
/// `connection.autoconnect`
pub fn validate_property_key(key: &str) -> NetcheckResult<()> {
    if key.is_empty() {
        return Err(NetcheckError::InvalidParameter(
            "Property key cannot be empty".to_string()
        ));
    }

    if key.starts_with('-') {
        return Err(NetcheckError::InvalidParameter(
            "Property key cannot start with dash".to_string()
        ));
    }

    // Field lists (`a,b`) and indexed fields (`IP4.ADDRESS[1]`) are valid
    if let Some(c) = key.chars().find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | '_' | ',' | '[' | ']')) {
        return Err(NetcheckError::InvalidParameter(
            format!("Invalid property key '{}': contains invalid character '{}'", key, c)
        ));
    }

    Ok(())
}

/// Validate a connection id
///
/// Connection ids may contain spaces and punctuation (they are always quoted),
/// but not control characters. The empty id is accepted and means "any".
pub fn validate_connection_name(name: &str) -> NetcheckResult<()> {
    if name.len() > MAX_CONNECTION_NAME_LEN {
        return Err(NetcheckError::InvalidParameter(
            format!("Connection name too long (max {} characters)", MAX_CONNECTION_NAME_LEN)
        ));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(NetcheckError::InvalidParameter(
            "Connection name contains control characters".to_string()
        ));
    }

    Ok(())
}

/// Validate an alternate root prefix (`""` or an absolute path)
pub fn validate_root(root: &str) -> NetcheckResult<()> {
    if root.is_empty() {
        return Ok(());
    }

    if !root.starts_with('/') {
        return Err(NetcheckError::InvalidParameter(
            format!("Root '{}' must be an absolute path", root)
        ));
    }

    if root.split('/').any(|part| part == "..") {
        return Err(NetcheckError::InvalidParameter(
            format!("Root '{}' must not contain '..'", root)
        ));
    }

    // Roots end up in sed replacements and unquoted globs
    if let Some(c) = root.chars().find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '/' | '_' | '-' | '.')) {
        return Err(NetcheckError::InvalidParameter(
            format!("Root '{}' contains invalid character '{}'", root, c)
        ));
    }

    Ok(())
}

/// Quote a value as a single POSIX shell word
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Like [`shell_quote`], but leaves words without shell metacharacters bare
pub fn shell_word(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ',' | '/' | ':' | '=' | '@'));
    if plain {
        value.to_string()
    } else {
        shell_quote(value)
    }
}
