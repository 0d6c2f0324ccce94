//! Field-level validation shared by the desired specs

use crate::{Error, Result};

/// Longest accepted resource name
pub const MAX_NAME_LEN: usize = 64;

/// Largest accepted node count
pub const MAX_NODE_COUNT: u32 = 999;

/// Smallest accepted node disk size in GiB
pub const MIN_DISK_SIZE_GB: u32 = 29;

/// Characters allowed besides ASCII letters, digits and `_`
const EXTRA_NAME_CHARS: &str = "+=,.@-";

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || EXTRA_NAME_CHARS.contains(c)
}

/// Validate a resource name: required, at most 64 chars, `[A-Za-z0-9_+=,.@-]`
pub fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(field, "is required"));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(
            field,
            format!("cannot be longer than {MAX_NAME_LEN} characters"),
        ));
    }
    validate_charset(field, value)
}

/// Validate that a value only uses `[A-Za-z0-9_+=,.@-]`
pub fn validate_charset(field: &str, value: &str) -> Result<()> {
    if let Some(bad) = value.chars().find(|c| !is_name_char(*c)) {
        return Err(Error::validation(
            field,
            format!("must match [A-Za-z0-9_+=,.@-], found '{bad}'"),
        ));
    }
    Ok(())
}

/// Validate a requested node count
pub fn validate_node_count(field: &str, value: u32) -> Result<()> {
    if value > MAX_NODE_COUNT {
        return Err(Error::validation(
            field,
            format!("node count must be at most {MAX_NODE_COUNT}, got {value}"),
        ));
    }
    Ok(())
}

/// Validate a node disk size in GiB
pub fn validate_disk_size(field: &str, value: u32) -> Result<()> {
    if value < MIN_DISK_SIZE_GB {
        return Err(Error::validation(
            field,
            format!("disk size must be at least {MIN_DISK_SIZE_GB}, got {value}"),
        ));
    }
    Ok(())
}

/// Validate that a free-form value is present
pub fn validate_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "is required"));
    }
    Ok(())
}
