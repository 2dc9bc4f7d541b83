//! Naming - identifier validation and physical resource names
//!
//! Every adapter receives the same physical name for the same logical table,
//! so this module is the only place names are derived.
//!
//! ```text
//! ("attendance", None)            -> plugin_attendance
//! ("attendance", Some("records")) -> plugin_attendance_records
//! ```

use crate::constants::{
    IDENTIFIER_BYTES_MAX, PHYSICAL_NAME_BYTES_MAX, PHYSICAL_NAME_PREFIX, PHYSICAL_NAME_SEPARATOR,
};
use crate::error::{StorageError, StorageResult};

/// Lower-case `s` and replace every character outside `[a-z0-9_]` with `_`.
///
/// Total and idempotent. Distinct inputs may collide (`"A-b"` and `"a_b"`).
#[must_use]
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Derive the physical table/collection/file name for a namespace and
/// optional sub-table.
#[must_use]
pub fn physical_name(namespace: &str, subtable: Option<&str>) -> String {
    let mut name = String::with_capacity(
        PHYSICAL_NAME_PREFIX.len() + namespace.len() + subtable.map_or(0, |s| s.len() + 1),
    );
    name.push_str(PHYSICAL_NAME_PREFIX);
    name.push_str(&sanitize(namespace));
    if let Some(sub) = subtable {
        name.push(PHYSICAL_NAME_SEPARATOR);
        name.push_str(&sanitize(sub));
    }

    // Postcondition
    debug_assert!(has_safe_bytes(&name), "derived name must be safe: {name}");

    name
}

/// Validate both identifiers and derive a physical name that every
/// backend can address without truncation.
///
/// # Errors
/// Returns [`StorageError::InvalidName`] if either identifier is invalid or
/// the composed name exceeds `PHYSICAL_NAME_BYTES_MAX`.
pub fn checked_physical_name(namespace: &str, subtable: Option<&str>) -> StorageResult<String> {
    validate_identifier(namespace)?;
    if let Some(sub) = subtable {
        validate_identifier(sub)?;
    }

    let name = physical_name(namespace, subtable);
    if name.len() > PHYSICAL_NAME_BYTES_MAX {
        return Err(StorageError::invalid_name(
            subtable.unwrap_or(namespace),
            format!(
                "physical name {name} is {} bytes, max {PHYSICAL_NAME_BYTES_MAX}",
                name.len()
            ),
        ));
    }

    // Postcondition
    assert!(is_physical_name(&name), "checked name must be addressable: {name}");

    Ok(name)
}

/// True if `name` is non-empty, at most `PHYSICAL_NAME_BYTES_MAX` bytes,
/// and only contains `[a-z0-9_]`.
///
/// Adapters interpolate physical names into SQL, so they check this first.
#[must_use]
pub fn is_physical_name(name: &str) -> bool {
    name.len() <= PHYSICAL_NAME_BYTES_MAX && has_safe_bytes(name)
}

fn has_safe_bytes(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Validate a namespace or sub-table identifier: `[A-Za-z0-9_]+`.
///
/// # Errors
/// Returns [`StorageError::InvalidName`] if the identifier is empty, too long,
/// or contains any other character.
pub fn validate_identifier(name: &str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(StorageError::invalid_name(name, "must not be empty"));
    }
    if name.len() > IDENTIFIER_BYTES_MAX {
        return Err(StorageError::invalid_name(
            name,
            format!("{} bytes exceeds max {IDENTIFIER_BYTES_MAX}", name.len()),
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(StorageError::invalid_name(
            name,
            format!("contains {bad:?}, only [A-Za-z0-9_] is allowed"),
        ));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Attendance"), "attendance");
        assert_eq!(sanitize("my-plugin.v2"), "my_plugin_v2");
        assert_eq!(sanitize("snake_case_9"), "snake_case_9");
        assert_eq!(sanitize("ünï"), "_n_");
        assert_eq!(sanitize("éü"), "__");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_idempotent() {
        for input in ["Hello World", "a-b-c", "ALLCAPS", "x:y/z", "ok_1"] {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "sanitize not idempotent for {input}");
        }
    }

    #[test]
    fn test_physical_name() {
        assert_eq!(physical_name("attendance", None), "plugin_attendance");
        assert_eq!(
            physical_name("attendance", Some("records")),
            "plugin_attendance_records"
        );
        assert_eq!(physical_name("MyPlugin", Some("Daily")), "plugin_myplugin_daily");
    }

    #[test]
    fn test_physical_name_deterministic_and_safe() {
        let inputs = [
            ("a", None),
            ("Birthday", Some("users")),
            ("weird ns!", Some("sub/table")),
            ("x", Some("")),
        ];
        for (ns, sub) in inputs {
            let first = physical_name(ns, sub);
            assert_eq!(first, physical_name(ns, sub));
            assert!(is_physical_name(&first), "unsafe name {first}");
        }
    }

    #[test]
    fn test_collisions_are_accepted() {
        assert_eq!(physical_name("A", Some("b")), physical_name("a", Some("B")));
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("my_plugin1").is_ok());
        assert!(validate_identifier("UPPER_lower_09").is_ok());

        let err = validate_identifier("").unwrap_err();
        assert!(err.is_configuration());

        let err = validate_identifier("bad name!").unwrap_err();
        assert!(matches!(err, StorageError::InvalidName { .. }));

        assert!(validate_identifier("dash-ed").is_err());
        assert!(validate_identifier("dot.ted").is_err());
        assert!(validate_identifier(&"x".repeat(IDENTIFIER_BYTES_MAX + 1)).is_err());
        assert!(validate_identifier(&"x".repeat(IDENTIFIER_BYTES_MAX)).is_ok());
    }

    #[test]
    fn test_is_physical_name() {
        assert!(is_physical_name("plugin_a_b"));
        assert!(!is_physical_name(""));
        assert!(!is_physical_name("Plugin"));
        assert!(!is_physical_name("a;drop table x"));
        assert!(is_physical_name(&"p".repeat(PHYSICAL_NAME_BYTES_MAX)));
        assert!(!is_physical_name(&"p".repeat(PHYSICAL_NAME_BYTES_MAX + 1)));
    }

    #[test]
    fn test_checked_physical_name_boundary() {
        // "plugin_" is 7 bytes, so a root namespace may use the other 56
        let ns = "n".repeat(PHYSICAL_NAME_BYTES_MAX - PHYSICAL_NAME_PREFIX.len());
        let root = checked_physical_name(&ns, None).unwrap();
        assert_eq!(root.len(), PHYSICAL_NAME_BYTES_MAX);

        // 7 + 28 + 1 + 27 = 63
        let name = checked_physical_name(&"n".repeat(28), Some(&"s".repeat(27))).unwrap();
        assert_eq!(name.len(), PHYSICAL_NAME_BYTES_MAX);
    }

    #[test]
    fn test_checked_physical_name_rejects_long_names() {
        let ns = "n".repeat(PHYSICAL_NAME_BYTES_MAX - PHYSICAL_NAME_PREFIX.len() + 1);
        let err = checked_physical_name(&ns, None).unwrap_err();
        assert!(matches!(err, StorageError::InvalidName { .. }));

        let err = checked_physical_name(&"n".repeat(28), Some(&"s".repeat(28))).unwrap_err();
        assert!(matches!(err, StorageError::InvalidName { ref name, .. } if name == &"s".repeat(28)));

        // A 64-byte namespace no longer aliases its sub-tables after truncation
        assert!(checked_physical_name(&"a".repeat(64), None).is_err());
        assert!(checked_physical_name(&"a".repeat(64), Some("records")).is_err());
    }

    #[test]
    fn test_checked_physical_name_validates_identifiers() {
        assert!(checked_physical_name("", None).is_err());
        assert!(checked_physical_name("ok", Some("bad name!")).is_err());
        assert_eq!(
            checked_physical_name("attendance", Some("records")).unwrap(),
            "plugin_attendance_records"
        );
    }
}
