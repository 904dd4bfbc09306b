//! Version constraint formatting for requirement lines

/// Hard pin to exactly `version`
pub fn strict_version(version: &str) -> String {
    format!("=={version}")
}

/// Soft pin that stays within the current major release line
///
/// `2.31.0` becomes `>=2.31.0,<3.0.0`. When the leading component is not an
/// integer the constraint has no upper bound.
pub fn non_strict_version(version: &str) -> String {
    match next_major(version) {
        Some(next) => format!(">={version},<{next}"),
        None => format!(">={version}"),
    }
}

/// Next major version padded with zeros to as many components as `version`
fn next_major(version: &str) -> Option<String> {
    let mut components = version.split('.');
    let major: i64 = components.next()?.trim().parse().ok()?;
    let next = major.checked_add(1)?;

    let mut parts = vec![next.to_string()];
    parts.extend(components.map(|_| "0".to_string()));
    Some(parts.join("."))
}
