// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flag injection command construction.
//!
//! The write runs through `/bin/sh -c` inside the container, so the flag
//! value is single-quote escaped and the target path is rejected outright
//! when it contains anything beyond a conservative character set.

use crate::SandboxError;

/// Wrap `value` in single quotes, escaping embedded quotes as `'\''`.
pub fn shell_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}

/// Validate an in-container flag path.
///
/// Absolute, no parent traversal, and only `[A-Za-z0-9/._-]`. The path is
/// interpolated into a shell command unquoted, so nothing else gets through.
pub fn sanitize_path(path: &str) -> Result<&str, SandboxError> {
    if !path.starts_with('/') {
        return Err(SandboxError::InvalidPath(format!("not absolute: {path}")));
    }
    if path.contains("..") {
        return Err(SandboxError::InvalidPath(format!("parent traversal: {path}")));
    }
    let ok = path
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b'.' | b'_' | b'-'));
    if !ok {
        return Err(SandboxError::InvalidPath(format!("illegal characters: {path}")));
    }
    Ok(path)
}

/// Build the `/bin/sh -c` body that writes `value` to `path`.
pub fn write_command(path: &str, value: &str) -> Result<String, SandboxError> {
    let path = sanitize_path(path)?;
    Ok(format!("printf '%s' {} > {}", shell_escape(value), path))
}

#[cfg(test)]
#[path = "inject_tests.rs"]
mod tests;
