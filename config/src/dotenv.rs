//! Parse a project `.env` file into a key-value map. Nothing is written to the
//! environment here; precedence is applied in the crate root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// `.env` in `override_dir` if given, else in the current directory. `None`
/// when no such file exists.
fn locate_env_file(override_dir: Option<&Path>) -> Option<PathBuf> {
    let candidate = match override_dir {
        Some(dir) => dir.join(".env"),
        None => std::env::current_dir().ok()?.join(".env"),
    };
    candidate.is_file().then_some(candidate)
}

/// Strips one matched pair of surrounding quotes. Double quotes also unescape
/// `\"`; single quotes are taken verbatim. Unquoted or mismatched input is
/// returned as-is.
fn unquote(raw: &str) -> String {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        match (bytes[0], bytes[bytes.len() - 1]) {
            (b'"', b'"') => return raw[1..raw.len() - 1].replace("\\\"", "\""),
            (b'\'', b'\'') => return raw[1..raw.len() - 1].to_string(),
            _ => {}
        }
    }
    raw.to_string()
}

/// One `NAME=value` line, or `None` for blanks, `#` comments and anything
/// without a name or an `=`. No multiline or continuation support.
fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let eq = line.find('=')?;
    let name = line[..eq].trim_end();
    if name.is_empty() {
        return None;
    }
    let value = unquote(line[eq + 1..].trim_start());
    Some((name.to_string(), value))
}

/// Load `.env` from `override_dir` or the current directory into a map.
/// A missing file yields an empty map.
pub fn load_env_map(override_dir: Option<&Path>) -> std::io::Result<HashMap<String, String>> {
    let Some(path) = locate_env_file(override_dir) else {
        return Ok(HashMap::new());
    };
    let content = std::fs::read_to_string(&path)?;
    Ok(content.lines().filter_map(parse_line).collect())
}
