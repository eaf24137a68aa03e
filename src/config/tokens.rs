// ABOUTME: Version token replacement across every string in the merged configuration.
// ABOUTME: Supports ${VERSION}, ${VERSION_MAJOR} and ${VERSION_MINOR}.

use serde_yaml::Value;

use crate::error::{Error, Result};

pub const VERSION_TOKEN: &str = "${VERSION}";
pub const VERSION_MAJOR_TOKEN: &str = "${VERSION_MAJOR}";
pub const VERSION_MINOR_TOKEN: &str = "${VERSION_MINOR}";

/// Replace version tokens in every string value of `document`, recursively.
///
/// # Errors
///
/// Returns `Error::InvalidConfig` when a token is used without a configured
/// version, or a major/minor token is used with a version that is not semver.
pub fn replace_tokens(document: &mut Value, version: Option<&str>) -> Result<()> {
    match document {
        Value::String(s) => {
            if s.contains("${") {
                *s = replace_in(s, version)?;
            }
        }
        Value::Sequence(items) => {
            for item in items {
                replace_tokens(item, version)?;
            }
        }
        Value::Mapping(map) => {
            for value in map.values_mut() {
                replace_tokens(value, version)?;
            }
        }
        Value::Tagged(tagged) => replace_tokens(&mut tagged.value, version)?,
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

fn replace_in(input: &str, version: Option<&str>) -> Result<String> {
    let mut out = input.to_string();

    let needs_parts = out.contains(VERSION_MAJOR_TOKEN) || out.contains(VERSION_MINOR_TOKEN);
    if needs_parts || out.contains(VERSION_TOKEN) {
        let version = version.ok_or_else(|| {
            Error::InvalidConfig(format!("'{input}' uses a version token but no version is set"))
        })?;

        if needs_parts {
            let parsed = semver::Version::parse(version.trim_start_matches('v')).map_err(|e| {
                Error::InvalidConfig(format!("version '{version}' is not semver: {e}"))
            })?;
            out = out
                .replace(VERSION_MAJOR_TOKEN, &parsed.major.to_string())
                .replace(VERSION_MINOR_TOKEN, &parsed.minor.to_string());
        }
        out = out.replace(VERSION_TOKEN, version);
    }

    Ok(out)
}
