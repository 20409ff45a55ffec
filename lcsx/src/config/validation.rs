//! Input rules for values collected during setup.

use super::model::Credential;
use crate::errors::ValidationError;
use std::path::{Path, PathBuf};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const RESERVED_USERNAMES: &[&str] = &[
    "root",
    "admin",
    "administrator",
    "system",
    "bin",
    "daemon",
    "mail",
    "nobody",
];

const HOSTNAME_MAX: usize = 253;
const HOSTNAME_LABEL_MAX: usize = 63;

pub const PASSWORD_MIN: usize = 6;

/// Lowest unprivileged port.
pub const PORT_MIN: u16 = 1024;

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let fail = |msg: String| Err(ValidationError::Username(msg));

    if username.is_empty() {
        return fail("cannot be empty".into());
    }
    let len = username.chars().count();
    if len < USERNAME_MIN {
        return fail(format!("must be at least {USERNAME_MIN} characters long"));
    }
    if len > USERNAME_MAX {
        return fail(format!("must be at most {USERNAME_MAX} characters long"));
    }

    let mut chars = username.chars();
    let leading_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !leading_ok || !rest_ok {
        return fail(
            "may only contain letters, digits, '_' and '-', and must start with a letter or '_'"
                .into(),
        );
    }

    if username.ends_with('-') || username.ends_with('_') {
        return fail("cannot end with '-' or '_'".into());
    }

    let lower = username.to_ascii_lowercase();
    if RESERVED_USERNAMES.contains(&lower.as_str()) {
        return fail(format!("'{username}' is reserved"));
    }

    Ok(())
}

pub fn validate_hostname(hostname: &str) -> Result<(), ValidationError> {
    let fail = |msg: String| Err(ValidationError::Hostname(msg));

    if hostname.is_empty() {
        return fail("cannot be empty".into());
    }
    if hostname.len() > HOSTNAME_MAX {
        return fail(format!("must be at most {HOSTNAME_MAX} characters long"));
    }

    for label in hostname.split('.') {
        if label.is_empty() {
            return fail("labels cannot be empty".into());
        }
        if label.len() > HOSTNAME_LABEL_MAX {
            return fail(format!("label '{label}' exceeds {HOSTNAME_LABEL_MAX} characters"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return fail(format!("label '{label}' contains invalid characters"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return fail("labels cannot start or end with '-'".into());
        }
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Password("cannot be empty".into()));
    }
    if password.chars().count() < PASSWORD_MIN {
        return Err(ValidationError::Password(format!(
            "must be at least {PASSWORD_MIN} characters long"
        )));
    }
    Ok(())
}

pub fn validate_port(port: u16) -> Result<u16, ValidationError> {
    if port < PORT_MIN {
        return Err(ValidationError::Port(format!(
            "must be {PORT_MIN} or higher (privileged ports are not allowed)"
        )));
    }
    Ok(port)
}

/// Parse and validate a port typed as text.
pub fn parse_port(input: &str) -> Result<u16, ValidationError> {
    let port: u32 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::Port("must be a number".into()))?;
    let port = u16::try_from(port)
        .map_err(|_| ValidationError::Port("must be 65535 or lower".into()))?;
    validate_port(port)
}

pub fn parse_credential(input: &str) -> Result<Credential, ValidationError> {
    input.parse()
}

/// Resolve a data directory entered by the user.
///
/// Expands a leading `~`, makes the path absolute, and requires the
/// parent to exist. The directory itself is created later.
pub fn resolve_data_dir(input: &str) -> Result<PathBuf, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Path("cannot be empty".into()));
    }

    let expanded = expand_home(trimmed)?;
    let absolute = std::path::absolute(&expanded)
        .map_err(|e| ValidationError::Path(format!("invalid path {trimmed}: {e}")))?;

    if let Some(parent) = absolute.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        return Err(ValidationError::Path(format!(
            "parent directory does not exist: {}",
            parent.display()
        )));
    }

    if absolute.exists() && !absolute.is_dir() {
        return Err(ValidationError::Path(format!(
            "not a directory: {}",
            absolute.display()
        )));
    }

    Ok(absolute)
}

fn expand_home(path: &str) -> Result<PathBuf, ValidationError> {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return Ok(PathBuf::from(path)),
    };
    let home = dirs::home_dir()
        .ok_or_else(|| ValidationError::Path("cannot expand '~': no home directory".into()))?;
    Ok(if rest.is_empty() {
        home
    } else {
        Path::new(&home).join(rest)
    })
}
