use crate::error::{Result, ShareStateError};

pub fn validate_share_name(share: &str) -> Result<()> {
    if share.is_empty() {
        return Err(ShareStateError::Config(
            "Share name cannot be empty".to_string(),
        ));
    }

    for byte in share.bytes() {
        if byte < 32 || byte == 127 {
            return Err(ShareStateError::Config(
                "Share name contains control characters".to_string(),
            ));
        }
    }

    let disallowed = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];
    if let Some(c) = share.chars().find(|c| disallowed.contains(c)) {
        return Err(ShareStateError::Config(format!(
            "Share name cannot contain '{}'",
            c
        )));
    }

    Ok(())
}

pub fn validate_soak_args(sessions: u32, seconds: u64, paths: u32) -> Result<()> {
    if sessions == 0 {
        return Err(ShareStateError::Config(
            "--sessions must be at least 1".to_string(),
        ));
    }
    if seconds == 0 {
        return Err(ShareStateError::Config(
            "--seconds must be at least 1".to_string(),
        ));
    }
    if paths == 0 {
        return Err(ShareStateError::Config(
            "--paths must be at least 1".to_string(),
        ));
    }
    Ok(())
}
