//! Account id resolution

use crate::error::MirrorError;
use std::ffi::OsString;
use std::process::Command;

/// Value of the account argument that asks for auto-detection.
pub const AUTO_ACCOUNT: &str = "auto";

/// Source of the caller's account id.
pub trait AccountLookup {
    fn account_id(&self) -> Result<String, MirrorError>;
}

/// Asks the AWS CLI who the current credentials belong to.
pub struct AwsCliLookup {
    program: OsString,
}

impl AwsCliLookup {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for AwsCliLookup {
    fn default() -> Self {
        Self::new("aws")
    }
}

impl AccountLookup for AwsCliLookup {
    fn account_id(&self) -> Result<String, MirrorError> {
        let output = Command::new(&self.program)
            .args(["sts", "get-caller-identity", "--query", "Account", "--output", "text"])
            .output()
            .map_err(|e| MirrorError::AccountLookupFailed {
                reason: format!("failed to run {}: {e}", self.program.to_string_lossy()),
            })?;

        if !output.status.success() {
            return Err(MirrorError::AccountLookupFailed {
                reason: format!(
                    "{} exited with {}: {}",
                    self.program.to_string_lossy(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let account_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if account_id.is_empty() {
            return Err(MirrorError::AccountLookupFailed {
                reason: "identity lookup printed nothing".to_string(),
            });
        }
        Ok(account_id)
    }
}

/// Return `requested` unless it is [`AUTO_ACCOUNT`], in which case ask `lookup`.
pub fn resolve_account_id(
    requested: &str,
    lookup: &dyn AccountLookup,
) -> Result<String, MirrorError> {
    if requested != AUTO_ACCOUNT {
        return Ok(requested.to_string());
    }

    let account_id = lookup.account_id().inspect_err(|err| {
        if let MirrorError::AccountLookupFailed { reason } = err {
            tracing::debug!("Account lookup failed: {reason}");
        }
    })?;
    tracing::info!("Detected account id {account_id}");
    Ok(account_id)
}
