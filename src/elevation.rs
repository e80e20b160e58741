//! Classifies the elevation state of the current process's access token.
//!
//! Under UAC, a process started by an administrator normally runs with a
//! filtered token whose own group list reports no Administrators
//! membership; the unfiltered rights are only visible through the linked
//! token. The classifier resolves that link so a filtered administrator
//! is reported as such instead of as a plain standard user.

use crate::errors::TokenError;
use crate::token::{OsTokenAccess, TokenAccess};
use log::{debug, warn};
use windows::Win32::Security::{
    TOKEN_ELEVATION_TYPE, TokenElevationTypeDefault, TokenElevationTypeFull,
    TokenElevationTypeLimited,
};

/// Elevation type of an access token under the UAC token model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationType {
    /// No UAC split applies to this token, e.g. UAC is disabled or the
    /// account has nothing to filter.
    Default,
    /// The token already carries full administrative rights.
    Full,
    /// The token is a filtered view of a richer linked token.
    Limited,
}

impl TryFrom<TOKEN_ELEVATION_TYPE> for ElevationType {
    type Error = TokenError;

    fn try_from(value: TOKEN_ELEVATION_TYPE) -> Result<Self, TokenError> {
        if value == TokenElevationTypeDefault {
            Ok(ElevationType::Default)
        } else if value == TokenElevationTypeFull {
            Ok(ElevationType::Full)
        } else if value == TokenElevationTypeLimited {
            Ok(ElevationType::Limited)
        } else {
            Err(TokenError::UnknownElevationTypeError(value.0))
        }
    }
}

/// Combined elevation and Administrators-membership status of the
/// current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStatus {
    /// The token is fully elevated, or is a member of Administrators
    /// with no UAC split in effect.
    AdminOrElevated,
    /// The token is filtered, but its linked token is a member of
    /// Administrators; the process could elevate if asked.
    FilteredAdmin,
    /// Neither the token nor its linked counterpart is a member of
    /// Administrators.
    StandardUser,
    /// The OS reported an elevation type outside the three known values.
    UnrecognizedElevationType,
    /// The token could not be opened, or one of the queries failed.
    ClassificationFailed,
}

impl AdminStatus {
    /// True only when the process is running with administrative rights
    /// right now. A filtered admin is not currently an admin.
    pub fn is_admin(self) -> bool {
        self == AdminStatus::AdminOrElevated
    }

    /// True when the process either has administrative rights or could
    /// acquire them by elevating.
    pub fn could_elevate(self) -> bool {
        matches!(
            self,
            AdminStatus::AdminOrElevated | AdminStatus::FilteredAdmin
        )
    }
}

/// Classifies the current process token, reporting failures as typed
/// errors. On success only the first three [`AdminStatus`] variants are
/// returned.
pub fn classify_process() -> Result<AdminStatus, TokenError> {
    classify_with(&OsTokenAccess)
}

/// Classifies the current process token, folding failures into
/// [`AdminStatus::UnrecognizedElevationType`] and
/// [`AdminStatus::ClassificationFailed`].
///
/// A failure means the status could not be determined; callers should
/// treat it as not-admin.
pub fn admin_status() -> AdminStatus {
    fold_status(classify_with(&OsTokenAccess))
}

/// True when the current process is running with administrative rights.
///
/// This is the coarse projection of [`admin_status`]: a filtered admin
/// token counts as not-admin, and so does any classification failure.
pub fn is_process_admin() -> bool {
    admin_status().is_admin()
}

pub(crate) fn classify_with<A: TokenAccess>(access: &A) -> Result<AdminStatus, TokenError> {
    let token = access.open_process_token()?;
    let elevation_type = ElevationType::try_from(access.elevation_type(&token)?)?;

    let status = match elevation_type {
        // A full token already implies administrative rights; no
        // membership test is needed.
        ElevationType::Full => AdminStatus::AdminOrElevated,
        ElevationType::Limited => {
            // The filtered token never reflects true Administrators
            // membership; the test must run against the linked token.
            let linked = access.linked_token(&token)?;
            if access.is_admin_member(&linked)? {
                AdminStatus::FilteredAdmin
            } else {
                AdminStatus::StandardUser
            }
        }
        ElevationType::Default => {
            if access.is_admin_member(&token)? {
                AdminStatus::AdminOrElevated
            } else {
                AdminStatus::StandardUser
            }
        }
    };

    debug!(
        "Token elevation type: {:?}, admin status: {:?}",
        elevation_type, status
    );

    Ok(status)
}

pub(crate) fn fold_status(result: Result<AdminStatus, TokenError>) -> AdminStatus {
    match result {
        Ok(status) => status,
        Err(TokenError::UnknownElevationTypeError(value)) => {
            warn!("Unrecognized token elevation type value: {}", value);
            AdminStatus::UnrecognizedElevationType
        }
        Err(err) => {
            warn!("Failed to classify the process token: {}", err);
            AdminStatus::ClassificationFailed
        }
    }
}
