use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to open the process access token: {0}")]
    TokenOpenError(#[source] windows::core::Error),

    #[error("Failed to query the token elevation type: {0}")]
    ElevationQueryError(#[source] windows::core::Error),

    #[error("No linked token is reachable from the filtered token: {0}")]
    LinkedTokenError(#[source] windows::core::Error),

    #[error("Administrators membership test failed: {0}")]
    MembershipError(#[source] windows::core::Error),

    #[error("Unrecognized token elevation type value: {0}")]
    UnknownElevationTypeError(i32),

    #[error("Failed to query the token group list: {0}")]
    GroupQueryError(#[source] windows::core::Error),

    #[error("The token group list contains no logon session entry")]
    LogonSidNotFoundError,

    #[error("Windows error: {0}")]
    WinApiError(#[from] windows::core::Error),
}
