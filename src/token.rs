//! Access token handles and the raw token query surface.

use crate::errors::TokenError;
use crate::sid::{GroupEntry, Sid};
use log::warn;
use std::{ffi::c_void, mem::size_of};
use windows::Win32::{
    Foundation::{BOOL, CloseHandle, ERROR_INSUFFICIENT_BUFFER, HANDLE},
    Security::{
        CheckTokenMembership, GetTokenInformation, TOKEN_ELEVATION_TYPE, TOKEN_GROUPS,
        TOKEN_LINKED_TOKEN, TOKEN_QUERY, TokenElevationType, TokenGroups, TokenLinkedToken,
    },
    System::Threading::{GetCurrentProcess, OpenProcessToken},
};

/// Owns an access token `HANDLE` and closes it on drop.
#[derive(Debug)]
pub struct ProcessToken {
    handle: HANDLE,
}

impl ProcessToken {
    /// Opens the current process's access token with query-only access.
    pub fn open_current() -> Result<Self, TokenError> {
        let mut handle = HANDLE::default();
        unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut handle) }
            .map_err(TokenError::TokenOpenError)?;
        Ok(ProcessToken { handle })
    }

    /// Takes ownership of a token handle obtained elsewhere, e.g. from
    /// `LogonUserW` or a duplicated token.
    ///
    /// # Safety
    /// `handle` must be a valid, open access token handle that is not
    /// closed by anyone else; the returned `ProcessToken` closes it on
    /// drop.
    pub unsafe fn from_raw(handle: HANDLE) -> Self {
        ProcessToken { handle }
    }

    /// The raw handle, still owned by this `ProcessToken`.
    pub fn as_raw(&self) -> HANDLE {
        self.handle
    }
}

impl Drop for ProcessToken {
    fn drop(&mut self) {
        if let Err(err) = unsafe { CloseHandle(self.handle) } {
            warn!("Failed to close token handle: {}", err);
        }
    }
}

/// The narrow set of token queries consumed by the elevation classifier
/// and the logon session SID extractor.
///
/// Production code goes through [`OsTokenAccess`]; unit tests substitute
/// a counting fake so handle and buffer hygiene can be asserted.
pub(crate) trait TokenAccess {
    type Token;

    fn open_process_token(&self) -> Result<Self::Token, TokenError>;
    fn elevation_type(&self, token: &Self::Token) -> Result<TOKEN_ELEVATION_TYPE, TokenError>;
    fn linked_token(&self, token: &Self::Token) -> Result<Self::Token, TokenError>;
    fn is_admin_member(&self, token: &Self::Token) -> Result<bool, TokenError>;
    fn group_list_size(&self, token: &Self::Token) -> Result<u32, TokenError>;
    fn group_list(&self, token: &Self::Token, byte_len: u32)
    -> Result<Vec<GroupEntry>, TokenError>;
}

/// [`TokenAccess`] backed by the Win32 security APIs.
pub(crate) struct OsTokenAccess;

impl TokenAccess for OsTokenAccess {
    type Token = ProcessToken;

    fn open_process_token(&self) -> Result<ProcessToken, TokenError> {
        ProcessToken::open_current()
    }

    fn elevation_type(&self, token: &ProcessToken) -> Result<TOKEN_ELEVATION_TYPE, TokenError> {
        let mut elevation_type = TOKEN_ELEVATION_TYPE::default();
        let mut returned_length = 0u32;

        unsafe {
            GetTokenInformation(
                token.as_raw(),
                TokenElevationType,
                Some(&mut elevation_type as *mut _ as *mut c_void),
                size_of::<TOKEN_ELEVATION_TYPE>() as u32,
                &mut returned_length,
            )
        }
        .map_err(TokenError::ElevationQueryError)?;

        Ok(elevation_type)
    }

    fn linked_token(&self, token: &ProcessToken) -> Result<ProcessToken, TokenError> {
        let mut linked = TOKEN_LINKED_TOKEN::default();
        let mut returned_length = 0u32;

        unsafe {
            GetTokenInformation(
                token.as_raw(),
                TokenLinkedToken,
                Some(&mut linked as *mut _ as *mut c_void),
                size_of::<TOKEN_LINKED_TOKEN>() as u32,
                &mut returned_length,
            )
        }
        .map_err(TokenError::LinkedTokenError)?;

        // The linked token is a distinct handle and must be closed
        // independently of the token it was resolved from.
        Ok(unsafe { ProcessToken::from_raw(linked.LinkedToken) })
    }

    fn is_admin_member(&self, token: &ProcessToken) -> Result<bool, TokenError> {
        let administrators = Sid::built_in_administrators()?;

        let mut is_member = BOOL::default();
        unsafe {
            CheckTokenMembership(
                Some(token.as_raw()),
                administrators.as_psid(),
                &mut is_member,
            )
        }
        .map_err(TokenError::MembershipError)?;

        Ok(is_member.as_bool())
    }

    fn group_list_size(&self, token: &ProcessToken) -> Result<u32, TokenError> {
        let mut required_length = 0u32;

        // The probe call carries no buffer; the only acceptable failure
        // is ERROR_INSUFFICIENT_BUFFER, which reports the required length.
        match unsafe {
            GetTokenInformation(token.as_raw(), TokenGroups, None, 0, &mut required_length)
        } {
            Ok(()) => Ok(required_length),
            Err(err) if err.code() == ERROR_INSUFFICIENT_BUFFER.into() => Ok(required_length),
            Err(err) => {
                warn!("Error querying token group list size: {}", err);
                Err(TokenError::GroupQueryError(err))
            }
        }
    }

    fn group_list(
        &self,
        token: &ProcessToken,
        byte_len: u32,
    ) -> Result<Vec<GroupEntry>, TokenError> {
        let mut buffer = vec![0u8; byte_len as usize];
        let mut returned_length = 0u32;

        unsafe {
            GetTokenInformation(
                token.as_raw(),
                TokenGroups,
                Some(buffer.as_mut_ptr() as *mut c_void),
                byte_len,
                &mut returned_length,
            )
        }
        .map_err(TokenError::GroupQueryError)?;

        // https://learn.microsoft.com/en-us/windows/win32/api/winnt/ns-winnt-token_groups
        // TOKEN_GROUPS carries a variable-length SID_AND_ATTRIBUTES array;
        // the SIDs point into this buffer, so each one is deep-copied
        // before the buffer is dropped.
        let groups = unsafe { &*(buffer.as_ptr() as *const TOKEN_GROUPS) };
        let entries = unsafe {
            std::slice::from_raw_parts(groups.Groups.as_ptr(), groups.GroupCount as usize)
        };

        entries
            .iter()
            .map(|entry| {
                Ok(GroupEntry {
                    sid: unsafe { Sid::from_psid(entry.Sid) }?,
                    attributes: entry.Attributes,
                })
            })
            .collect()
    }
}
