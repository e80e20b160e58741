//! Owned security identifiers (SIDs) and the logon session SID extractor.
//!
//! SIDs are variable-length and usually live inside buffers owned by the
//! OS query that produced them, so every `Sid` in this module is a deep
//! copy with independent ownership.

use crate::errors::TokenError;
use crate::token::{OsTokenAccess, ProcessToken, TokenAccess};
use log::debug;
use std::ffi::c_void;
use std::fmt;
use windows::{
    Win32::{
        Foundation::{ERROR_INSUFFICIENT_BUFFER, ERROR_INVALID_SID, HLOCAL, LocalFree, PSID},
        Security::{
            Authorization::{ConvertSidToStringSidW, ConvertStringSidToSidW},
            GetLengthSid, GetTokenInformation, IsValidSid, TOKEN_USER, TokenUser,
        },
        System::SystemServices::SE_GROUP_LOGON_ID,
    },
    core::{HSTRING, PWSTR},
};

/// An owned security identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sid {
    raw: Vec<u8>,
}

impl Sid {
    /// Deep-copies a SID out of an OS-owned buffer.
    ///
    /// # Safety
    /// `psid` must point to a SID that stays alive for the duration of
    /// the call.
    pub(crate) unsafe fn from_psid(psid: PSID) -> Result<Self, TokenError> {
        unsafe {
            if !IsValidSid(psid).as_bool() {
                return Err(TokenError::WinApiError(ERROR_INVALID_SID.into()));
            }
            let length = GetLengthSid(psid);
            let data = std::slice::from_raw_parts(psid.0 as *const u8, length as usize);
            Ok(Sid { raw: data.to_vec() })
        }
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(raw: Vec<u8>) -> Self {
        Sid { raw }
    }

    pub(crate) fn as_psid(&self) -> PSID {
        PSID(self.raw.as_ptr() as *mut c_void)
    }

    /// The raw SID bytes. Equality of two `Sid`s is equality of these.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// The well-known built-in Administrators group SID (`S-1-5-32-544`).
    pub fn built_in_administrators() -> Result<Self, TokenError> {
        // Use the SID string constant for the built-in administrators group.
        // https://learn.microsoft.com/en-us/windows/win32/secauthz/sid-strings
        Self::from_string_sid("BA")
    }

    /// The well-known LocalSystem SID (`S-1-5-18`).
    pub fn local_system() -> Result<Self, TokenError> {
        Self::from_string_sid("SY")
    }

    /// Parses the SDDL string form of a SID, either the canonical
    /// `S-1-...` shape or a two-letter constant like `BA`.
    pub fn from_string_sid(value: &str) -> Result<Self, TokenError> {
        let mut psid = PSID::default();
        unsafe { ConvertStringSidToSidW(&HSTRING::from(value), &mut psid) }?;

        let sid = unsafe { Self::from_psid(psid) };
        unsafe { LocalFree(Some(HLOCAL(psid.0))) };
        sid
    }

    /// The canonical `S-1-...` string form of this SID.
    pub fn to_string_sid(&self) -> Result<String, TokenError> {
        let mut buffer = PWSTR::null();
        unsafe { ConvertSidToStringSidW(self.as_psid(), &mut buffer) }?;

        let value = unsafe { String::from_utf16_lossy(buffer.as_wide()) };
        unsafe { LocalFree(Some(HLOCAL(buffer.0 as *mut c_void))) };
        Ok(value)
    }

    /// The SID of the user the current process is running as.
    pub fn from_current_user() -> Result<Self, TokenError> {
        let token = ProcessToken::open_current()?;

        let mut required_length = 0u32;
        match unsafe {
            GetTokenInformation(token.as_raw(), TokenUser, None, 0, &mut required_length)
        } {
            Ok(()) => {}
            Err(err) if err.code() == ERROR_INSUFFICIENT_BUFFER.into() => {}
            Err(err) => return Err(TokenError::WinApiError(err)),
        }

        let mut buffer = vec![0u8; required_length as usize];
        unsafe {
            GetTokenInformation(
                token.as_raw(),
                TokenUser,
                Some(buffer.as_mut_ptr() as *mut c_void),
                required_length,
                &mut required_length,
            )
        }?;

        let token_user = unsafe { &*(buffer.as_ptr() as *const TOKEN_USER) };
        unsafe { Sid::from_psid(token_user.User.Sid) }
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_string_sid() {
            Ok(value) => write!(f, "{}", value),
            Err(_) => write!(f, "<invalid sid>"),
        }
    }
}

/// One entry of a token's group list: a SID plus its attribute flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub sid: Sid,
    pub attributes: u32,
}

impl GroupEntry {
    /// True when this entry identifies the logon session rather than a
    /// real group membership.
    pub fn is_logon_session(&self) -> bool {
        self.attributes & SE_GROUP_LOGON_ID as u32 != 0
    }
}

/// Returns an owned copy of the logon session SID attached to a token.
///
/// A logon SID identifies the logon session associated with an access
/// token; a typical use is in an ACE that grants access for the duration
/// of a client's logon session. The token's group list is defined to
/// contain exactly one entry flagged with `SE_GROUP_LOGON_ID`; a token
/// without one (e.g. a SYSTEM service token) yields
/// [`TokenError::LogonSidNotFoundError`].
pub fn logon_session_sid(token: &ProcessToken) -> Result<Sid, TokenError> {
    logon_session_sid_with(&OsTokenAccess, token)
}

pub(crate) fn logon_session_sid_with<A: TokenAccess>(
    access: &A,
    token: &A::Token,
) -> Result<Sid, TokenError> {
    let byte_len = access.group_list_size(token)?;
    let groups = access.group_list(token, byte_len)?;
    debug!("Token group list holds {} entries", groups.len());

    groups
        .into_iter()
        .find(GroupEntry::is_logon_session)
        .map(|entry| entry.sid)
        .ok_or(TokenError::LogonSidNotFoundError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{FakeTokenAccess, fake_logon_sid_bytes, logon_group, regular_group};

    #[test]
    fn finds_the_logon_session_entry_among_regular_groups() -> Result<(), TokenError> {
        let expected = fake_logon_sid_bytes();
        let fake = FakeTokenAccess::with_groups(vec![
            regular_group(&[1, 1, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0]),
            logon_group(&expected),
            regular_group(&[1, 2, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0, 33, 2, 0, 0]),
        ]);

        let token = fake.open_process_token()?;
        let sid = logon_session_sid_with(&fake, &token)?;
        drop(token);

        // The copy is owned; it stays valid after the fake and its group
        // list are gone.
        drop(fake);
        assert_eq!(sid.as_bytes(), expected.as_slice());

        Ok(())
    }

    #[test]
    fn token_without_logon_entry_reports_not_found() -> Result<(), TokenError> {
        let fake = FakeTokenAccess::with_groups(vec![regular_group(&[
            1, 1, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0,
        ])]);

        let token = fake.open_process_token()?;
        let result = logon_session_sid_with(&fake, &token);
        assert!(matches!(result, Err(TokenError::LogonSidNotFoundError)));
        assert_eq!(fake.counters.group_fetches.get(), 1);

        Ok(())
    }

    #[test]
    fn size_probe_failure_skips_the_fetch() -> Result<(), TokenError> {
        let mut fake = FakeTokenAccess::with_groups(vec![logon_group(&fake_logon_sid_bytes())]);
        fake.group_probe_fails = true;

        let token = fake.open_process_token()?;
        let result = logon_session_sid_with(&fake, &token);
        assert!(matches!(result, Err(TokenError::GroupQueryError(_))));
        assert_eq!(fake.counters.group_probes.get(), 1);
        assert_eq!(fake.counters.group_fetches.get(), 0);

        Ok(())
    }

    #[test]
    fn fetch_failure_is_reported() -> Result<(), TokenError> {
        let mut fake = FakeTokenAccess::with_groups(vec![logon_group(&fake_logon_sid_bytes())]);
        fake.group_fetch_fails = true;

        let token = fake.open_process_token()?;
        let result = logon_session_sid_with(&fake, &token);
        assert!(matches!(result, Err(TokenError::GroupQueryError(_))));
        assert_eq!(fake.counters.group_fetches.get(), 1);

        Ok(())
    }

    #[test]
    fn well_known_sids_match_their_string_form() -> Result<(), TokenError> {
        let administrators = Sid::built_in_administrators()?;
        assert_eq!(administrators.to_string_sid()?, "S-1-5-32-544");
        assert_eq!(Sid::from_string_sid("S-1-5-32-544")?, administrators);

        assert_eq!(Sid::local_system()?.to_string_sid()?, "S-1-5-18");

        Ok(())
    }

    #[test]
    fn current_user_sid_is_valid() -> Result<(), TokenError> {
        let sid = Sid::from_current_user()?;
        assert!(sid.to_string_sid()?.starts_with("S-1-"));

        Ok(())
    }

    #[test]
    fn current_process_token_has_group_entries() -> Result<(), TokenError> {
        let token = ProcessToken::open_current()?;
        let byte_len = OsTokenAccess.group_list_size(&token)?;
        assert!(byte_len > 0);

        let groups = OsTokenAccess.group_list(&token, byte_len)?;
        assert!(!groups.is_empty());

        Ok(())
    }
}
