//! # token-elevation-rs
//!
//! A Rust library for classifying the elevation state of Windows access
//! tokens and extracting the logon session SID attached to a token.
//!
//! Under UAC, a process started by an administrator normally runs with a
//! filtered token that reports no Administrators membership on its own.
//! This crate resolves the linked token behind the filter, so callers can
//! tell a filtered administrator apart from a true standard user.
//!
//! ## Features
//! - Classify the current process as elevated, filtered admin, or standard user
//! - Coarse `is_process_admin` check derived from the same classification
//! - Extract an owned copy of the logon session SID from any access token
//! - Owned SID values with SDDL string conversions
//!
//! ## Example: Classify the current process
//! ```rust
//! use token_elevation_rs::{AdminStatus, admin_status};
//!
//! match admin_status() {
//!     AdminStatus::AdminOrElevated => println!("running with admin rights"),
//!     AdminStatus::FilteredAdmin => println!("admin account, filtered token"),
//!     AdminStatus::StandardUser => println!("standard user"),
//!     status => println!("could not classify: {:?}", status),
//! }
//! ```
//!
//! ## Example: Extract the logon session SID
//! ```rust
//! use token_elevation_rs::{ProcessToken, logon_session_sid};
//!
//! let token = ProcessToken::open_current().unwrap();
//! match logon_session_sid(&token) {
//!     Ok(sid) => println!("logon session SID: {}", sid),
//!     Err(err) => eprintln!("no logon session SID: {}", err),
//! }
//! ```
//!
//! ## Platform
//! - Windows Vista and later (UAC token model)
//! - No special privileges required; every query is read-only
//!
//! ## License
//! MIT License.

pub mod elevation;
pub mod errors;
pub mod sid;
pub mod token;

// Re-export commonly used types
pub use elevation::{AdminStatus, ElevationType, admin_status, classify_process, is_process_admin};
pub use errors::TokenError;
pub use sid::{GroupEntry, Sid, logon_session_sid};
pub use token::ProcessToken;

/// A convenient type alias for Results with TokenError.
pub type TokenResult<T> = std::result::Result<T, TokenError>;
