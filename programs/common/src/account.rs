//! Account validation helpers
//!
//! Ownership, signer, and writability checks plus typed borrows over raw
//! account bytes. The caller owns the borrowed slice for the duration of one
//! instruction; there is no aliasing across handlers.

use crate::error::PercolatorError;
use pinocchio::{account_info::AccountInfo, pubkey::Pubkey};

/// Fail with Unauthorized unless the account is owned by `expected_owner`
#[inline]
pub fn validate_owner(account: &AccountInfo, expected_owner: &Pubkey) -> Result<(), PercolatorError> {
    if account.owner() != expected_owner {
        return Err(PercolatorError::Unauthorized);
    }
    Ok(())
}

/// Fail with Unauthorized unless the account signed the transaction
#[inline]
pub fn validate_signer(account: &AccountInfo) -> Result<(), PercolatorError> {
    if !account.is_signer() {
        return Err(PercolatorError::Unauthorized);
    }
    Ok(())
}

/// Fail with InvalidArgument unless the account is writable
#[inline]
pub fn validate_writable(account: &AccountInfo) -> Result<(), PercolatorError> {
    if !account.is_writable() {
        return Err(PercolatorError::InvalidArgument);
    }
    Ok(())
}

/// Fail with Unauthorized unless the account key matches
#[inline]
pub fn validate_key(account: &AccountInfo, expected_key: &Pubkey) -> Result<(), PercolatorError> {
    if account.key() != expected_key {
        return Err(PercolatorError::Unauthorized);
    }
    Ok(())
}

/// Borrow account data as `&T`.
///
/// # Safety
/// Size and alignment are checked; the caller must ensure the account
/// actually holds a valid `T`.
pub unsafe fn borrow_account_data<T>(account: &AccountInfo) -> Result<&T, PercolatorError> {
    let data = account
        .try_borrow_data()
        .map_err(|_| PercolatorError::InvalidArgument)?;

    if data.len() < core::mem::size_of::<T>() {
        return Err(PercolatorError::InvalidArgument);
    }

    let ptr = data.as_ptr();
    if (ptr as usize) % core::mem::align_of::<T>() != 0 {
        return Err(PercolatorError::InvalidArgument);
    }

    Ok(&*(ptr as *const T))
}

/// Borrow account data as `&mut T`.
///
/// # Safety
/// Size and alignment are checked; the caller must ensure the account
/// actually holds a valid `T`.
pub unsafe fn borrow_account_data_mut<T>(account: &AccountInfo) -> Result<&mut T, PercolatorError> {
    let mut data = account
        .try_borrow_mut_data()
        .map_err(|_| PercolatorError::InvalidArgument)?;

    if data.len() < core::mem::size_of::<T>() {
        return Err(PercolatorError::InvalidArgument);
    }

    let ptr = data.as_mut_ptr();
    if (ptr as usize) % core::mem::align_of::<T>() != 0 {
        return Err(PercolatorError::InvalidArgument);
    }

    Ok(&mut *(ptr as *mut T))
}
