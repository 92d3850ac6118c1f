//! InitializeReceipt instruction - prepare a fill receipt account

use crate::state::FillReceipt;
use percolator_common::*;

/// Process initialize_receipt
pub fn process_initialize_receipt(receipt: &mut FillReceipt) -> Result<(), PercolatorError> {
    if receipt.validate() {
        return Err(PercolatorError::InvalidArgument);
    }
    receipt.init();
    Ok(())
}
