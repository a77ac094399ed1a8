//! Confirmation seam for operator decisions mid-run.
//!
//! The reconciler asks a [`Confirm`] implementation when a write can only
//! be made by a foreign owner and no action queue is configured: the
//! operator either performs the call out-of-band and continues, or
//! declines and cancels the run. The CLI plugs in an interactive prompt;
//! unattended runs and tests use [`AutoConfirm`].

/// Decides whether the run may proceed past an operator checkpoint.
pub trait Confirm {
  /// Returns `Ok(true)` to proceed, `Ok(false)` to cancel the run cleanly.
  fn confirm(&self, description: &str) -> std::io::Result<bool>;
}

/// Proceeds past every checkpoint without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
  fn confirm(&self, _description: &str) -> std::io::Result<bool> {
    Ok(true)
  }
}

/// Declines every checkpoint. Useful for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyConfirm;

impl Confirm for DenyConfirm {
  fn confirm(&self, _description: &str) -> std::io::Result<bool> {
    Ok(false)
  }
}
