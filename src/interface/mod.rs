//! Typed interface handles and their descriptions.

pub mod description;
pub mod handle;
pub mod loan;

pub use description::{DataType, InterfaceDescription};
pub use handle::{HandleValue, InterfaceHandle, InterfaceKind};
pub use loan::{LoanedCommandInterface, LoanedStateInterface};
