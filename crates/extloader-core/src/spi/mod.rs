//! SPI flash command types
//!
//! This module provides the building blocks of a flash bus transaction:
//! line widths, transfer rates, address widths, the command descriptor
//! handed to the bus driver, and the standard opcodes.

mod address;
mod command;
mod io_mode;
pub mod opcodes;

pub use address::AddressWidth;
pub use command::FlashCommand;
pub use io_mode::{BusWidth, InterfaceMode, TransferRate};
