//! Bus line modes and transfer rates

/// Number of lines used by a single phase of a flash command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BusWidth {
    /// Phase is skipped
    #[default]
    None,
    /// 1 line
    Single,
    /// 2 lines
    Dual,
    /// 4 lines
    Quad,
    /// 8 lines
    Octal,
}

impl BusWidth {
    /// Returns the number of data lines, 0 for a skipped phase
    pub const fn lines(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Single => 1,
            Self::Dual => 2,
            Self::Quad => 4,
            Self::Octal => 8,
        }
    }
}

/// Protocol mode the flash chip is currently listening in
///
/// This is the line count of the instruction phase: a chip in QPI mode
/// only decodes opcodes sent on 4 lines, a chip in OPI mode only decodes
/// opcodes sent on 8 lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub enum InterfaceMode {
    /// Standard SPI: opcodes on 1 line
    #[default]
    Single,
    /// QPI (4-4-4)
    Quad,
    /// OPI (8-8-8)
    Octal,
}

impl InterfaceMode {
    /// Bus width used for every phase of a command in this mode
    pub const fn width(&self) -> BusWidth {
        match self {
            Self::Single => BusWidth::Single,
            Self::Quad => BusWidth::Quad,
            Self::Octal => BusWidth::Octal,
        }
    }
}

/// Data sampling rate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransferRate {
    /// Single transfer rate (one sample per clock)
    #[default]
    Str,
    /// Double transfer rate (both clock edges)
    Dtr,
}
