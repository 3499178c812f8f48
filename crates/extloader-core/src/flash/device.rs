//! Flash device handle
//!
//! [`FlashDevice`] owns the bus driver, the profile and the interface state
//! of one chip, and sequences the protocol primitives into the operations a
//! loader exposes.

use crate::bus::{BusDriver, CancelToken};
use crate::error::{Error, Result};
use crate::profile::{
    ConfigWrite, DeviceProfile, FourByteMode, JedecId, QuadEnable, TargetMode,
};
use crate::protocol::{self, InterfaceState, Status};
use crate::spi::{opcodes, AddressWidth, InterfaceMode};

/// Lifecycle state of a [`FlashDevice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Nothing sent yet, the chip protocol is unknown
    Uninitialized,
    /// Reset sequence sent, chip in its power-on protocol
    Reset,
    /// Registers and protocol configured
    Configured,
    /// Command mode, no operation running
    Idle,
    /// Erase in progress
    Erasing,
    /// Page program in progress
    Programming,
    /// Controller in memory-mapped mode
    MemoryMapped,
}

/// One external flash chip behind a bus driver
pub struct FlashDevice<B> {
    pub(crate) bus: B,
    pub(crate) profile: DeviceProfile,
    pub(crate) iface: InterfaceState,
    pub(crate) state: DeviceState,
    pub(crate) cancel: Option<CancelToken>,
}

impl<B: BusDriver> FlashDevice<B> {
    /// Create a handle; nothing is sent to the bus until [`init`](Self::init)
    pub fn new(bus: B, profile: DeviceProfile) -> Self {
        Self {
            bus,
            iface: InterfaceState::power_on(&profile),
            profile,
            state: DeviceState::Uninitialized,
            cancel: None,
        }
    }

    /// Attach a cancellation token observed by every status poll
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Replace or remove the cancellation token
    pub fn set_cancel_token(&mut self, token: Option<CancelToken>) {
        self.cancel = token;
    }

    /// The device profile
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Protocol the chip is currently decoding
    pub fn interface(&self) -> InterfaceState {
        self.iface
    }

    /// Current lifecycle state
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Shared access to the bus driver
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Exclusive access to the bus driver
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the bus driver
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Bring the chip from any state to configured and memory-mapped
    ///
    /// Leaves mapped mode, resets, waits for the chip to become ready,
    /// configures it, checks the JEDEC ID and enables mapped mode.
    pub fn init(&mut self) -> Result<()> {
        log::debug!("Initializing flash ({} bytes)", self.profile.flash_size);
        self.bus.disable_memory_mapped()?;
        self.state = DeviceState::Uninitialized;
        self.reset()?;
        self.poll_until_ready(self.profile.timeouts.default_ms)?;
        self.configure()?;
        self.check_id()?;
        self.enable_memory_mapped()
    }

    /// Send the reset sequence in every line mode of the profile
    ///
    /// The chip ignores the pairs sent in modes it is not in; one of them
    /// reaches it whatever protocol a previous session left it in. A silent
    /// chip is not detected here; callers poll afterwards.
    ///
    /// Fails with [`Error::InvalidProfile`] before touching the bus if the
    /// profile does not pass [`DeviceProfile::validate`]. Every later state
    /// goes through here, so the engines only ever see a consistent profile.
    pub fn reset(&mut self) -> Result<()> {
        if self.state == DeviceState::MemoryMapped {
            return Err(Error::ModeConflict);
        }
        self.profile.validate().map_err(Error::InvalidProfile)?;
        for (mode, rate) in self.profile.reset_modes.sequence() {
            let iface = InterfaceState {
                mode,
                rate,
                address_width: self.iface.address_width,
            };
            log::trace!("Reset in {:?}/{:?}", mode, rate);
            protocol::software_reset(&mut self.bus, &self.profile, &iface)?;
        }
        self.bus.delay_ms(self.profile.reset_recovery_ms);
        self.iface = InterfaceState::power_on(&self.profile);
        self.state = DeviceState::Reset;
        Ok(())
    }

    /// Configure registers and enter the target protocol
    ///
    /// Sets the Quad Enable and dummy-cycle bits, enters 4-byte addressing,
    /// enters QPI/OPI and disables wrap-around reads. Each step is skipped
    /// when the chip is already there, so a second call changes nothing.
    pub fn configure(&mut self) -> Result<()> {
        self.command_mode()?;
        self.configure_registers()?;
        self.enter_four_byte()?;
        self.enter_target_mode()?;

        if let Some(wrap) = self.profile.wrap_disable {
            protocol::write_register(&mut self.bus, &self.iface, wrap.opcode, None, &[wrap.value])?;
        }

        log::debug!(
            "Configured: {:?} {:?} {:?}",
            self.iface.mode,
            self.iface.rate,
            self.iface.address_width
        );
        self.state = DeviceState::Configured;
        Ok(())
    }

    fn configure_registers(&mut self) -> Result<()> {
        let (status_bits, config_bits) = match self.profile.quad_enable {
            QuadEnable::None => (0, 0),
            QuadEnable::Status(mask) => (mask, 0),
            QuadEnable::Config(mask) => (0, mask),
        };
        let config = self.profile.config_register;
        let has_config_work =
            config.is_some_and(|cr| cr.dummy.is_some()) || config_bits != 0;
        if status_bits == 0 && !has_config_work {
            return Ok(());
        }

        let sr = self.read_status()?.bits();
        let new_sr = sr | status_bits;
        let cr = match config {
            Some(cr) => Some((
                cr,
                protocol::read_register(&mut self.bus, &self.profile, &self.iface, cr.read_opcode)?,
            )),
            None => None,
        };

        // WIP and WEL are read-only, keep them out of the written value
        let volatile = (Status::WIP | Status::WEL).bits();

        match cr {
            Some((reg, cr)) => {
                let mut new_cr = cr | config_bits;
                if let Some(dummy) = reg.dummy {
                    new_cr = dummy.apply(new_cr);
                }
                if new_sr == sr && new_cr == cr {
                    log::debug!("Status/config registers already set (SR={:#04x} CR={:#04x})", sr, cr);
                    return Ok(());
                }
                log::debug!("Writing SR={:#04x} CR={:#04x}", new_sr, new_cr);
                match reg.write {
                    ConfigWrite::WithStatus => {
                        let data = [new_sr & !volatile, new_cr];
                        self.write_register(self.profile.opcodes.write_status, &data)?;
                    }
                    ConfigWrite::Dedicated(opcode) => {
                        if new_sr != sr {
                            self.write_register(self.profile.opcodes.write_status, &[new_sr & !volatile])?;
                        }
                        if new_cr != cr {
                            self.write_register(opcode, &[new_cr])?;
                        }
                    }
                }
            }
            None => {
                if new_sr == sr {
                    log::debug!("Status register already set (SR={:#04x})", sr);
                    return Ok(());
                }
                log::debug!("Writing SR={:#04x}", new_sr);
                self.write_register(self.profile.opcodes.write_status, &[new_sr & !volatile])?;
            }
        }
        Ok(())
    }

    fn write_register(&mut self, opcode: u8, data: &[u8]) -> Result<()> {
        self.write_enable()?;
        protocol::write_register(&mut self.bus, &self.iface, opcode, None, data)?;
        self.poll_until_ready(self.profile.timeouts.default_ms)
    }

    fn enter_four_byte(&mut self) -> Result<()> {
        if self.profile.four_byte != FourByteMode::Enter
            || self.profile.address_width != AddressWidth::FourByte
            || self.iface.address_width == AddressWidth::FourByte
        {
            return Ok(());
        }
        log::debug!("Entering 4-byte address mode");
        self.write_enable()?;
        protocol::send_instruction(&mut self.bus, &self.iface, self.profile.opcodes.enter_4byte)?;
        self.iface.address_width = AddressWidth::FourByte;
        Ok(())
    }

    fn enter_target_mode(&mut self) -> Result<()> {
        let target = InterfaceState::configured(&self.profile);
        if self.iface.mode == target.mode && self.iface.rate == target.rate {
            return Ok(());
        }

        match self.profile.target_mode {
            TargetMode::Spi | TargetMode::SpiQuadIo => {}
            TargetMode::Qpi { enter_opcode } => {
                log::debug!("Entering QPI mode");
                protocol::send_instruction(&mut self.bus, &self.iface, enter_opcode)?;
            }
            TargetMode::Opi {
                dtr,
                write_config2,
                dummy_value,
            } => {
                log::debug!("Entering OPI {} mode", if dtr { "DTR" } else { "STR" });
                self.write_enable()?;
                protocol::write_register(
                    &mut self.bus,
                    &self.iface,
                    write_config2,
                    Some(opcodes::CR2_DUMMY_ADDR),
                    &[dummy_value],
                )?;
                self.poll_until_ready(self.profile.timeouts.default_ms)?;

                let mode = if dtr { opcodes::CR2_DOPI } else { opcodes::CR2_SOPI };
                self.write_enable()?;
                protocol::write_register(
                    &mut self.bus,
                    &self.iface,
                    write_config2,
                    Some(opcodes::CR2_MODE_ADDR),
                    &[mode],
                )?;
            }
        }

        self.iface.mode = target.mode;
        self.iface.rate = target.rate;
        if target.mode == InterfaceMode::Octal {
            self.iface.address_width = AddressWidth::FourByte;
            self.poll_until_ready(self.profile.timeouts.default_ms)?;
        }
        Ok(())
    }

    fn check_id(&mut self) -> Result<()> {
        let Some(expected) = self.profile.jedec_id else {
            return Ok(());
        };
        let id = self.read_id()?;
        if id == expected {
            log::debug!("JEDEC ID {} matches profile", id);
        } else {
            log::warn!("JEDEC ID mismatch: read {}, profile expects {}", id, expected);
        }
        Ok(())
    }

    /// Read the JEDEC ID in the current protocol
    pub fn read_id(&mut self) -> Result<JedecId> {
        self.command_mode()?;
        protocol::read_jedec_id(&mut self.bus, &self.profile, &self.iface)
    }

    /// Read status register 1
    pub fn read_status(&mut self) -> Result<Status> {
        self.command_mode()?;
        protocol::read_status(&mut self.bus, &self.profile, &self.iface)
    }

    /// Send Write Enable and wait for the latch
    pub fn write_enable(&mut self) -> Result<()> {
        self.command_mode()?;
        protocol::write_enable(&mut self.bus, &self.profile, &self.iface, self.cancel.as_ref())
    }

    /// Wait until the chip reports not busy
    pub fn poll_until_ready(&mut self, timeout_ms: u32) -> Result<()> {
        self.command_mode()?;
        protocol::wait_ready(
            &mut self.bus,
            &self.profile,
            &self.iface,
            timeout_ms,
            self.cancel.as_ref(),
        )
    }

    /// Erase the sector containing `address`
    pub fn erase_sector(&mut self, address: u32) -> Result<()> {
        let offset = self.profile.to_offset(address, 1)?;
        self.run(DeviceState::Erasing, |dev| {
            let sector = offset - offset % dev.profile.sector_size;
            let opcode = dev.profile.opcodes.sector_erase.select(dev.iface.address_width);
            dev.erase_at(opcode, sector, dev.profile.timeouts.sector_erase_ms)
        })
    }

    /// Erase the block containing `address`
    pub fn erase_block(&mut self, address: u32) -> Result<()> {
        let (Some(size), Some(pair)) = (self.profile.block_size, self.profile.opcodes.block_erase)
        else {
            return Err(Error::Unsupported);
        };
        let offset = self.profile.to_offset(address, 1)?;
        self.run(DeviceState::Erasing, |dev| {
            let block = offset - offset % size;
            let opcode = pair.select(dev.iface.address_width);
            dev.erase_at(opcode, block, dev.profile.timeouts.block_erase_ms)
        })
    }

    /// Erase the whole chip
    pub fn erase_chip(&mut self) -> Result<()> {
        let timeout = self.profile.timeouts.max_erase_ms;
        self.run(DeviceState::Erasing, |dev| {
            log::debug!("Chip erase (timeout {} ms)", timeout);
            dev.write_enable()?;
            protocol::send_instruction(&mut dev.bus, &dev.iface, dev.profile.opcodes.chip_erase)?;
            dev.poll_until_ready(timeout)
        })
    }

    pub(crate) fn erase_at(&mut self, opcode: u8, offset: u32, timeout_ms: u32) -> Result<()> {
        log::trace!("Erase {:#04x} at {:#010x}", opcode, offset);
        self.write_enable()?;
        protocol::erase_command(&mut self.bus, &self.iface, opcode, offset)?;
        self.poll_until_ready(timeout_ms)
    }

    /// Program data that lies within one page
    ///
    /// Fails with [`Error::InvalidRange`] if the data crosses a page
    /// boundary; use [`write`](Self::write) for arbitrary ranges.
    pub fn program_page(&mut self, address: u32, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| Error::InvalidRange {
            address,
            len: u32::MAX,
        })?;
        let offset = self.profile.to_offset(address, len)?;
        self.run(DeviceState::Programming, |dev| {
            let page = dev.profile.page_size;
            if (offset % page) as u64 + len as u64 > page as u64 {
                return Err(Error::InvalidRange { address, len });
            }
            if data.is_empty() {
                return Ok(());
            }
            dev.program_at(offset, data)
        })
    }

    pub(crate) fn program_at(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        log::trace!("Program {} bytes at {:#010x}", data.len(), offset);
        self.write_enable()?;
        protocol::program_page(&mut self.bus, &self.profile, &self.iface, offset, data)?;
        self.poll_until_ready(self.profile.timeouts.default_ms)
    }

    /// Read through discrete read commands
    pub fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        let len = u32::try_from(buf.len()).map_err(|_| Error::InvalidRange {
            address,
            len: u32::MAX,
        })?;
        let offset = self.profile.to_offset(address, len)?;
        self.command_mode()?;
        protocol::read(&mut self.bus, &self.profile, &self.iface, offset, buf)
    }

    /// Switch the controller to memory-mapped mode
    ///
    /// The mapped read uses the read command of the current protocol.
    pub fn enable_memory_mapped(&mut self) -> Result<()> {
        match self.state {
            DeviceState::MemoryMapped => return Ok(()),
            DeviceState::Uninitialized | DeviceState::Reset => return Err(Error::NotInitialized),
            _ => {}
        }
        let cmd = protocol::read_command(&self.profile, &self.iface, 0, 0);
        log::debug!("Enabling memory-mapped mode (opcode {:#04x})", cmd.opcode);
        self.bus.enable_memory_mapped(&cmd)?;
        self.state = DeviceState::MemoryMapped;
        Ok(())
    }

    /// Leave memory-mapped mode (no-op in command mode)
    pub fn disable_memory_mapped(&mut self) -> Result<()> {
        self.bus.disable_memory_mapped()?;
        if self.state == DeviceState::MemoryMapped {
            self.state = DeviceState::Idle;
        }
        Ok(())
    }

    /// Read through the memory-mapped window, enabling it if needed
    pub fn read_mapped(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        let len = u32::try_from(buf.len()).map_err(|_| Error::InvalidRange {
            address,
            len: u32::MAX,
        })?;
        let offset = self.profile.to_offset(address, len)?;
        self.enable_memory_mapped()?;
        self.bus.read_mapped(offset, buf)
    }

    /// Check the chip accepts discrete commands
    pub(crate) fn command_mode(&self) -> Result<()> {
        match self.state {
            DeviceState::MemoryMapped => Err(Error::ModeConflict),
            DeviceState::Uninitialized => Err(Error::NotInitialized),
            _ => Ok(()),
        }
    }

    /// Leave mapped mode and check the chip is configured
    pub(crate) fn prepare_modify(&mut self) -> Result<()> {
        self.disable_memory_mapped()?;
        match self.state {
            DeviceState::Uninitialized | DeviceState::Reset => Err(Error::NotInitialized),
            _ => Ok(()),
        }
    }

    /// Run `op` in `state`, returning to idle afterwards
    pub(crate) fn run<T>(
        &mut self,
        state: DeviceState,
        op: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        match self.state {
            DeviceState::MemoryMapped => return Err(Error::ModeConflict),
            DeviceState::Uninitialized | DeviceState::Reset => return Err(Error::NotInitialized),
            _ => {}
        }
        self.state = state;
        let result = op(self);
        self.state = DeviceState::Idle;
        result
    }
}

impl<B> core::fmt::Debug for FlashDevice<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlashDevice")
            .field("flash_size", &self.profile.flash_size)
            .field("iface", &self.iface)
            .field("state", &self.state)
            .finish()
    }
}
