//! extloader-sim - In-memory QSPI/OSPI flash emulator
//!
//! This crate provides [`SimBus`], a bus driver that emulates a NOR flash
//! chip behind a QSPI/OSPI controller. The emulated chip follows the
//! opcodes, geometry and protocol of a [`DeviceProfile`]: it only decodes
//! commands sent in the line mode and transfer rate it is in, checks
//! address widths and read dummy cycles against its register state, needs
//! the write enable latch for program and erase, and reports busy for a
//! few status reads after each of them.
//!
//! Time is virtual: [`BusDriver::delay_ms`] advances a counter instead of
//! sleeping, so timeouts of hundreds of seconds run instantly.

mod error;

use std::fs;
use std::path::Path;

use extloader_core::bus::BusDriver;
use extloader_core::error::{Error, Result};
use extloader_core::profile::{ConfigWrite, DeviceProfile, QuadEnable, TargetMode};
use extloader_core::spi::{opcodes, BusWidth, FlashCommand, InterfaceMode, TransferRate};

pub use error::SimError;

/// Status register bits the chip drives itself
const SR_WIP: u8 = 0x01;
const SR_WEL: u8 = 0x02;

/// Status reads that report busy after a program, erase or register write
const DEFAULT_BUSY_POLLS: u32 = 2;

/// Chip registers and protocol state
#[derive(Debug, Clone, Default)]
struct ChipState {
    mode: InterfaceMode,
    rate: TransferRate,
    four_byte: bool,
    wel: bool,
    busy_polls: u32,
    reset_enabled: bool,
    status: u8,
    config: u8,
    cr2_dummy: u8,
    wrap_disabled: bool,
}

/// Register a data-out phase writes to
#[derive(Debug, Clone, Copy)]
enum WriteTarget {
    Program { offset: u32 },
    Status,
    Config,
    Config2 { address: u32 },
    Wrap,
    Discard,
}

/// Data phase announced by the last command
#[derive(Debug, Clone)]
enum Pending {
    Read(Vec<u8>),
    Write { target: WriteTarget, len: usize },
}

impl Pending {
    fn len(&self) -> usize {
        match self {
            Self::Read(data) => data.len(),
            Self::Write { len, .. } => *len,
        }
    }
}

/// Injected faults
#[derive(Debug, Clone, Default)]
struct Faults {
    stuck_busy: bool,
    fail_opcode: Option<u8>,
}

/// Emulated flash chip behind a memory-interface controller
pub struct SimBus {
    profile: DeviceProfile,
    memory: Vec<u8>,
    chip: ChipState,
    pending: Option<Pending>,
    mapped: Option<FlashCommand>,
    log: Vec<FlashCommand>,
    elapsed_ms: u64,
    busy_polls: u32,
    faults: Faults,
}

impl SimBus {
    /// Create an erased chip following `profile`
    pub fn new(profile: DeviceProfile) -> Self {
        let memory = vec![0xFF; profile.flash_size as usize];
        let mut sim = Self {
            profile,
            memory,
            chip: ChipState::default(),
            pending: None,
            mapped: None,
            log: Vec::new(),
            elapsed_ms: 0,
            busy_polls: DEFAULT_BUSY_POLLS,
            faults: Faults::default(),
        };
        sim.power_on();
        sim
    }

    /// Create a chip whose first bytes hold `image`
    pub fn with_image(profile: DeviceProfile, image: &[u8]) -> error::Result<Self> {
        let mut sim = Self::new(profile);
        if image.len() > sim.memory.len() {
            return Err(SimError::ImageTooLarge {
                image: image.len(),
                flash: sim.memory.len(),
            });
        }
        sim.memory[..image.len()].copy_from_slice(image);
        Ok(sim)
    }

    /// Create a chip backed by the contents of a file
    ///
    /// A missing file gives an erased chip; a shorter file fills the start.
    pub fn open(profile: DeviceProfile, path: &Path) -> error::Result<Self> {
        if !path.exists() {
            log::info!("{} does not exist, starting with an erased chip", path.display());
            return Ok(Self::new(profile));
        }
        let image = fs::read(path).map_err(|source| SimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::with_image(profile, &image)
    }

    /// Write the memory contents to a file
    pub fn save(&self, path: &Path) -> error::Result<()> {
        fs::write(path, &self.memory).map_err(|source| SimError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Flash contents
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Mutable flash contents, bypassing the command set
    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    /// The emulated chip's profile
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Commands received so far
    pub fn commands(&self) -> &[FlashCommand] {
        &self.log
    }

    /// Number of received commands with the given opcode
    pub fn count_opcode(&self, opcode: u8) -> usize {
        self.log.iter().filter(|cmd| cmd.opcode == opcode).count()
    }

    /// Forget the received commands
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Protocol the chip is decoding
    pub fn chip_mode(&self) -> (InterfaceMode, TransferRate) {
        (self.chip.mode, self.chip.rate)
    }

    /// Returns true if the chip expects 32-bit addresses for every opcode
    pub fn four_byte_mode(&self) -> bool {
        self.chip.four_byte
    }

    /// Status register (without WIP/WEL)
    pub fn status_register(&self) -> u8 {
        self.chip.status
    }

    /// Configuration register
    pub fn config_register(&self) -> u8 {
        self.chip.config
    }

    /// Returns true once wrap-around bursts have been disabled
    pub fn wrap_disabled(&self) -> bool {
        self.chip.wrap_disabled
    }

    /// Returns true if the controller is in memory-mapped mode
    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    /// Virtual milliseconds spent in delays
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Status reads reporting busy after each program/erase
    pub fn set_busy_polls(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    /// Keep WIP set forever
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.faults.stuck_busy = stuck;
    }

    /// Fail every command with this opcode with a bus error
    pub fn fail_on_opcode(&mut self, opcode: Option<u8>) {
        self.faults.fail_opcode = opcode;
    }

    /// Put the chip in a protocol without going through the command set,
    /// as a previous session could have left it
    pub fn force_mode(&mut self, mode: InterfaceMode, rate: TransferRate) {
        self.chip.mode = mode;
        self.chip.rate = rate;
    }

    fn power_on(&mut self) {
        let status = self.chip.status;
        let config = self.chip.config;
        self.chip = ChipState {
            four_byte: self.profile.power_on_address_width()
                == extloader_core::spi::AddressWidth::FourByte,
            status,
            config,
            ..ChipState::default()
        };
    }

    /// Returns true if the chip decodes the instruction phase of `cmd`
    fn decodes(&self, cmd: &FlashCommand) -> bool {
        if cmd.instruction_lines != self.chip.mode.width() || cmd.rate != self.chip.rate {
            return false;
        }
        match self.chip.mode {
            InterfaceMode::Octal => cmd.opcode_ext == Some(!cmd.opcode),
            _ => cmd.opcode_ext.is_none(),
        }
    }

    /// Address bytes the chip expects after `opcode`
    fn expected_address_bytes(&self, opcode: u8) -> u8 {
        if self.chip.mode == InterfaceMode::Octal || self.chip.four_byte {
            return 4;
        }
        let ops = &self.profile.opcodes;
        let native = [
            Some(ops.sector_erase),
            ops.block_erase,
            Some(ops.page_program),
            ops.quad_program,
            Some(ops.fast_read),
            Some(ops.quad_read),
        ];
        let is_native_4b = native
            .iter()
            .flatten()
            .any(|pair| pair.three_byte != pair.four_byte && pair.four_byte == opcode);
        if is_native_4b {
            4
        } else {
            3
        }
    }

    fn quad_enabled(&self) -> bool {
        match self.profile.quad_enable {
            QuadEnable::None => true,
            QuadEnable::Status(mask) => self.chip.status & mask != 0,
            QuadEnable::Config(mask) => self.chip.config & mask != 0,
        }
    }

    fn uses_quad_lines(cmd: &FlashCommand) -> bool {
        cmd.address_lines == BusWidth::Quad || cmd.data_lines == BusWidth::Quad
    }

    /// Returns true if `cmd` is a read opcode of the chip
    fn is_read(&self, opcode: u8) -> bool {
        let ops = &self.profile.opcodes;
        if self.chip.mode == InterfaceMode::Octal {
            return opcode == ops.octal_read;
        }
        ops.fast_read.contains(opcode) || ops.quad_read.contains(opcode)
    }

    /// Returns true if a read command returns real data
    ///
    /// Wrong dummy cycles or quad lines without QE shift the data.
    fn read_is_valid(&self, cmd: &FlashCommand) -> bool {
        let ops = &self.profile.opcodes;
        let dummy_ok = if self.chip.mode == InterfaceMode::Octal {
            // CR2 dummy code n selects 20 - 2n cycles
            let cycles = 20u8.saturating_sub(2 * (self.chip.cr2_dummy & 0x07));
            cmd.dummy_cycles == cycles
        } else if ops.quad_read.contains(cmd.opcode) {
            let configured = match self.profile.config_register.and_then(|cr| cr.dummy) {
                Some(field) => field.is_set(self.chip.config),
                None => true,
            };
            configured && cmd.dummy_cycles == self.profile.dummy.quad_read
        } else {
            cmd.dummy_cycles == self.profile.dummy.fast_read
        };
        let lines_ok = !Self::uses_quad_lines(cmd) || self.quad_enabled();
        dummy_ok && lines_ok
    }

    fn read_memory(&self, cmd: &FlashCommand, offset: u32, buf: &mut [u8]) {
        let valid = self.read_is_valid(cmd);
        if !valid {
            log::warn!("Read {:#04x} with chip misconfigured, data is shifted", cmd.opcode);
        }
        let size = self.memory.len();
        for (i, byte) in buf.iter_mut().enumerate() {
            let value = self.memory[(offset as usize + i) % size];
            *byte = if valid { value } else { value.rotate_left(4) };
        }
    }

    fn status_value(&mut self) -> u8 {
        let busy = if self.faults.stuck_busy {
            true
        } else if self.chip.busy_polls > 0 {
            self.chip.busy_polls -= 1;
            true
        } else {
            false
        };
        let mut value = self.chip.status & !(SR_WIP | SR_WEL);
        if busy {
            value |= SR_WIP;
        }
        if self.chip.wel {
            value |= SR_WEL;
        }
        value
    }

    fn start_busy(&mut self) {
        self.chip.wel = false;
        self.chip.busy_polls = self.busy_polls;
    }

    fn chip_busy(&self) -> bool {
        self.faults.stuck_busy || self.chip.busy_polls > 0
    }

    fn erase(&mut self, offset: u32, size: u32) {
        let start = (offset - offset % size) as usize;
        let end = (start + size as usize).min(self.memory.len());
        log::trace!("sim: erase {:#010x}..{:#010x}", start, end);
        self.memory[start..end].fill(0xFF);
        self.start_busy();
    }

    fn program(&mut self, offset: u32, data: &[u8]) {
        let page = self.profile.page_size as usize;
        let base = offset as usize - offset as usize % page;
        let start = offset as usize % page;
        for (i, &byte) in data.iter().enumerate() {
            // page program wraps inside the page
            let addr = base + (start + i) % page;
            if let Some(cell) = self.memory.get_mut(addr) {
                *cell &= byte;
            }
        }
        self.start_busy();
    }

    fn write_config2(&mut self, address: u32, value: u8) {
        match address {
            opcodes::CR2_MODE_ADDR => {
                let (mode, rate) = match value & 0x03 {
                    opcodes::CR2_SOPI => (InterfaceMode::Octal, TransferRate::Str),
                    opcodes::CR2_DOPI => (InterfaceMode::Octal, TransferRate::Dtr),
                    _ => (InterfaceMode::Single, TransferRate::Str),
                };
                log::trace!("sim: CR2 mode -> {:?}/{:?}", mode, rate);
                self.chip.mode = mode;
                self.chip.rate = rate;
            }
            opcodes::CR2_DUMMY_ADDR => self.chip.cr2_dummy = value & 0x07,
            _ => log::warn!("sim: write to unknown CR2 address {:#x}", address),
        }
        self.start_busy();
    }

    /// Decode one command; returns the data phase it announces
    fn dispatch(&mut self, cmd: &FlashCommand) -> Result<Option<Pending>> {
        let ops = self.profile.opcodes;
        let op = cmd.opcode;
        let reset_enabled = core::mem::take(&mut self.chip.reset_enabled);

        if op == ops.reset_enable && !cmd.has_data() {
            self.chip.reset_enabled = true;
            return Ok(None);
        }
        if op == ops.reset && !cmd.has_data() {
            if reset_enabled {
                log::trace!("sim: software reset");
                self.power_on();
            }
            return Ok(None);
        }
        if op == ops.read_status {
            let status = self.status_value();
            return Ok(Some(Pending::Read(vec![status; cmd.data_len])));
        }
        if op == ops.read_id && cmd.has_data() {
            let mut id = self
                .profile
                .jedec_id
                .map(|id| id.to_bytes().to_vec())
                .unwrap_or_else(|| vec![0xFF; 3]);
            id.resize(cmd.data_len, 0xFF);
            return Ok(Some(Pending::Read(id)));
        }
        if let Some(cr) = self.profile.config_register {
            if op == cr.read_opcode && cmd.has_data() {
                return Ok(Some(Pending::Read(vec![self.chip.config; cmd.data_len])));
            }
            if let ConfigWrite::Dedicated(write) = cr.write {
                if op == write && cmd.has_data() {
                    return Ok(Some(self.expect_write(WriteTarget::Config, cmd)));
                }
            }
        }
        if op == ops.write_enable {
            self.chip.wel = true;
            return Ok(None);
        }
        if op == opcodes::WRDI {
            self.chip.wel = false;
            return Ok(None);
        }
        if op == ops.write_status && cmd.has_data() {
            return Ok(Some(self.expect_write(WriteTarget::Status, cmd)));
        }
        if let TargetMode::Opi { write_config2, .. } = self.profile.target_mode {
            if op == write_config2 && cmd.has_data() {
                let address = cmd.address.unwrap_or(0);
                return Ok(Some(self.expect_write(WriteTarget::Config2 { address }, cmd)));
            }
        }
        if let TargetMode::Qpi { enter_opcode } = self.profile.target_mode {
            if op == enter_opcode && !cmd.has_data() {
                if self.quad_enabled() {
                    self.chip.mode = InterfaceMode::Quad;
                } else {
                    log::warn!("sim: QPI entry ignored, QE not set");
                }
                return Ok(None);
            }
        }
        if op == ops.enter_4byte && !cmd.has_data() {
            self.chip.four_byte = true;
            self.chip.wel = false;
            return Ok(None);
        }
        if let Some(wrap) = self.profile.wrap_disable {
            if op == wrap.opcode && cmd.has_data() {
                return Ok(Some(self.expect_write(WriteTarget::Wrap, cmd)));
            }
        }
        if op == ops.chip_erase && !cmd.has_address() {
            if self.chip.wel {
                log::trace!("sim: chip erase");
                self.memory.fill(0xFF);
                self.start_busy();
            }
            return Ok(None);
        }

        let Some(address) = cmd.address else {
            log::warn!("sim: unknown opcode {:#04x}", op);
            return Err(Error::Bus);
        };
        if cmd.address_width.bytes() != self.expected_address_bytes(op) {
            log::warn!(
                "sim: {:#04x} sent with {}-byte address, chip expects {}",
                op,
                cmd.address_width.bytes(),
                self.expected_address_bytes(op)
            );
            return Ok(cmd.has_data().then(|| Pending::Read(vec![0xFF; cmd.data_len])));
        }
        let offset = address % self.profile.flash_size;

        if self.is_read(op) && cmd.has_data() {
            let mut data = vec![0u8; cmd.data_len];
            self.read_memory(cmd, offset, &mut data);
            return Ok(Some(Pending::Read(data)));
        }
        if ops.page_program.contains(op) || ops.quad_program.is_some_and(|p| p.contains(op)) {
            if Self::uses_quad_lines(cmd) && !self.quad_enabled() {
                log::warn!("sim: quad program without QE, ignored");
                return Ok(Some(self.expect_write(WriteTarget::Discard, cmd)));
            }
            return Ok(Some(self.expect_write(WriteTarget::Program { offset }, cmd)));
        }
        if ops.sector_erase.contains(op) {
            if self.chip.wel {
                self.erase(offset, self.profile.sector_size);
            }
            return Ok(None);
        }
        if let (Some(pair), Some(size)) = (ops.block_erase, self.profile.block_size) {
            if pair.contains(op) {
                if self.chip.wel {
                    self.erase(offset, size);
                }
                return Ok(None);
            }
        }

        log::warn!("sim: unknown opcode {:#04x}", op);
        Err(Error::Bus)
    }

    fn expect_write(&self, target: WriteTarget, cmd: &FlashCommand) -> Pending {
        let target = match target {
            WriteTarget::Discard => target,
            _ if !self.chip.wel && !matches!(target, WriteTarget::Wrap) => {
                log::warn!("sim: {:#04x} without write enable, ignored", cmd.opcode);
                WriteTarget::Discard
            }
            _ => target,
        };
        Pending::Write {
            target,
            len: cmd.data_len,
        }
    }
}

impl BusDriver for SimBus {
    fn command(&mut self, cmd: &FlashCommand) -> Result<()> {
        log::trace!("sim: command {:#04x} {:?}", cmd.opcode, cmd.address);
        self.log.push(*cmd);

        if self.mapped.is_some() {
            return Err(Error::ModeConflict);
        }
        if self.pending.take().is_some() {
            log::warn!("sim: previous data phase never completed");
            return Err(Error::Bus);
        }
        if self.faults.fail_opcode == Some(cmd.opcode) {
            return Err(Error::Bus);
        }

        if !self.decodes(cmd) {
            log::trace!("sim: {:#04x} not decoded in {:?}", cmd.opcode, self.chip.mode);
            self.chip.reset_enabled = false;
            if cmd.has_data() {
                self.pending = Some(Pending::Read(vec![0xFF; cmd.data_len]));
            }
            return Ok(());
        }

        let ops = &self.profile.opcodes;
        let accepted_while_busy = [ops.read_status, ops.reset_enable, ops.reset];
        if self.chip_busy() && !accepted_while_busy.contains(&cmd.opcode) {
            log::warn!("sim: {:#04x} while busy, ignored", cmd.opcode);
            if cmd.has_data() {
                self.pending = Some(Pending::Read(vec![0xFF; cmd.data_len]));
            }
            return Ok(());
        }

        self.pending = self.dispatch(cmd)?.filter(|pending| pending.len() > 0);
        Ok(())
    }

    fn transmit(&mut self, data: &[u8]) -> Result<()> {
        let target = match self.pending.take() {
            // reads of an ignored command double as a sink
            Some(Pending::Read(buf)) if buf.len() == data.len() => WriteTarget::Discard,
            Some(Pending::Write { target, len }) if len == data.len() => target,
            _ => return Err(Error::Bus),
        };
        match target {
            WriteTarget::Program { offset } => self.program(offset, data),
            WriteTarget::Status => {
                self.chip.status = data[0] & !(SR_WIP | SR_WEL);
                if let (Some(&config), Some(cr)) = (data.get(1), self.profile.config_register) {
                    if matches!(cr.write, ConfigWrite::WithStatus) {
                        self.chip.config = config;
                    }
                }
                self.start_busy();
            }
            WriteTarget::Config => {
                self.chip.config = data[0];
                self.start_busy();
            }
            WriteTarget::Config2 { address } => self.write_config2(address, data[0]),
            WriteTarget::Wrap => self.chip.wrap_disabled = data[0] & 0x10 != 0,
            WriteTarget::Discard => {}
        }
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.pending.take() {
            Some(Pending::Read(data)) if data.len() == buf.len() => {
                buf.copy_from_slice(&data);
                Ok(())
            }
            _ => Err(Error::Bus),
        }
    }

    fn enable_memory_mapped(&mut self, cmd: &FlashCommand) -> Result<()> {
        if self.pending.is_some() {
            return Err(Error::Bus);
        }
        log::trace!("sim: memory-mapped with {:#04x}", cmd.opcode);
        self.mapped = Some(*cmd);
        Ok(())
    }

    fn disable_memory_mapped(&mut self) -> Result<()> {
        self.mapped = None;
        Ok(())
    }

    fn read_mapped(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        let Some(cmd) = self.mapped else {
            return Err(Error::Bus);
        };
        if offset as usize + buf.len() > self.memory.len() {
            return Err(Error::Bus);
        }
        let decoded = self.decodes(&cmd)
            && self.is_read(cmd.opcode)
            && cmd.address_width.bytes() == self.expected_address_bytes(cmd.opcode);
        if decoded {
            self.read_memory(&cmd, offset, buf);
        } else {
            buf.fill(0xFF);
        }
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += ms as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extloader_core::profile::builtin;
    use extloader_core::spi::AddressWidth;

    fn wren() -> FlashCommand {
        FlashCommand::simple(opcodes::WREN)
    }

    fn read_sr(sim: &mut SimBus) -> u8 {
        let mut buf = [0u8; 1];
        sim.command(&FlashCommand::simple(opcodes::RDSR).with_data(1))
            .unwrap();
        sim.receive(&mut buf).unwrap();
        buf[0]
    }

    #[test]
    fn test_program_needs_write_enable() {
        let mut sim = SimBus::new(builtin::W25Q128JV.profile);
        let pp = FlashCommand::simple(opcodes::PP)
            .with_address(0x100, AddressWidth::ThreeByte)
            .with_data(2);

        sim.command(&pp).unwrap();
        sim.transmit(&[0x12, 0x34]).unwrap();
        assert_eq!(&sim.memory()[0x100..0x102], &[0xFF, 0xFF]);

        sim.command(&wren()).unwrap();
        assert_eq!(read_sr(&mut sim) & SR_WEL, SR_WEL);
        sim.command(&pp).unwrap();
        sim.transmit(&[0x12, 0x34]).unwrap();
        assert_eq!(&sim.memory()[0x100..0x102], &[0x12, 0x34]);
        // busy for the default number of reads, WEL cleared
        assert_eq!(read_sr(&mut sim), SR_WIP);
        assert_eq!(read_sr(&mut sim), SR_WIP);
        assert_eq!(read_sr(&mut sim), 0);
    }

    #[test]
    fn test_page_program_wraps_within_page() {
        let mut sim = SimBus::new(builtin::W25Q128JV.profile);
        sim.set_busy_polls(0);
        sim.command(&wren()).unwrap();
        sim.command(
            &FlashCommand::simple(opcodes::PP)
                .with_address(0x1FE, AddressWidth::ThreeByte)
                .with_data(4),
        )
        .unwrap();
        sim.transmit(&[1, 2, 3, 4]).unwrap();
        assert_eq!(&sim.memory()[0x1FE..0x200], &[1, 2]);
        assert_eq!(&sim.memory()[0x100..0x102], &[3, 4]);
        assert_eq!(sim.memory()[0x200], 0xFF);
    }

    #[test]
    fn test_commands_in_wrong_mode_are_ignored() {
        let mut sim = SimBus::new(builtin::MX25LM51245G_STR.profile);
        sim.force_mode(InterfaceMode::Octal, TransferRate::Dtr);

        // single-line RDSR is not decoded: the bus floats high
        assert_eq!(read_sr(&mut sim), 0xFF);

        let mut reset_en = FlashCommand::simple(opcodes::RSTEN);
        reset_en.instruction_lines = BusWidth::Octal;
        reset_en.rate = TransferRate::Dtr;
        reset_en.opcode_ext = Some(!opcodes::RSTEN);
        let mut reset = reset_en;
        reset.opcode = opcodes::RST;
        reset.opcode_ext = Some(!opcodes::RST);
        sim.command(&reset_en).unwrap();
        sim.command(&reset).unwrap();
        assert_eq!(sim.chip_mode(), (InterfaceMode::Single, TransferRate::Str));
    }

    #[test]
    fn test_mapped_mode_rejects_commands() {
        let mut sim = SimBus::new(builtin::W25Q128JV.profile);
        let read = FlashCommand::simple(opcodes::FAST_READ)
            .with_address(0, AddressWidth::ThreeByte)
            .with_dummy_cycles(8)
            .with_data(0);
        sim.enable_memory_mapped(&read).unwrap();
        assert_eq!(sim.command(&wren()), Err(Error::ModeConflict));

        sim.memory_mut()[0x10] = 0x42;
        let mut buf = [0u8; 1];
        sim.read_mapped(0x10, &mut buf).unwrap();
        assert_eq!(buf, [0x42]);

        sim.disable_memory_mapped().unwrap();
        assert_eq!(sim.read_mapped(0x10, &mut buf), Err(Error::Bus));
    }

    #[test]
    fn test_data_phase_must_match_command() {
        let mut sim = SimBus::new(builtin::W25Q128JV.profile);
        let mut buf = [0u8; 2];
        assert_eq!(sim.receive(&mut buf), Err(Error::Bus));
        sim.command(&FlashCommand::simple(opcodes::RDSR).with_data(1))
            .unwrap();
        assert_eq!(sim.receive(&mut buf), Err(Error::Bus));
    }

    #[test]
    fn test_image_too_large_is_rejected() {
        let mut profile = builtin::W25Q128JV.profile;
        profile.flash_size = 4096;
        let image = vec![0u8; 4097];
        assert!(matches!(
            SimBus::with_image(profile, &image),
            Err(SimError::ImageTooLarge {
                image: 4097,
                flash: 4096
            })
        ));
    }
}
