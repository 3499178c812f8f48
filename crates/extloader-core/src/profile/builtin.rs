//! Built-in device profiles
//!
//! One entry per chip/board combination the loaders ship for. Every entry
//! maps the chip at 0x9000_0000, the QSPI/OSPI window of STM32 parts.

use super::types::*;
use crate::spi::{opcodes, AddressWidth};

const MAPPED_BASE: u32 = 0x9000_0000;

const KIB: u32 = 1024;
const MIB: u32 = 1024 * 1024;

/// Micron N25Q128A, 16 MiB, quad I/O reads from SPI mode
pub const N25Q128A: ProfileEntry = ProfileEntry {
    vendor: "Micron",
    name: "N25Q128A",
    board: "STM32F746G-DISCO",
    profile: DeviceProfile {
        flash_size: 16 * MIB,
        page_size: 256,
        sector_size: 4 * KIB,
        block_size: Some(64 * KIB),
        address_width: AddressWidth::ThreeByte,
        four_byte: FourByteMode::Native,
        mapped_base: MAPPED_BASE,
        jedec_id: Some(JedecId::new(0x20, 0xBA18)),
        opcodes: Opcodes {
            chip_erase: opcodes::CE_C7,
            quad_program: Some(OpcodePair::same(opcodes::QPP)),
            ..Opcodes::JEDEC
        },
        dummy: DummyCycles {
            fast_read: 8,
            quad_read: 10,
            octal_read: 0,
            octal_status: 0,
        },
        timeouts: Timeouts {
            default_ms: 5_000,
            sector_erase_ms: 1_000,
            block_erase_ms: 3_000,
            max_erase_ms: 250_000,
        },
        quad_enable: QuadEnable::None,
        config_register: Some(ConfigRegister {
            read_opcode: opcodes::RDVCR,
            write: ConfigWrite::Dedicated(opcodes::WRVCR),
            // VCR[7:4] holds the dummy-cycle count
            dummy: Some(RegisterField {
                mask: 0xF0,
                value: 10 << 4,
            }),
        }),
        target_mode: TargetMode::SpiQuadIo,
        wrap_disable: None,
        reset_modes: ResetModes::SINGLE.union(ResetModes::QUAD),
        reset_recovery_ms: 1,
    },
};

/// Micron N25Q512A, 64 MiB, EN4B addressing
pub const N25Q512A: ProfileEntry = ProfileEntry {
    vendor: "Micron",
    name: "N25Q512A",
    board: "STM32F769I-EVAL",
    profile: DeviceProfile {
        flash_size: 64 * MIB,
        address_width: AddressWidth::FourByte,
        four_byte: FourByteMode::Enter,
        jedec_id: Some(JedecId::new(0x20, 0xBA20)),
        timeouts: Timeouts {
            default_ms: 5_000,
            sector_erase_ms: 1_000,
            block_erase_ms: 3_000,
            max_erase_ms: 480_000,
        },
        ..N25Q128A.profile
    },
};

/// Macronix MX25L51245G, 64 MiB, driven in QPI
pub const MX25L51245G: ProfileEntry = ProfileEntry {
    vendor: "Macronix",
    name: "MX25L51245G",
    board: "STM32F769I-DISCO",
    profile: DeviceProfile {
        flash_size: 64 * MIB,
        page_size: 256,
        sector_size: 4 * KIB,
        block_size: Some(64 * KIB),
        address_width: AddressWidth::FourByte,
        four_byte: FourByteMode::Enter,
        mapped_base: MAPPED_BASE,
        jedec_id: Some(JedecId::new(0xC2, 0x201A)),
        opcodes: Opcodes {
            chip_erase: opcodes::CE_60,
            ..Opcodes::JEDEC
        },
        dummy: DummyCycles {
            fast_read: 8,
            quad_read: 8,
            octal_read: 0,
            octal_status: 0,
        },
        timeouts: Timeouts {
            default_ms: 5_000,
            sector_erase_ms: 1_000,
            block_erase_ms: 2_000,
            max_erase_ms: 300_000,
        },
        quad_enable: QuadEnable::Status(opcodes::SR1_QE),
        config_register: Some(ConfigRegister {
            read_opcode: opcodes::RDCR,
            write: ConfigWrite::WithStatus,
            // CR[7:6] = 10: 8 dummy cycles for quad I/O reads
            dummy: Some(RegisterField {
                mask: 0xC0,
                value: 0x80,
            }),
        }),
        target_mode: TargetMode::Qpi {
            enter_opcode: opcodes::EQIO_35,
        },
        wrap_disable: Some(WrapDisable {
            opcode: opcodes::SBL,
            value: 0x10,
        }),
        reset_modes: ResetModes::SINGLE.union(ResetModes::QUAD),
        reset_recovery_ms: 1,
    },
};

const MX25LM51245G: DeviceProfile = DeviceProfile {
    flash_size: 64 * MIB,
    page_size: 256,
    sector_size: 4 * KIB,
    block_size: Some(64 * KIB),
    address_width: AddressWidth::FourByte,
    four_byte: FourByteMode::Native,
    mapped_base: MAPPED_BASE,
    jedec_id: Some(JedecId::new(0xC2, 0x853A)),
    opcodes: Opcodes {
        sector_erase: OpcodePair::new(opcodes::SE_20, opcodes::SE_21),
        block_erase: Some(OpcodePair::new(opcodes::BE_D8, opcodes::BE_DC)),
        chip_erase: opcodes::CE_60,
        page_program: OpcodePair::new(opcodes::PP, opcodes::PP_4B),
        fast_read: OpcodePair::new(opcodes::FAST_READ, opcodes::FAST_READ_4B),
        quad_read: OpcodePair::new(opcodes::QIOR, opcodes::QIOR_4B),
        octal_read: opcodes::OCTAL_READ_STR,
        ..Opcodes::JEDEC
    },
    dummy: DummyCycles {
        fast_read: 8,
        quad_read: 6,
        octal_read: 20,
        octal_status: 4,
    },
    timeouts: Timeouts {
        default_ms: 5_000,
        sector_erase_ms: 1_000,
        block_erase_ms: 2_000,
        max_erase_ms: 460_000,
    },
    quad_enable: QuadEnable::None,
    config_register: None,
    target_mode: TargetMode::Opi {
        dtr: false,
        write_config2: opcodes::WRCR2,
        dummy_value: opcodes::CR2_DC_20,
    },
    wrap_disable: None,
    reset_modes: ResetModes::all(),
    reset_recovery_ms: 1,
};

/// Macronix MX25LM51245G, 64 MiB, octal STR
pub const MX25LM51245G_STR: ProfileEntry = ProfileEntry {
    vendor: "Macronix",
    name: "MX25LM51245G-STR",
    board: "STM32L4R9I-EVAL",
    profile: MX25LM51245G,
};

/// Macronix MX25LM51245G, 64 MiB, octal DTR
pub const MX25LM51245G_DTR: ProfileEntry = ProfileEntry {
    vendor: "Macronix",
    name: "MX25LM51245G-DTR",
    board: "STM32L4R9I-EVAL",
    profile: DeviceProfile {
        opcodes: Opcodes {
            octal_read: opcodes::OCTAL_READ_DTR,
            ..MX25LM51245G.opcodes
        },
        target_mode: TargetMode::Opi {
            dtr: true,
            write_config2: opcodes::WRCR2,
            dummy_value: opcodes::CR2_DC_20,
        },
        ..MX25LM51245G
    },
};

/// Winbond W25Q128JV, 16 MiB, quad I/O reads from SPI mode
pub const W25Q128JV: ProfileEntry = ProfileEntry {
    vendor: "Winbond",
    name: "W25Q128JV",
    board: "STM32H750B-DK",
    profile: DeviceProfile {
        flash_size: 16 * MIB,
        page_size: 256,
        sector_size: 4 * KIB,
        block_size: Some(64 * KIB),
        address_width: AddressWidth::ThreeByte,
        four_byte: FourByteMode::Native,
        mapped_base: MAPPED_BASE,
        jedec_id: Some(JedecId::new(0xEF, 0x4018)),
        opcodes: Opcodes {
            quad_program: Some(OpcodePair::same(opcodes::QPP)),
            ..Opcodes::JEDEC
        },
        dummy: DummyCycles {
            fast_read: 8,
            quad_read: 6,
            octal_read: 0,
            octal_status: 0,
        },
        timeouts: Timeouts {
            default_ms: 5_000,
            sector_erase_ms: 1_000,
            block_erase_ms: 2_000,
            max_erase_ms: 200_000,
        },
        quad_enable: QuadEnable::Config(opcodes::SR2_QE),
        config_register: Some(ConfigRegister {
            read_opcode: opcodes::RDSR2,
            write: ConfigWrite::WithStatus,
            dummy: None,
        }),
        target_mode: TargetMode::SpiQuadIo,
        wrap_disable: None,
        reset_modes: ResetModes::SINGLE,
        reset_recovery_ms: 1,
    },
};

/// All built-in profiles
pub const ALL: &[ProfileEntry] = &[
    N25Q128A,
    N25Q512A,
    MX25L51245G,
    MX25LM51245G_STR,
    MX25LM51245G_DTR,
    W25Q128JV,
];

/// Look up a built-in profile by name (case-insensitive)
pub fn find(name: &str) -> Option<&'static ProfileEntry> {
    ALL.iter().find(|entry| entry.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_are_consistent() {
        for entry in ALL {
            assert_eq!(entry.profile.validate(), Ok(()), "{}", entry.name);
        }
    }

    #[test]
    fn test_lookup_ignores_case() {
        let entry = find("mx25lm51245g-dtr").unwrap();
        assert_eq!(entry.vendor, "Macronix");
        assert!(matches!(
            entry.profile.target_mode,
            TargetMode::Opi { dtr: true, .. }
        ));
        assert!(find("nonexistent").is_none());
    }

    #[test]
    fn test_octal_parts_power_up_with_native_four_byte() {
        assert_eq!(
            MX25LM51245G_STR.profile.power_on_address_width(),
            AddressWidth::FourByte
        );
        assert_eq!(
            N25Q512A.profile.power_on_address_width(),
            AddressWidth::ThreeByte
        );
    }

    #[test]
    fn test_mapped_base_inside_device_range_is_rejected() {
        let mut profile = W25Q128JV.profile;
        profile.mapped_base = 0x0010_0000;
        assert_eq!(profile.validate(), Err(ProfileError::MappedBase(0x0010_0000)));
        profile.mapped_base = 0;
        assert_eq!(profile.validate(), Ok(()));
        profile.mapped_base = profile.flash_size;
        assert_eq!(profile.validate(), Ok(()));
    }

    #[test]
    fn test_translate_mapped_and_raw_addresses() {
        let profile = &W25Q128JV.profile;
        assert_eq!(profile.to_offset(0x9000_1000, 16), Ok(0x1000));
        assert_eq!(profile.to_offset(0x1000, 16), Ok(0x1000));
        assert_eq!(profile.to_offset(0x90FF_FFF0, 16), Ok(0xFF_FFF0));
        assert_eq!(
            profile.to_offset(0x90FF_FFF0, 17),
            Err(crate::Error::InvalidRange {
                address: 0x90FF_FFF0,
                len: 17
            })
        );
    }
}
