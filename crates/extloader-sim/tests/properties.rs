//! Write, erase, checksum and verify behavior on every built-in profile

use extloader_core::flash::{checksum, FlashDevice, SliceWindow};
use extloader_core::profile::{builtin, ProfileEntry};
use extloader_sim::SimBus;

fn ready(entry: &ProfileEntry) -> FlashDevice<SimBus> {
    let mut dev = FlashDevice::new(SimBus::new(entry.profile), entry.profile);
    dev.init().unwrap_or_else(|e| panic!("{}: init failed: {}", entry.name, e));
    dev
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

#[test]
fn test_program_commands_never_cross_a_page() {
    for entry in builtin::ALL {
        let mut dev = ready(entry);
        let profile = entry.profile;
        let page = profile.page_size;
        let ops = profile.opcodes;
        let data = pattern(3 * page as usize + 37, 1);
        let start = page * 5 - 11;

        dev.bus_mut().clear_log();
        dev.write(profile.to_address(start), &data).unwrap();

        let programs: Vec<_> = dev
            .bus()
            .commands()
            .iter()
            .filter(|cmd| {
                cmd.has_data()
                    && (ops.page_program.contains(cmd.opcode)
                        || ops.quad_program.is_some_and(|p| p.contains(cmd.opcode)))
            })
            .copied()
            .collect();

        let mut expected = start;
        for cmd in &programs {
            let address = cmd.address.unwrap();
            assert_eq!(address, expected, "{}", entry.name);
            assert!(
                address % page + cmd.data_len as u32 <= page,
                "{}: program at {:#x} len {} crosses a page",
                entry.name,
                address,
                cmd.data_len
            );
            expected += cmd.data_len as u32;
        }
        assert_eq!(expected - start, data.len() as u32, "{}", entry.name);
        assert_eq!(programs.first().map(|c| c.data_len), Some(11));
    }
}

#[test]
fn test_write_round_trips_through_mapped_window() {
    for entry in builtin::ALL {
        let mut dev = ready(entry);
        let profile = entry.profile;
        let page = profile.page_size;
        let cases: [(u32, usize); 5] = [
            (0x1000, 0),
            (0x1000, 1),
            (0x2000, 4 * page as usize),
            (0x3000 + 250, 20),
            (0x4000 + 3, 2 * page as usize + 100),
        ];

        for (i, &(offset, len)) in cases.iter().enumerate() {
            let data = pattern(len, i as u8);
            let address = profile.to_address(offset);
            dev.write(address, &data).unwrap();

            dev.disable_memory_mapped().unwrap();
            dev.enable_memory_mapped().unwrap();
            let mut back = vec![0u8; len];
            dev.read_mapped(address, &mut back).unwrap();
            assert_eq!(back, data, "{} offset={:#x} len={}", entry.name, offset, len);
        }
    }
}

#[test]
fn test_discrete_reads_match_mapped_reads() {
    for entry in builtin::ALL {
        let mut dev = ready(entry);
        let address = entry.profile.to_address(0x5010);
        let data = pattern(300, 9);
        dev.write(address, &data).unwrap();

        let mut discrete = vec![0u8; data.len()];
        dev.read(address, &mut discrete).unwrap();
        assert_eq!(discrete, data, "{}", entry.name);
    }
}

#[test]
fn test_sector_erase_covers_rounded_range() {
    for entry in builtin::ALL {
        let mut dev = ready(entry);
        let sector = entry.profile.sector_size;
        let window = 8 * sector as usize;
        dev.bus_mut().memory_mut()[..window].fill(0x00);

        let start = sector + sector / 2;
        let end = 3 * sector;
        let erased = dev
            .erase_range(entry.profile.to_address(start), entry.profile.to_address(end))
            .unwrap();
        assert_eq!(erased, 3, "{}", entry.name);

        let memory = dev.bus().memory();
        for (s, chunk) in memory[..window].chunks(sector as usize).enumerate() {
            let expect = if (1..=3).contains(&s) { 0xFF } else { 0x00 };
            assert!(
                chunk.iter().all(|&b| b == expect),
                "{}: sector {} should read {:#04x}",
                entry.name,
                s,
                expect
            );
        }
    }
}

#[test]
fn test_block_and_chip_erase() {
    let entry = &builtin::N25Q128A;
    let mut dev = ready(entry);
    let block = entry.profile.block_size.unwrap() as usize;
    dev.bus_mut().memory_mut()[..3 * block].fill(0x00);

    dev.disable_memory_mapped().unwrap();
    dev.erase_block(entry.profile.to_address(block as u32 + 17)).unwrap();
    let memory = dev.bus().memory();
    assert!(memory[..block].iter().all(|&b| b == 0x00));
    assert!(memory[block..2 * block].iter().all(|&b| b == 0xFF));
    assert!(memory[2 * block..3 * block].iter().all(|&b| b == 0x00));

    dev.mass_erase().unwrap();
    assert!(dev.bus().memory()[..3 * block].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_checksum_is_byte_sum_of_range() {
    for entry in builtin::ALL {
        let mut dev = ready(entry);
        let data = pattern(1021, 3);
        let address = entry.profile.to_address(0x6003);
        dev.write(address, &data).unwrap();

        let expected = data.iter().fold(0u32, |acc, &b| acc.wrapping_add(b as u32));
        let first = dev.checksum(address, data.len() as u32, 0).unwrap();
        let second = dev.checksum(address, data.len() as u32, 0).unwrap();
        assert_eq!(first, expected, "{}", entry.name);
        assert_eq!(first, second, "{}", entry.name);
    }
}

#[test]
fn test_checksum_skips_padding_of_last_word() {
    let entry = &builtin::W25Q128JV;
    let mut dev = ready(entry);
    let address = entry.profile.to_address(0x1000);
    dev.write(address, &[0x01, 0x02, 0x03, 0x04, 0x05]).unwrap();
    assert_eq!(dev.checksum(address, 5, 0), Ok(15));

    let mut window = SliceWindow::new(address, dev.bus().memory().get(0x1000..0x1008).unwrap());
    assert_eq!(checksum(&mut window, address, 5, 0), Ok(15));
}

#[test]
fn test_verify_reports_first_mismatch() {
    for entry in builtin::ALL {
        let mut dev = ready(entry);
        let reference = pattern(512, 7);
        let address = entry.profile.to_address(0x8000);
        let mut programmed = reference.clone();
        programmed[123] ^= 0x5A;
        dev.write(address, &programmed).unwrap();

        let outcome = dev.verify(address, &reference, 128, 0).unwrap();
        let sum = dev.checksum(address, 512, 0).unwrap();
        assert_eq!(outcome.mismatch, Some(address + 123), "{}", entry.name);
        assert_eq!(outcome.to_legacy(), ((sum as u64) << 32) | (address + 123) as u64);
    }
}

#[test]
fn test_verify_of_matching_range() {
    let entry = &builtin::MX25LM51245G_DTR;
    let mut dev = ready(entry);
    let data = pattern(256, 2);
    let address = entry.profile.to_address(0x10_0000);
    dev.write(address, &data).unwrap();

    let outcome = dev.verify(address, &data, 64, 0).unwrap();
    assert!(outcome.is_match());
    assert_eq!(outcome.checksum, dev.checksum(address, 256, 0).unwrap());
}
