//! Host-tool entry points and their return conventions

use extloader_core::loader::{Loader, FAILURE, SUCCESS, VERIFY_FAILED};
use extloader_core::profile::builtin;
use extloader_sim::SimBus;

fn loader(name: &str) -> Loader<SimBus> {
    let entry = builtin::find(name).unwrap();
    let mut loader = Loader::new(SimBus::new(entry.profile), entry.profile);
    assert_eq!(loader.init(), SUCCESS);
    loader
}

#[test]
fn test_write_erase_and_checksum() {
    let mut loader = loader("W25Q128JV");
    let data: Vec<u8> = (0..600u32).map(|i| (i % 251) as u8).collect();

    assert_eq!(loader.sector_erase(0x9000_0000, 0x9000_0FFF), SUCCESS);
    assert_eq!(loader.write(0x9000_00FA, data.len() as u32, &data), SUCCESS);

    let sum = data.iter().fold(0x10u32, |acc, &b| acc.wrapping_add(b as u32));
    assert_eq!(loader.check_sum(0x9000_00FA, 150, 0x10), sum);
}

#[test]
fn test_verify_packs_checksum_and_mismatch() {
    let mut loader = loader("N25Q128A");
    let reference = vec![0x3Cu8; 64];
    let mut flashed = reference.clone();
    flashed[10] = 0;
    assert_eq!(loader.write(0x9000_1000, 64, &flashed), SUCCESS);

    let sum = loader.check_sum(0x9000_1000, 16, 0);
    let packed = loader.verify(0x9000_1000, &reference, 16, 0);
    assert_eq!(packed, ((sum as u64) << 32) | 0x9000_100A);

    let packed = loader.verify(0x9000_1000, &flashed, 16, 0);
    assert_eq!(packed, (sum as u64) << 32);
}

#[test]
fn test_failures_collapse_to_zero() {
    let mut loader = loader("MX25L51245G");
    let flash_end = 0x9000_0000 + loader.device().profile().flash_size;

    assert_eq!(loader.write(flash_end - 1, 2, &[0, 0]), FAILURE);
    // buffer shorter than the requested size
    assert_eq!(loader.write(0x9000_0000, 8, &[0; 4]), FAILURE);
    assert_eq!(loader.sector_erase(flash_end, flash_end + 1), FAILURE);
    assert_eq!(loader.check_sum(flash_end, 1, 0), 0);
    assert_eq!(loader.verify(flash_end, &[0; 4], 1, 0), VERIFY_FAILED);
}

#[test]
fn test_mass_erase_ignores_parallelism() {
    let mut loader = loader("MX25LM51245G-DTR");
    assert_eq!(loader.write(0x9000_0000, 4, &[1, 2, 3, 4]), SUCCESS);
    assert_eq!(loader.mass_erase(1), SUCCESS);
    assert_eq!(loader.check_sum(0x9000_0000, 1, 0), 4 * 0xFF);
}

#[test]
fn test_init_failure_returns_zero() {
    let entry = &builtin::W25Q128JV;
    let mut sim = SimBus::new(entry.profile);
    sim.set_stuck_busy(true);
    let mut loader = Loader::new(sim, entry.profile);
    assert_eq!(loader.init(), FAILURE);
}

#[test]
fn test_init_is_repeatable() {
    let mut loader = loader("N25Q512A");
    assert_eq!(loader.write(0x9100_0000, 2, &[0xAB, 0xCD]), SUCCESS);
    assert_eq!(loader.init(), SUCCESS);
    assert_eq!(loader.check_sum(0x9100_0000, 1, 0), 0xAB + 0xCD + 2 * 0xFF);
}

#[test]
fn test_init_with_inconsistent_profile_returns_zero() {
    let entry = &builtin::N25Q128A;
    let mut profile = entry.profile;
    profile.page_size = 0;
    let mut loader = Loader::new(SimBus::new(entry.profile), profile);
    assert_eq!(loader.init(), FAILURE);
    assert_eq!(loader.sector_erase(0x9000_0000, 0x9000_0010), FAILURE);
    assert_eq!(loader.write(0x9000_0000, 4, &[1, 2, 3, 4]), FAILURE);
}
