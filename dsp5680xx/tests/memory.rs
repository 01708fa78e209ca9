mod common;

use dsp5680xx::architecture::dsp5680xx::Address;
use dsp5680xx::probe::fake_probe::FakeDsp;
use dsp5680xx::{ByteOrder, CoreInterface, Dsp5680xx, Dsp5680xxError, TargetState};
use dsp5680xx_target::Chip;
use pretty_assertions::assert_eq;
use test_case::test_case;

const DATA: u32 = 0x20_0100;
const PROGRAM_RAM: u32 = 0x8000;

#[test_case(DATA, 0x0000; "data zero")]
#[test_case(DATA, 0xFFFF; "data all ones")]
#[test_case(DATA, 0x8000; "data sign bit")]
#[test_case(PROGRAM_RAM, 0x0000; "program zero")]
#[test_case(PROGRAM_RAM, 0xFFFF; "program all ones")]
#[test_case(PROGRAM_RAM, 0x8000; "program sign bit")]
fn word_round_trip(address: u32, value: u16) {
    let (_fake, mut target) = common::halted();

    target
        .write_memory(address, 2, 1, &value.to_le_bytes())
        .expect("write failed");

    assert_eq!(target.read_memory(address, 2, 1).unwrap(), value.to_le_bytes());
}

#[test]
fn words_land_in_the_right_space() {
    let (fake, mut target) = common::halted();

    target
        .write_memory(0x20_0010, 2, 2, &[0x34, 0x12, 0x78, 0x56])
        .unwrap();
    target
        .write_memory(0x8010, 2, 2, &[0xCD, 0xAB, 0x01, 0xEF])
        .unwrap();

    assert_eq!(fake.data_word(0x0010), 0x1234);
    assert_eq!(fake.data_word(0x0011), 0x5678);
    assert_eq!(fake.program_word(0x8010), 0xABCD);
    assert_eq!(fake.program_word(0x8011), 0xEF01);
    assert_eq!(fake.data_word(0x8010), 0x0000);
}

#[test_case(DATA; "data")]
#[test_case(PROGRAM_RAM; "program")]
fn double_word_round_trip(address: u32) {
    let (_fake, mut target) = common::halted();
    let values = [0xFFFF_FFFFu32, 0x1234_5678];
    let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();

    target.write_memory(address, 4, 2, &bytes).unwrap();

    assert_eq!(target.read_memory(address, 4, 2).unwrap(), bytes);
    // The low half is stored first.
    assert_eq!(target.read_memory(address + 2, 2, 2).unwrap(), [0x78, 0x56, 0x34, 0x12]);
}

#[test]
fn double_word_read_ignores_the_low_address_bit() {
    let (fake, mut target) = common::halted();
    fake.set_data_word(0x0200, 0x5678);
    fake.set_data_word(0x0201, 0x1234);

    let bytes = target.read_memory(0x20_0201, 4, 1).unwrap();

    assert_eq!(bytes, 0x1234_5678u32.to_le_bytes());
}

#[test]
fn odd_byte_write_preserves_the_straddled_byte() {
    let (fake, mut target) = common::halted();
    fake.set_data_word(0x0101, 0xA5C3);

    target.write_memory(DATA, 1, 3, &[0x11, 0x22, 0x33]).unwrap();

    assert_eq!(fake.data_word(0x0100), 0x2211);
    assert_eq!(fake.data_word(0x0101), 0xA533);
    assert_eq!(target.read_memory(DATA, 1, 4).unwrap(), [0x11, 0x22, 0x33, 0xA5]);
}

#[test]
fn big_endian_byte_buffers() {
    let (fake, target) = common::halted();
    let mut target = target.with_byte_order(ByteOrder::BigEndian);
    fake.set_data_word(0x0101, 0xA5C3);

    target.write_buffer(DATA, &[0x11, 0x22, 0x33]).unwrap();

    assert_eq!(fake.data_word(0x0100), 0x1122);
    assert_eq!(fake.data_word(0x0101), 0x33C3);
    assert_eq!(target.read_buffer(DATA, 3).unwrap(), [0x11, 0x22, 0x33]);
}

#[test]
fn byte_reads_default_to_low_byte_first() {
    let (fake, mut target) = common::halted();
    fake.set_data_word(0x0100, 0xBEEF);

    assert_eq!(target.read_buffer(DATA, 2).unwrap(), [0xEF, 0xBE]);
    assert_eq!(target.read_buffer(DATA, 1).unwrap(), [0xEF]);
}

#[test]
fn large_writes_are_batched() {
    let (fake, mut target) = common::halted();
    let words: Vec<u16> = (0..300).collect();
    let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();

    target.write_memory(0x20_1000, 2, words.len(), &bytes).unwrap();

    assert!(fake.max_queue_depth() > 0);
    assert_eq!(target.read_memory(0x20_1000, 2, words.len()).unwrap(), bytes);
}

/// A data word write is a three word address load and a two word store,
/// each word shifted after its own command.
const SHIFTS_PER_DATA_WRITE: usize = 10;

#[test]
fn block_writes_flush_at_the_configured_interval() {
    common::init_logging();
    let mut chip = Chip::generic("MC56F8013");
    chip.debug.write_flush_interval = 8;
    let fake = FakeDsp::new();
    let mut target = Dsp5680xx::new(Box::new(fake.clone()), chip);
    target.halt().unwrap();
    let words: Vec<u16> = (0..100).collect();
    let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();

    target.write_memory(0x20_1000, 2, words.len(), &bytes).unwrap();

    assert_eq!(fake.max_queue_depth(), 8 * SHIFTS_PER_DATA_WRITE);
    assert_eq!(target.read_memory(0x20_1000, 2, words.len()).unwrap(), bytes);
}

#[test]
fn memory_access_needs_a_halted_core() {
    let (fake, mut target) = common::attach();
    target.poll().unwrap();
    assert_eq!(target.state(), TargetState::Running);
    let scans = fake.scan_count();

    let error = target.read_memory(DATA, 2, 1).unwrap_err();

    assert!(matches!(error, Dsp5680xxError::NotHalted(TargetState::Running)));
    assert!(matches!(
        target.write_memory(DATA, 2, 1, &[0, 0]),
        Err(Dsp5680xxError::NotHalted(_))
    ));
    assert_eq!(fake.scan_count(), scans);
}

#[test_case(0)]
#[test_case(3)]
#[test_case(8)]
fn unsupported_access_sizes(size: u32) {
    let (_fake, mut target) = common::halted();

    assert!(matches!(
        target.read_memory(DATA, size, 1),
        Err(Dsp5680xxError::InvalidAccessSize(s)) if s == size
    ));
    assert!(matches!(
        target.write_memory(DATA, size, 1, &[0; 8]),
        Err(Dsp5680xxError::InvalidAccessSize(_))
    ));
}

#[test]
fn oversized_transfers_are_rejected() {
    let (fake, mut target) = common::halted();
    let scans = fake.scan_count();

    assert!(matches!(
        target.read_memory(DATA, 4, usize::MAX),
        Err(Dsp5680xxError::TransferTooLarge(usize::MAX))
    ));
    assert!(matches!(
        target.read_memory(DATA, 2, usize::MAX / 2),
        Err(Dsp5680xxError::TransferTooLarge(_))
    ));
    assert!(matches!(
        target.write_memory(DATA, 4, usize::MAX, &[0; 4]),
        Err(Dsp5680xxError::TransferTooLarge(usize::MAX))
    ));
    assert_eq!(fake.scan_count(), scans);
}

#[test]
fn short_buffers_are_rejected() {
    let (_fake, mut target) = common::halted();

    let error = target.write_memory(DATA, 4, 2, &[0; 6]).unwrap_err();

    assert!(matches!(
        error,
        Dsp5680xxError::BufferTooSmall {
            needed: 8,
            actual: 6
        }
    ));
}

#[test]
fn host_interface_reports_through_the_crate_error() {
    let (_fake, mut target) = common::halted();
    let host: &mut dyn CoreInterface = &mut target;

    host.write_buffer(DATA, &[1, 2]).unwrap();

    assert_eq!(host.read_buffer(DATA, 2).unwrap(), [1, 2]);
    assert!(matches!(
        host.read_memory(DATA, 3, 1),
        Err(dsp5680xx::Error::Dsp5680xx(Dsp5680xxError::InvalidAccessSize(3)))
    ));
}

#[test]
fn download_machine_code() {
    let (fake, mut target) = common::halted();
    let stub = dsp5680xx::flashing::stubs::PRAM_WRITER;

    target
        .download(Address::program(0x8700), stub.code)
        .expect("download failed");

    let words: Vec<u16> = (0..stub.code.len() as u32)
        .map(|offset| fake.program_word(0x8700 + offset))
        .collect();
    assert_eq!(words, stub.code);
}

#[test]
fn download_needs_a_halted_core() {
    let (_fake, mut target) = common::attach();

    assert!(matches!(
        target.download(Address::program(0x8700), &[0x8A44]),
        Err(Dsp5680xxError::NotHalted(TargetState::Unknown))
    ));
}
