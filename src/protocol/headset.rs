//! Headset memory protocol (§6): a separate report stream used by
//! `DeviceKind::Headset` variants to read/write onboard RAM/EEPROM, distinct
//! from the 90-byte feature report used by every other device kind.
//!
//! Output report id `0x04` (37 bytes), input report id `0x05` (33 bytes),
//! 25 ms inter-command delay. Byte 0 selects destination, byte 1 is length,
//! bytes 2-3 are a big-endian address. The set of addresses a given headset
//! variant actually answers is part of its [`crate::descriptor::DeviceDescriptor`],
//! not this codec.

use std::time::Duration;

pub const OUTPUT_REPORT_ID: u8 = 0x04;
pub const OUTPUT_REPORT_LEN: usize = 37;
pub const INPUT_REPORT_ID: u8 = 0x05;
pub const INPUT_REPORT_LEN: usize = 33;

/// Inter-command delay for the headset memory stream, distinct from the
/// owning [`crate::protocol::ProtocolProfile`]'s matrix/LED delay (§6).
pub const HEADSET_INTER_COMMAND_DELAY: Duration = Duration::from_millis(25);

/// Maximum payload bytes a single read/write can carry: report minus the
/// 4-byte header (destination, length, address hi/lo).
pub const MAX_PAYLOAD_LEN: usize = OUTPUT_REPORT_LEN - 4;

/// Which memory bank a [`HeadsetCommand`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    ReadRam,
    ReadEeprom,
    WriteRam,
}

impl Destination {
    fn to_byte(self) -> u8 {
        match self {
            Destination::ReadRam => 0x00,
            Destination::ReadEeprom => 0x20,
            Destination::WriteRam => 0x40,
        }
    }

    fn from_byte(b: u8) -> Option<Destination> {
        match b {
            0x00 => Some(Destination::ReadRam),
            0x20 => Some(Destination::ReadEeprom),
            0x40 => Some(Destination::WriteRam),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeadsetCommand {
    pub destination: Destination,
    pub address: u16,
    /// Empty for a read; the bytes to write for `WriteRam`.
    pub data: Vec<u8>,
}

/// Packs one [`HeadsetCommand`] into a 37-byte output report (byte 0 of the
/// buffer is the HID report id, §6).
pub fn pack(cmd: &HeadsetCommand) -> [u8; OUTPUT_REPORT_LEN] {
    let mut buf = [0u8; OUTPUT_REPORT_LEN];
    buf[0] = OUTPUT_REPORT_ID;
    buf[1] = cmd.destination.to_byte();
    buf[2] = cmd.data.len().min(MAX_PAYLOAD_LEN) as u8;
    buf[3] = (cmd.address >> 8) as u8;
    buf[4] = (cmd.address & 0xFF) as u8;
    let n = cmd.data.len().min(MAX_PAYLOAD_LEN - 1);
    buf[5..5 + n].copy_from_slice(&cmd.data[..n]);
    buf
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadsetResponse {
    pub destination: Option<Destination>,
    pub length: u8,
    pub address: u16,
    pub payload: Vec<u8>,
}

/// Unpacks a 33-byte input report echoed back from the headset.
pub fn unpack(buf: [u8; INPUT_REPORT_LEN]) -> HeadsetResponse {
    let destination = Destination::from_byte(buf[0]);
    let length = buf[1];
    let address = u16::from_be_bytes([buf[2], buf[3]]);
    let available = INPUT_REPORT_LEN - 4;
    let n = (length as usize).min(available);
    HeadsetResponse { destination, length, address, payload: buf[4..4 + n].to_vec() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_sets_output_report_id_and_destination_byte() {
        let cmd = HeadsetCommand { destination: Destination::ReadEeprom, address: 0x0100, data: vec![] };
        let buf = pack(&cmd);
        assert_eq!(buf[0], OUTPUT_REPORT_ID);
        assert_eq!(buf[1], 0x20);
        assert_eq!(buf[3], 0x01);
        assert_eq!(buf[4], 0x00);
    }

    #[test]
    fn pack_write_ram_carries_data_after_header() {
        let cmd = HeadsetCommand { destination: Destination::WriteRam, address: 0x0002, data: vec![0xAA, 0xBB] };
        let buf = pack(&cmd);
        assert_eq!(buf[1], 0x40);
        assert_eq!(buf[2], 2);
        assert_eq!(&buf[5..7], &[0xAA, 0xBB]);
    }

    #[test]
    fn unpack_recovers_destination_address_and_payload() {
        let mut buf = [0u8; INPUT_REPORT_LEN];
        buf[0] = 0x00; // ReadRam
        buf[1] = 3;
        buf[2] = 0x00;
        buf[3] = 0x10;
        buf[4..7].copy_from_slice(&[1, 2, 3]);
        let resp = unpack(buf);
        assert_eq!(resp.destination, Some(Destination::ReadRam));
        assert_eq!(resp.address, 0x0010);
        assert_eq!(resp.payload, vec![1, 2, 3]);
    }

    #[test]
    fn unknown_destination_byte_yields_none() {
        let mut buf = [0u8; INPUT_REPORT_LEN];
        buf[0] = 0x7F;
        let resp = unpack(buf);
        assert_eq!(resp.destination, None);
    }
}
