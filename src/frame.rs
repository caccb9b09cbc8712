//! Frame building, checksum and info-frame resync.
//!
//! Command frame (host to sensor), 4 bytes:
//! - OPCODE
//! - PARAM A (sub-address, or 0x00)
//! - PARAM B (value, or 0x00)
//! - CHECKSUM
//!
//! Replies are 8, 12 or 25 bytes long, echo the opcode at index 4 and end with
//! a checksum over every preceding byte. The checksum is the two's complement
//! of the byte sum, so a frame's bytes add up to zero modulo 256.

use log::debug;

use crate::constants::{COMMAND_LEN, INFO_FRAME_LEN, INFO_HEADER, INFO_RESYNC_CYCLES};

/// Two's complement of the mod-256 sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |sum, &b| sum.wrapping_add(b))
        .wrapping_neg()
}

/// Returns true if the last byte of `frame` is the checksum of the bytes before it.
pub fn is_valid(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((&received, body)) => checksum(body) == received,
        None => false,
    }
}

/// Builds a command frame with its checksum filled in.
pub fn command(opcode: u8, param_a: u8, param_b: u8) -> [u8; COMMAND_LEN] {
    let mut frame = [opcode, param_a, param_b, 0x00];
    frame[3] = checksum(&frame[..3]);
    frame
}

/// Decodes one packed BCD byte, `0x42` -> `42`.
pub fn bcd_to_decimal(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

/// Outcome of scanning a byte window for an info frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// A valid frame ends at `consumed`; every byte before it has been used up.
    Found {
        frame: [u8; INFO_FRAME_LEN],
        consumed: usize,
    },
    /// The window ran out before a whole frame; bytes from `skip` on may start one.
    Incomplete { skip: usize },
    /// Retries or skips ran out; nothing in the window is worth keeping.
    NotFound,
}

/// Hunts `stream` for an info frame.
///
/// A byte that fails to match the first header byte is skipped, at most
/// `stream.len() - 5` times. A mismatch further into the header, or a frame
/// failing its checksum, costs one of `INFO_RESYNC_CYCLES` retries and the
/// scan carries on after the offending bytes. Running out of bytes before
/// the retries do keeps any partial header for the next scan.
pub fn scan_info_frame(stream: &[u8]) -> Scan {
    let skip_limit = stream.len().saturating_sub(INFO_HEADER.len());
    let mut cursor = 0;
    let mut skipped = 0;
    let mut failures = 0;

    'resync: while failures < INFO_RESYNC_CYCLES {
        let mut matched = 0;
        while matched < INFO_HEADER.len() {
            let Some(&byte) = stream.get(cursor) else {
                return Scan::Incomplete {
                    skip: cursor - matched,
                };
            };
            cursor += 1;

            if byte == INFO_HEADER[matched] {
                matched += 1;
            } else if matched > 0 {
                debug!(
                    "Broken header at offset {}: {:02X} instead of {:02X}",
                    cursor - 1,
                    byte,
                    INFO_HEADER[matched]
                );
                failures += 1;
                continue 'resync;
            } else {
                skipped += 1;
                if skipped >= skip_limit {
                    debug!("No header start within {} bytes", skip_limit);
                    return Scan::NotFound;
                }
            }
        }

        let start = cursor - INFO_HEADER.len();
        let end = start + INFO_FRAME_LEN;
        if end > stream.len() {
            return Scan::Incomplete { skip: start };
        }

        let mut frame = [0u8; INFO_FRAME_LEN];
        frame.copy_from_slice(&stream[start..end]);
        cursor = end;

        if is_valid(&frame) {
            return Scan::Found {
                frame,
                consumed: end,
            };
        }

        debug!(
            "Bad checksum: Calculated {:02X}, Received {:02X}. Frame: {:02X?}",
            checksum(&frame[..INFO_FRAME_LEN - 1]),
            frame[INFO_FRAME_LEN - 1],
            frame
        );
        failures += 1;
    }

    Scan::NotFound
}

#[cfg(test)]
pub(crate) fn info_frame(payload: u8) -> [u8; INFO_FRAME_LEN] {
    let mut frame = [payload; INFO_FRAME_LEN];
    frame[..INFO_HEADER.len()].copy_from_slice(&INFO_HEADER);
    frame[INFO_FRAME_LEN - 1] = checksum(&frame[..INFO_FRAME_LEN - 1]);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn appended_checksum_validates(bytes in proptest::collection::vec(any::<u8>(), 1..64)) {
            let mut framed = bytes.clone();
            framed.push(checksum(&bytes));
            prop_assert!(is_valid(&framed));
        }
    }

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(&[0xAC, 0x00, 0x00]), 0x54);
        assert_eq!(checksum(&[0xD0, 0x1B, 0x00]), 0x15);
        assert_eq!(checksum(&[0xD2, 0x4C, 0x00]), 0xE2);
        assert_eq!(checksum(&[]), 0x00);
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid(&[0xAC, 0x00, 0x00, 0x54]));
        assert!(!is_valid(&[0xAC, 0x00, 0x00, 0x55]));
        assert!(!is_valid(&[]));
    }

    #[test]
    fn test_command() {
        assert_eq!(command(0xAC, 0x00, 0x00), [0xAC, 0x00, 0x00, 0x54]);
        assert_eq!(command(0xAD, 0x00, 0x00), [0xAD, 0x00, 0x00, 0x53]);
        assert_eq!(command(0xA0, 0x00, 0x00), [0xA0, 0x00, 0x00, 0x60]);
        assert_eq!(command(0xAF, 0x00, 0x00), [0xAF, 0x00, 0x00, 0x51]);
        assert_eq!(command(0xD0, 0x1C, 0x00), [0xD0, 0x1C, 0x00, 0x14]);
        assert_eq!(command(0xE0, 0x08, 0x06), [0xE0, 0x08, 0x06, 0x12]);
    }

    #[test]
    fn test_bcd() {
        assert_eq!(bcd_to_decimal(0x00), 0);
        assert_eq!(bcd_to_decimal(0x09), 9);
        assert_eq!(bcd_to_decimal(0x22), 22);
        assert_eq!(bcd_to_decimal(0x99), 99);
    }

    #[test]
    fn test_scan_aligned() {
        let frame = info_frame(0x10);
        assert_eq!(
            scan_info_frame(&frame),
            Scan::Found {
                frame,
                consumed: INFO_FRAME_LEN
            }
        );
    }

    #[test]
    fn test_scan_skips_garbage() {
        let frame = info_frame(0x20);
        let mut stream = vec![0x00, 0x13, 0xFF];
        stream.extend_from_slice(&frame);
        stream.extend_from_slice(&[0x01, 0x02]);

        assert_eq!(
            scan_info_frame(&stream),
            Scan::Found {
                frame,
                consumed: 3 + INFO_FRAME_LEN
            }
        );
    }

    #[test]
    fn test_scan_broken_header_then_valid_frame() {
        let frame = info_frame(0x30);
        let mut stream = vec![0xAA, 0x19, 0x00];
        stream.extend_from_slice(&frame);

        assert_eq!(
            scan_info_frame(&stream),
            Scan::Found {
                frame,
                consumed: stream.len()
            }
        );
    }

    #[test]
    fn test_scan_two_bad_frames() {
        let mut bad = info_frame(0x40);
        bad[10] ^= 0xFF;
        let mut stream = bad.to_vec();
        stream.extend_from_slice(&bad);
        stream.extend_from_slice(&info_frame(0x41));

        assert_eq!(scan_info_frame(&stream), Scan::NotFound);
    }

    #[test]
    fn test_scan_incomplete_frame() {
        let frame = info_frame(0x50);
        let mut stream = vec![0x01; 8];
        stream.extend_from_slice(&frame[..20]);

        assert_eq!(scan_info_frame(&stream), Scan::Incomplete { skip: 8 });
    }

    #[test]
    fn test_scan_bad_frame_then_partial_header() {
        let mut bad = info_frame(0x60);
        bad[7] ^= 0x01;
        let mut stream = bad.to_vec();
        stream.extend_from_slice(&[0xAA, 0x19]);

        assert_eq!(scan_info_frame(&stream), Scan::Incomplete { skip: 25 });
    }

    #[test]
    fn test_scan_bad_frame_then_garbage() {
        let mut bad = info_frame(0x61);
        bad[7] ^= 0x01;
        let mut stream = bad.to_vec();
        stream.extend_from_slice(&[0x01, 0x02]);

        assert_eq!(scan_info_frame(&stream), Scan::Incomplete { skip: 27 });
    }

    #[test]
    fn test_scan_no_header() {
        assert_eq!(scan_info_frame(&[0x55; 30]), Scan::NotFound);
    }
}
