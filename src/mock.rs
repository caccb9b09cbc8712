//! Test doubles for the serial port, the status pin and the delay provider.

use core::convert::Infallible;
use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal::digital::{ErrorKind as PinErrorKind, ErrorType as PinErrorType, InputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_io::ReadReady;
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};

/// A serial port whose peer answers each written frame with the next queued reply.
#[derive(Debug, Default)]
pub struct MockSerial {
    /// Bytes waiting to be read by the driver.
    pub rx: VecDeque<u8>,
    /// One reply per write, moved into `rx` when the write happens.
    pub replies: VecDeque<Vec<u8>>,
    /// Every byte the driver has written.
    pub written: Vec<u8>,
    pub fail_writes: bool,
    pub fail_reads: bool,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, bytes: &[u8]) -> Self {
        self.replies.push_back(bytes.to_vec());
        self
    }

    pub fn incoming(mut self, bytes: &[u8]) -> Self {
        self.rx.extend(bytes);
        self
    }
}

impl ErrorType for MockSerial {
    type Error = ErrorKind;
}

impl Read for MockSerial {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.fail_reads {
            return Err(ErrorKind::Other);
        }
        let mut count = 0;
        while count < buf.len() {
            match self.rx.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl Write for MockSerial {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(ErrorKind::Other);
        }
        self.written.extend_from_slice(buf);
        if let Some(reply) = self.replies.pop_front() {
            self.rx.extend(reply);
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}

/// A status pin stuck at one level.
#[derive(Debug)]
pub struct MockPin {
    pub high: bool,
}

impl PinErrorType for MockPin {
    type Error = Infallible;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// A status pin whose every read fails.
#[derive(Debug)]
pub struct FailingPin;

impl PinErrorType for FailingPin {
    type Error = PinErrorKind;
}

impl InputPin for FailingPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Err(PinErrorKind::Other)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Err(PinErrorKind::Other)
    }
}

/// Adds up requested delays instead of sleeping.
#[derive(Debug, Default)]
pub struct MockDelay {
    pub elapsed_ns: u64,
}

impl MockDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}
