#![cfg_attr(not(test), no_std)]

use embedded_hal::digital::InputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_io::ReadReady;
use embedded_io_async::{Read, Write};
use heapless::Vec;
use log::{debug, warn};

mod constants;
pub use constants::*;

mod error;
pub use error::*;

mod config;
pub use config::*;

mod channel;
pub use channel::*;

pub mod frame;
use frame::Scan;

#[cfg(test)]
mod mock;

/// A 25-byte info package, as pushed by the sensor or returned by `request_info_package`.
///
/// Starts with the fixed header `AA 19 31 01 AC` and ends with its checksum.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InfoPackage([u8; INFO_FRAME_LEN]);

impl InfoPackage {
    pub fn as_bytes(&self) -> &[u8; INFO_FRAME_LEN] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; INFO_FRAME_LEN] {
        self.0
    }
}

/// Firmware version, 16-bit packed BCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion(pub u16);

impl FirmwareVersion {
    pub fn major(&self) -> u8 {
        frame::bcd_to_decimal((self.0 >> 8) as u8)
    }

    pub fn minor(&self) -> u8 {
        frame::bcd_to_decimal(self.0 as u8)
    }
}

/// Production date, decoded from BCD. `year` is the two-digit year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionDate {
    pub year: u8,
    pub month: u8,
    pub day: u8,
}

/// Represents a BM22S4221-1 smoke sensor.
///
/// This struct provides methods to configure the sensor, query its settings
/// and capture the info frames it pushes on its own.
///
/// # Type Parameters
///
/// * `Serial`: The serial interface wired to the sensor, usually a [`Channel`].
///   It must implement `embedded_io_async::Read`, `embedded_io_async::Write`
///   and `embedded_io::ReadReady`.
/// * `Status`: The input pin connected to the sensor's STATUS output.
/// * `Delay`: An async delay provider, used for protocol timings and reply timeouts.
pub struct Bm22s4221<Serial, Status, Delay> {
    serial: Serial,
    status: Status,
    delay: Delay,
    config: Config,
    info: InfoPackage,
    pending: Vec<u8, RX_WINDOW>,
}

impl<S, P, D> Bm22s4221<S, P, D>
where
    S: Read + Write + ReadReady,
    P: InputPin,
    D: DelayNs,
{
    /// Creates a new `Bm22s4221` sensor instance.
    ///
    /// # Arguments
    ///
    /// * `serial`: The serial interface for communication with the sensor, 9600 baud 8N1.
    /// * `status`: The STATUS input pin.
    /// * `delay`: The delay provider.
    /// * `config`: The driver configuration.
    pub fn new(serial: S, status: P, delay: D, config: Config) -> Self {
        Self {
            serial,
            status,
            delay,
            config,
            info: InfoPackage::default(),
            pending: Vec::new(),
        }
    }

    /// Releases the serial interface, status pin and delay provider.
    pub fn release(self) -> (S, P, D) {
        (self.serial, self.status, self.delay)
    }

    /// Initializes the sensor according to the provided configuration.
    ///
    /// This involves:
    /// - Discarding any stale input on the serial interface.
    /// - Setting the output mode, if configured.
    /// - Setting the alarm level of the STATUS pin, if configured.
    pub async fn init(&mut self) -> Result<(), Error> {
        self.clear_input().await?;

        if let Some(mode) = self.config.output_mode {
            self.set_output_mode(mode).await.map_err(|e| {
                log::error!("Failed to set output mode to {:?} during init: {:?}", mode, e);
                e
            })?;
        }

        if let Some(level) = self.config.alarm_level {
            self.set_alarm_level(level).await.map_err(|e| {
                log::error!(
                    "Failed to set alarm level to {:?} during init: {:?}",
                    level,
                    e
                );
                e
            })?;
        }

        debug!("BM22S4221 init sequence complete.");
        Ok(())
    }

    /// Samples the STATUS pin, returning `true` when it is high.
    pub fn read_status_pin(&mut self) -> Result<bool, Error> {
        self.status.is_high().map_err(|_| Error::PinFailure)
    }

    /// Returns whether the STATUS pin currently signals an alarm, given the
    /// level the sensor drives while alarming.
    pub fn is_alarm_active(&mut self, level: AlarmLevel) -> Result<bool, Error> {
        let high = self.read_status_pin()?;
        Ok(match level {
            AlarmLevel::High => high,
            AlarmLevel::Low => !high,
        })
    }

    /// Requests the current info package.
    ///
    /// The retained info frame returned by `last_info_frame` is not updated.
    ///
    /// # Returns
    ///
    /// * `Ok(InfoPackage)` with the 25 bytes exactly as received.
    /// * `Err(Error)` if the reply timed out, failed its checksum or echoed another opcode.
    pub async fn request_info_package(&mut self) -> Result<InfoPackage, Error> {
        debug!("Requesting info package (CMD 0xAC)");
        let reply = self
            .transact::<INFO_FRAME_LEN>(frame::command(CMD_INFO, 0x00, 0x00), INFO_SETTLE_MS)
            .await?;
        Ok(InfoPackage(reply))
    }

    /// Retrieves the firmware version of the sensor.
    ///
    /// # Returns
    ///
    /// * `Ok(FirmwareVersion)` holding the raw BCD version.
    /// * `Err(Error)` if the command failed. A version of zero is a valid reply.
    pub async fn firmware_version(&mut self) -> Result<FirmwareVersion, Error> {
        let reply = self.query_version().await?;
        let version = FirmwareVersion(u16::from_be_bytes([reply[6], reply[7]]));
        debug!("Firmware version: {:04X}", version.0);
        Ok(version)
    }

    /// Retrieves the production date of the sensor.
    pub async fn production_date(&mut self) -> Result<ProductionDate, Error> {
        let reply = self.query_version().await?;
        let date = ProductionDate {
            year: frame::bcd_to_decimal(reply[8]),
            month: frame::bcd_to_decimal(reply[9]),
            day: frame::bcd_to_decimal(reply[10]),
        };
        debug!("Production date: 20{}-{}-{}", date.year, date.month, date.day);
        Ok(date)
    }

    /// Queries whether the sensor pushes info frames on its own.
    ///
    /// # Returns
    ///
    /// * `Ok(OutputMode)` containing the current mode.
    /// * `Err(Error::UnexpectedReply)` if the sensor reports an undefined flag.
    /// * `Err(Error)` if the command failed.
    pub async fn output_mode(&mut self) -> Result<OutputMode, Error> {
        debug!("Querying output mode (CMD 0xD0, 0x1B)");
        let flag = self.read_register(CMD_READ_CONFIG, REG_AUTO_TX).await?;
        OutputMode::from_flag(flag).ok_or_else(|| {
            warn!("output_mode: Unexpected flag {:02X}", flag);
            Error::UnexpectedReply
        })
    }

    /// Queries the level the STATUS pin is driven to while alarming.
    pub async fn alarm_level(&mut self) -> Result<AlarmLevel, Error> {
        debug!("Querying alarm level (CMD 0xD0, 0x1C)");
        let flag = self.read_register(CMD_READ_CONFIG, REG_STATUS_LEVEL).await?;
        AlarmLevel::from_flag(flag).ok_or_else(|| {
            warn!("alarm_level: Unexpected flag {:02X}", flag);
            Error::UnexpectedReply
        })
    }

    /// Reads the A/D value of the internal 1.25 V band-gap reference.
    ///
    /// The value is `1.25 / VDD * 256`, which lets the host estimate the supply voltage.
    pub async fn vbg_adc(&mut self) -> Result<u8, Error> {
        debug!("Querying VBG A/D value (CMD 0xD2, 0x4C)");
        self.read_register(CMD_READ_ADC, ADC_VBG).await
    }

    /// Restores the factory settings.
    ///
    /// Alarm threshold 15, alarm detect delay 3s, alarm output time 3s,
    /// preheat time 30s, passive output, alarm level high.
    pub async fn restore_default(&mut self) -> Result<(), Error> {
        debug!("Restoring factory settings (CMD 0xA0)");
        self.transact::<ACK_LEN>(
            frame::command(CMD_RESTORE_DEFAULT, 0x00, 0x00),
            WRITE_SETTLE_MS,
        )
        .await?;
        Ok(())
    }

    /// Resets the sensor's microcontroller and waits for it to come back.
    pub async fn reset(&mut self) -> Result<(), Error> {
        debug!("Resetting sensor (CMD 0xAF)");
        self.transact::<ACK_LEN>(frame::command(CMD_RESET, 0x00, 0x00), QUERY_SETTLE_MS)
            .await?;
        self.delay.delay_ms(RESET_TIME_MS).await;
        Ok(())
    }

    /// Enables or disables the autonomous info frame output.
    pub async fn set_output_mode(&mut self, mode: OutputMode) -> Result<(), Error> {
        debug!("Setting output mode to: {:?}", mode);
        self.write_register(REG_AUTO_TX, mode.flag()).await
    }

    /// Sets the level the STATUS pin is driven to while alarming.
    pub async fn set_alarm_level(&mut self, level: AlarmLevel) -> Result<(), Error> {
        debug!("Setting alarm level to: {:?}", level);
        self.write_register(REG_STATUS_LEVEL, level.flag()).await
    }

    /// Sets the internal OPA gain, `128 + value * 8`.
    ///
    /// # Arguments
    ///
    /// * `value`: The gain step, between 0 and 31 (inclusive).
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the sensor acknowledged the change.
    /// * `Err(Error::InvalidArg)` if `value` is greater than 31.
    pub async fn set_opa_gain(&mut self, value: u8) -> Result<(), Error> {
        if value > OPA_GAIN_MAX {
            log::error!("OPA gain {} out of range (0-{})", value, OPA_GAIN_MAX);
            return Err(Error::InvalidArg);
        }
        debug!("Setting OPA gain to: {}", value);
        self.write_register(REG_OPA_GAIN, value).await
    }

    /// Sets how far the reading has to move before an alarm is raised.
    ///
    /// # Arguments
    ///
    /// * `threshold`: The deviation, between 15 and 120 (inclusive).
    pub async fn set_alarm_threshold(&mut self, threshold: u8) -> Result<(), Error> {
        if !(ALARM_THRESHOLD_MIN..=ALARM_THRESHOLD_MAX).contains(&threshold) {
            log::error!(
                "Alarm threshold {} out of range ({}-{})",
                threshold,
                ALARM_THRESHOLD_MIN,
                ALARM_THRESHOLD_MAX
            );
            return Err(Error::InvalidArg);
        }
        debug!("Setting alarm threshold to: {}", threshold);
        self.write_register(REG_ALARM_THRESHOLD, threshold).await
    }

    /// Sets how long a deviation must persist before it raises an alarm.
    ///
    /// # Arguments
    ///
    /// * `seconds`: The delay in seconds, at most 127. Sent in 0.5s units.
    pub async fn set_alarm_detect_delay(&mut self, seconds: u8) -> Result<(), Error> {
        debug!("Setting alarm detect delay to: {}s", seconds);
        let units = half_seconds(seconds)?;
        self.write_register(REG_ALARM_DETECT_DELAY, units).await
    }

    /// Sets how long the STATUS pin stays in the alarm level, at most 127 seconds.
    pub async fn set_alarm_output_time(&mut self, seconds: u8) -> Result<(), Error> {
        debug!("Setting alarm output time to: {}s", seconds);
        let units = half_seconds(seconds)?;
        self.write_register(REG_ALARM_OUTPUT_TIME, units).await
    }

    /// Sets the sensor preheat time, at most 127 seconds.
    pub async fn set_preheat_time(&mut self, seconds: u8) -> Result<(), Error> {
        debug!("Setting preheat time to: {}s", seconds);
        let units = half_seconds(seconds)?;
        self.write_register(REG_PREHEAT_TIME, units).await
    }

    /// Captures an info frame pushed by the sensor in auto output mode.
    ///
    /// Pending input is staged and scanned for the info header, skipping
    /// misaligned bytes. On success the frame is retained for
    /// `last_info_frame` and only the skipped bytes plus the frame are consumed.
    ///
    /// # Returns
    ///
    /// * `Ok(InfoPackage)` with the captured frame.
    /// * `Err(Error::BufferUnderrun)` if a whole frame has not arrived yet. Nothing is lost.
    /// * `Err(Error::NoValidFrame)` after two corrupt frames or broken headers. All
    ///   buffered input is discarded and the retained frame is left unchanged.
    pub async fn poll_info_frame(&mut self) -> Result<InfoPackage, Error> {
        self.fill_pending().await?;
        if self.pending.len() < INFO_FRAME_LEN {
            return Err(Error::BufferUnderrun);
        }

        match frame::scan_info_frame(&self.pending) {
            Scan::Found { frame, consumed } => {
                self.discard_pending(consumed);
                self.info = InfoPackage(frame);
                debug!("Captured info frame: {:02X?}", frame);
                Ok(self.info)
            }
            Scan::Incomplete { skip } => {
                self.discard_pending(skip);
                Err(Error::BufferUnderrun)
            }
            Scan::NotFound => {
                warn!(
                    "No valid info frame in {:02X?}, discarding input",
                    self.pending.as_slice()
                );
                self.clear_input().await?;
                Err(Error::NoValidFrame)
            }
        }
    }

    /// Returns the last info frame captured by `poll_info_frame`, all zero until the first capture.
    pub fn last_info_frame(&self) -> InfoPackage {
        self.info
    }

    // The firmware version and production date share one 12-byte reply.
    async fn query_version(&mut self) -> Result<[u8; VERSION_LEN], Error> {
        debug!("Querying version (CMD 0xAD)");
        self.transact::<VERSION_LEN>(frame::command(CMD_VERSION, 0x00, 0x00), 0)
            .await
    }

    async fn read_register(&mut self, opcode: u8, register: u8) -> Result<u8, Error> {
        let reply = self
            .transact::<ACK_LEN>(frame::command(opcode, register, 0x00), QUERY_SETTLE_MS)
            .await?;
        Ok(reply[REPLY_VALUE_INDEX])
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error> {
        self.transact::<ACK_LEN>(
            frame::command(CMD_WRITE_CONFIG, register, value),
            WRITE_SETTLE_MS,
        )
        .await?;
        Ok(())
    }

    // Sends a command and returns its validated N-byte reply.
    async fn transact<const N: usize>(
        &mut self,
        command: [u8; COMMAND_LEN],
        settle_ms: u32,
    ) -> Result<[u8; N], Error> {
        self.write(&command).await?;
        if settle_ms > 0 {
            self.delay.delay_ms(settle_ms).await;
        }

        let reply = self.read_reply::<N>().await?;
        if !frame::is_valid(&reply) {
            warn!(
                "Bad checksum: Calculated {:02X}, Received {:02X}. Frame: {:02X?}",
                frame::checksum(&reply[..N - 1]),
                reply[N - 1],
                reply
            );
            return Err(Error::ChecksumMismatch);
        }
        if reply[REPLY_OPCODE_INDEX] != command[0] {
            warn!(
                "Reply echoes opcode {:02X}, expected {:02X}: {:02X?}",
                reply[REPLY_OPCODE_INDEX], command[0], reply
            );
            return Err(Error::OpcodeMismatch);
        }

        debug!("Successfully read and validated reply: {:02X?}", reply);
        Ok(reply)
    }

    // Discards stale input, writes a command frame and waits for the sensor to respond.
    async fn write(&mut self, command: &[u8; COMMAND_LEN]) -> Result<(), Error> {
        self.clear_input().await?;

        debug!("Executing command: {:02X?}", command);
        self.serial
            .write_all(command)
            .await
            .map_err(|_| Error::WriteFailure)?;
        self.serial.flush().await.map_err(|_| Error::WriteFailure)?;
        self.delay.delay_ms(self.config.response_delay_ms).await;
        Ok(())
    }

    // Reads N bytes, giving each one `byte_timeout_ms` to arrive. Nothing is returned on timeout.
    async fn read_reply<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut reply = [0u8; N];
        for (index, slot) in reply.iter_mut().enumerate() {
            let mut waited = 0;
            while !self.serial.read_ready().map_err(|_| Error::ReadFailure)? {
                if waited > self.config.byte_timeout_ms {
                    warn!("Timed out waiting for reply byte {} of {}", index + 1, N);
                    return Err(Error::Timeout);
                }
                self.delay.delay_ms(1).await;
                waited += 1;
            }

            let mut byte = [0u8; 1];
            self.serial.read_exact(&mut byte).await.map_err(|_| {
                debug!("Serial read error on reply byte {}", index + 1);
                Error::ReadFailure
            })?;
            *slot = byte[0];
        }
        Ok(reply)
    }

    // Moves whatever the serial interface has ready into the staging window.
    async fn fill_pending(&mut self) -> Result<(), Error> {
        while !self.pending.is_full()
            && self.serial.read_ready().map_err(|_| Error::ReadFailure)?
        {
            let mut byte = [0u8; 1];
            self.serial
                .read_exact(&mut byte)
                .await
                .map_err(|_| Error::ReadFailure)?;
            if self.pending.push(byte[0]).is_err() {
                break;
            }
        }
        Ok(())
    }

    fn discard_pending(&mut self, count: usize) {
        let len = self.pending.len();
        let count = count.min(len);
        self.pending.copy_within(count..len, 0);
        self.pending.truncate(len - count);
    }

    async fn clear_input(&mut self) -> Result<(), Error> {
        self.pending.clear();
        let mut scratch = [0u8; 16];
        while self.serial.read_ready().map_err(|_| Error::ReadFailure)? {
            let read = self
                .serial
                .read(&mut scratch)
                .await
                .map_err(|_| Error::ReadFailure)?;
            if read == 0 {
                break;
            }
            debug!("Discarding stale input: {:02X?}", &scratch[..read]);
        }
        Ok(())
    }
}

// Converts seconds into the protocol's 0.5s unit.
fn half_seconds(seconds: u8) -> Result<u8, Error> {
    if seconds > TIME_MAX_S {
        log::error!("Time {}s out of range (0-{})", seconds, TIME_MAX_S);
        return Err(Error::InvalidArg);
    }
    Ok(seconds * 2)
}
