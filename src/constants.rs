// BAUD_RATE is the fixed UART speed of the sensor (8N1).
pub const BAUD_RATE: u32 = 9600;

// Opcodes, the first byte of every command frame. Replies echo the opcode at REPLY_OPCODE_INDEX.
pub const CMD_INFO: u8 = 0xAC;
pub const CMD_VERSION: u8 = 0xAD;
pub const CMD_RESTORE_DEFAULT: u8 = 0xA0;
pub const CMD_RESET: u8 = 0xAF;
pub const CMD_READ_CONFIG: u8 = 0xD0;
pub const CMD_READ_ADC: u8 = 0xD2;
pub const CMD_WRITE_CONFIG: u8 = 0xE0;

// Sub-addresses used with CMD_READ_CONFIG / CMD_WRITE_CONFIG.
pub const REG_OPA_GAIN: u8 = 0x05;
pub const REG_ALARM_THRESHOLD: u8 = 0x07;
pub const REG_ALARM_DETECT_DELAY: u8 = 0x08;
pub const REG_ALARM_OUTPUT_TIME: u8 = 0x09;
pub const REG_PREHEAT_TIME: u8 = 0x0C;
pub const REG_AUTO_TX: u8 = 0x1B;
pub const REG_STATUS_LEVEL: u8 = 0x1C;

// Sub-address used with CMD_READ_ADC to read the internal band-gap reference.
pub const ADC_VBG: u8 = 0x4C;

// Flag values carried by the auto-output and status-level registers.
pub const FLAG_SET: u8 = 0x08;
pub const FLAG_CLEAR: u8 = 0x00;

// Frame sizes.
pub const COMMAND_LEN: usize = 4;
pub const ACK_LEN: usize = 8;
pub const VERSION_LEN: usize = 12;
pub const INFO_FRAME_LEN: usize = 25;

pub const REPLY_OPCODE_INDEX: usize = 4;
pub const REPLY_VALUE_INDEX: usize = 6;

// INFO_HEADER opens every info package, pushed or requested.
pub const INFO_HEADER: [u8; 5] = [0xAA, 0x19, 0x31, 0x01, 0xAC];

// Header scan gives up after this many corrupt frames or broken headers.
pub const INFO_RESYNC_CYCLES: usize = 2;

// RX_WINDOW bounds how many pending bytes are staged while hunting for an info frame.
pub const RX_WINDOW: usize = 64;

// Timing, in milliseconds.
pub const RESPONSE_DELAY_MS: u32 = 70;
pub const BYTE_TIMEOUT_MS: u32 = 10;
pub const INFO_SETTLE_MS: u32 = 50;
pub const QUERY_SETTLE_MS: u32 = 20;
pub const WRITE_SETTLE_MS: u32 = 100;
pub const RESET_TIME_MS: u32 = 60;

// Parameter ranges accepted by the sensor.
pub const OPA_GAIN_MAX: u8 = 31;
pub const ALARM_THRESHOLD_MIN: u8 = 15;
pub const ALARM_THRESHOLD_MAX: u8 = 120;
pub const TIME_MAX_S: u8 = 127;

// Factory settings restored by `restore_default`.
pub const DEFAULT_ALARM_THRESHOLD: u8 = 15;
pub const DEFAULT_ALARM_DETECT_DELAY_S: u8 = 3;
pub const DEFAULT_ALARM_OUTPUT_TIME_S: u8 = 3;
pub const DEFAULT_PREHEAT_TIME_S: u8 = 30;
