use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A reply byte did not arrive within the per-byte budget.
    Timeout,
    /// The last byte of a reply is not the checksum of the bytes before it.
    ChecksumMismatch,
    /// The reply does not echo the opcode that was sent.
    OpcodeMismatch,
    /// Not enough bytes are buffered to hold an info frame yet.
    BufferUnderrun,
    /// The header scan ran out of retries without finding a valid info frame.
    NoValidFrame,
    /// A valid reply carried a value the protocol does not define.
    UnexpectedReply,
    /// A parameter is outside the range the sensor accepts.
    InvalidArg,
    WriteFailure,
    ReadFailure,
    PinFailure,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Timeout => "timed out waiting for reply",
            Error::ChecksumMismatch => "reply checksum mismatch",
            Error::OpcodeMismatch => "reply opcode mismatch",
            Error::BufferUnderrun => "not enough buffered bytes for an info frame",
            Error::NoValidFrame => "no valid info frame found",
            Error::UnexpectedReply => "unexpected reply value",
            Error::InvalidArg => "argument out of range",
            Error::WriteFailure => "serial write failed",
            Error::ReadFailure => "serial read failed",
            Error::PinFailure => "status pin read failed",
        };
        f.write_str(msg)
    }
}
