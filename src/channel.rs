use embedded_io::ReadReady;
use embedded_io_async::{Error as _, ErrorKind, ErrorType, Read, Write};

/// A serial port emulated in software on two GPIO pins.
///
/// The pin numbers only identify the wiring; the `port` implementation owns the pins.
#[derive(Debug)]
pub struct SoftwareSerial<P> {
    pub port: P,
    pub rx_pin: u8,
    pub tx_pin: u8,
}

/// The serial channel the sensor is wired to.
///
/// Exactly one kind is in use for the lifetime of the driver. Both variants
/// expose the same byte-stream capability, errors are reduced to their
/// `ErrorKind`.
#[derive(Debug)]
pub enum Channel<H, S = H> {
    /// A hardware UART.
    Hardware(H),
    /// A software-emulated UART.
    Software(SoftwareSerial<S>),
}

impl<H, S> Channel<H, S> {
    pub fn hardware(port: H) -> Self {
        Channel::Hardware(port)
    }

    pub fn software(port: S, rx_pin: u8, tx_pin: u8) -> Self {
        Channel::Software(SoftwareSerial {
            port,
            rx_pin,
            tx_pin,
        })
    }

    /// RX and TX pin numbers of a software channel.
    pub fn pins(&self) -> Option<(u8, u8)> {
        match self {
            Channel::Hardware(_) => None,
            Channel::Software(soft) => Some((soft.rx_pin, soft.tx_pin)),
        }
    }
}

impl<H: ErrorType, S: ErrorType> ErrorType for Channel<H, S> {
    type Error = ErrorKind;
}

impl<H: Read, S: Read> Read for Channel<H, S> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self {
            Channel::Hardware(port) => port.read(buf).await.map_err(|e| e.kind()),
            Channel::Software(soft) => soft.port.read(buf).await.map_err(|e| e.kind()),
        }
    }
}

impl<H: Write, S: Write> Write for Channel<H, S> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        match self {
            Channel::Hardware(port) => port.write(buf).await.map_err(|e| e.kind()),
            Channel::Software(soft) => soft.port.write(buf).await.map_err(|e| e.kind()),
        }
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        match self {
            Channel::Hardware(port) => port.flush().await.map_err(|e| e.kind()),
            Channel::Software(soft) => soft.port.flush().await.map_err(|e| e.kind()),
        }
    }
}

impl<H: ReadReady, S: ReadReady> ReadReady for Channel<H, S> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        match self {
            Channel::Hardware(port) => port.read_ready().map_err(|e| e.kind()),
            Channel::Software(soft) => soft.port.read_ready().map_err(|e| e.kind()),
        }
    }
}
