//! Framed byte transport between the host and the RCP.
//!
//! Each frame on the link is `[len:le16 | hcs:le16 | payload | fcs:le16]`
//! where `hcs` protects the length field and `fcs` the payload, both
//! CRC-16/KERMIT. A frame is handed to the kernel in one write so a
//! command is never interleaved with another.

use std::io::{Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::Path;

use log::{debug, warn};

use crate::error::{Error, Result};

const CRC_KERMIT: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_KERMIT);

const HDR_LEN: usize = 4;
const FCS_LEN: usize = 2;

/// Maximum payload accepted on the link; larger lengths indicate a
/// desynchronized peer.
pub const MAX_FRAME_LEN: usize = 4096;

/// Byte pipe the bus runs over.
pub trait BusIo: Read + Write + AsRawFd + Send {}

impl<T: Read + Write + AsRawFd + Send> BusIo for T {}

/// The framed transport. Owns the I/O file descriptor; upper layers
/// borrow it through [`Bus::as_raw_fd`] for the poll set.
pub struct Bus {
    io: Box<dyn BusIo>,
    rx: Vec<u8>,
}

impl Bus {
    pub fn new(io: Box<dyn BusIo>) -> Bus {
        Bus {
            io,
            rx: Vec::new(),
        }
    }

    /// Opens the bus over a local socket (an RCP simulator or an IPC
    /// bridge).
    pub fn open_socket(path: &Path) -> Result<Bus> {
        let stream = UnixStream::connect(path)
            .map_err(|err| Error::Fatal(format!("connect {}: {}", path.display(), err)))?;
        stream
            .set_nonblocking(true)
            .map_err(|err| Error::Fatal(format!("set_nonblocking: {}", err)))?;
        Ok(Bus::new(Box::new(stream)))
    }

    /// Opens the bus over a serial device in raw mode.
    pub fn open_uart(device: &Path, baudrate: u32) -> Result<Bus> {
        use nix::sys::termios::{self, BaudRate, ControlFlags, SetArg};
        use std::os::unix::fs::OpenOptionsExt;

        let baud = match baudrate {
            9600 => BaudRate::B9600,
            38400 => BaudRate::B38400,
            115200 => BaudRate::B115200,
            230400 => BaudRate::B230400,
            460800 => BaudRate::B460800,
            921600 => BaudRate::B921600,
            1000000 => BaudRate::B1000000,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "unsupported baudrate {}",
                    other
                )))
            }
        };
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(nix::libc::O_NONBLOCK | nix::libc::O_NOCTTY)
            .open(device)
            .map_err(|err| Error::Fatal(format!("open {}: {}", device.display(), err)))?;
        let mut tios = termios::tcgetattr(&file)
            .map_err(|err| Error::Fatal(format!("tcgetattr: {}", err)))?;
        termios::cfmakeraw(&mut tios);
        tios.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
        termios::cfsetspeed(&mut tios, baud)
            .map_err(|err| Error::Fatal(format!("cfsetspeed: {}", err)))?;
        termios::tcsetattr(&file, SetArg::TCSANOW, &tios)
            .map_err(|err| Error::Fatal(format!("tcsetattr: {}", err)))?;
        Ok(Bus::new(Box::new(file)))
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.io.as_raw_fd()
    }

    /// Sends one command frame as a single logical write.
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        debug_assert!(payload.len() <= MAX_FRAME_LEN);
        let mut frame = Vec::with_capacity(HDR_LEN + payload.len() + FCS_LEN);
        let len = (payload.len() as u16).to_le_bytes();
        frame.extend_from_slice(&len);
        frame.extend_from_slice(&CRC_KERMIT.checksum(&len).to_le_bytes());
        frame.extend_from_slice(payload);
        frame.extend_from_slice(&CRC_KERMIT.checksum(payload).to_le_bytes());
        self.io
            .write_all(&frame)
            .map_err(|err| Error::Fatal(format!("bus write: {}", err)))?;
        Ok(())
    }

    /// Drains readable bytes from the fd into the receive buffer.
    ///
    /// Returns `false` when the peer closed the pipe.
    pub fn fill(&mut self) -> Result<bool> {
        let mut chunk = [0u8; 2048];
        loop {
            match self.io.read(&mut chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => self.rx.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => return Ok(true),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::Fatal(format!("bus read: {}", err))),
            }
        }
    }

    /// Extracts the next complete frame from the receive buffer.
    ///
    /// A corrupted header resynchronizes by skipping one byte; a payload
    /// CRC mismatch drops the frame.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            if self.rx.len() < HDR_LEN {
                return None;
            }
            let len = u16::from_le_bytes([self.rx[0], self.rx[1]]) as usize;
            let hcs = u16::from_le_bytes([self.rx[2], self.rx[3]]);
            if hcs != CRC_KERMIT.checksum(&self.rx[..2]) || len > MAX_FRAME_LEN {
                warn!("bus: bad frame header, resynchronizing");
                self.rx.remove(0);
                continue;
            }
            if self.rx.len() < HDR_LEN + len + FCS_LEN {
                return None;
            }
            let payload: Vec<u8> = self.rx[HDR_LEN..HDR_LEN + len].to_vec();
            let fcs = u16::from_le_bytes([
                self.rx[HDR_LEN + len],
                self.rx[HDR_LEN + len + 1],
            ]);
            self.rx.drain(..HDR_LEN + len + FCS_LEN);
            if fcs != CRC_KERMIT.checksum(&payload) {
                debug!("bus: drop frame with bad FCS");
                continue;
            }
            return Some(payload);
        }
    }
}
