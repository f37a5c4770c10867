// src/drivers/channel.rs
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Write};

use log::debug;
use serialport::{ClearBuffer, SerialPort};

use crate::config::ChannelSettings;

/// Line oriented duplex link to the instrument.
///
/// Implementations block until the line is written or read. A closed link must
/// surface as an error on the next call, never as an empty line.
pub trait CommandChannel {
    /// Writes `line` followed by a single `\n`.
    fn send_line(&mut self, line: &str) -> io::Result<()>;
    /// Reads one line, without its terminator.
    fn read_line(&mut self) -> io::Result<String>;
}

impl<C: CommandChannel + ?Sized> CommandChannel for &mut C {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        (**self).send_line(line)
    }
    fn read_line(&mut self) -> io::Result<String> {
        (**self).read_line()
    }
}

impl<C: CommandChannel + ?Sized> CommandChannel for Box<C> {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        (**self).send_line(line)
    }
    fn read_line(&mut self) -> io::Result<String> {
        (**self).read_line()
    }
}

/// Channel over any buffered reader / writer pair.
pub struct StreamChannel<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> StreamChannel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> CommandChannel for StreamChannel<R, W> {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.writer.write_all(&bytes)?;
        self.writer.flush()
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut raw = Vec::new();
        if self.reader.read_until(b'\n', &mut raw)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "channel closed by peer",
            ));
        }
        // Garbled bytes are kept (as U+FFFD) so the parser can report the raw line.
        let line = String::from_utf8_lossy(&raw);
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }
}

pub type SerialChannel = StreamChannel<BufReader<Box<dyn SerialPort>>, Box<dyn SerialPort>>;

/// Opens `port_name` as a [`SerialChannel`].
///
/// Every read and write is bounded by `settings.read_timeout_ms`; an expired
/// read surfaces as `io::ErrorKind::TimedOut`.
pub fn open_serial(port_name: &str, settings: &ChannelSettings) -> serialport::Result<SerialChannel> {
    let port = serialport::new(port_name, settings.baud_rate)
        .timeout(settings.read_timeout())
        .open()?;
    // Drop whatever the firmware printed before we attached.
    let _ = port.clear(ClearBuffer::All);
    let reader = BufReader::new(port.try_clone()?);
    debug!(
        "opened {} at {} baud (timeout {:?})",
        port_name,
        settings.baud_rate,
        settings.read_timeout()
    );
    Ok(StreamChannel::new(reader, port))
}

/// In-memory channel that records sent lines and replays canned responses.
/// Useful for tests and deterministic playback.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    responses: VecDeque<String>,
    sent: Vec<String>,
    fail_send_at: Option<usize>,
}

impl ScriptedChannel {
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            sent: Vec::new(),
            fail_send_at: None,
        }
    }

    /// Makes the `n`-th send (zero based) fail with a broken pipe.
    pub fn fail_send_at(mut self, n: usize) -> Self {
        self.fail_send_at = Some(n);
        self
    }

    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn pending_responses(&self) -> usize {
        self.responses.len()
    }
}

impl CommandChannel for ScriptedChannel {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        if self.fail_send_at == Some(self.sent.len()) {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "scripted send failure",
            ));
        }
        self.sent.push(line.to_owned());
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<String> {
        self.responses.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::TimedOut, "no scripted response left")
        })
    }
}
