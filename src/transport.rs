//! Transport abstraction for the session.
//!
//! A [`Transport`] opens a connection; the resulting [`Link`] is a blocking
//! byte stream that can be split into a reader (owned by the receive thread)
//! and a writer (used by `send`), and shut down from either side.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;

/// A connected, blocking byte stream.
pub trait Link: Read + Write + Send + Sized + 'static {
    /// Another handle to the same underlying stream.
    fn try_clone_link(&self) -> std::io::Result<Self>;

    /// True once the stream can be read from and written to.
    fn is_ready(&self) -> bool;

    /// Close both directions; any blocked read returns.
    fn shutdown_link(&self) -> std::io::Result<()>;
}

/// Something that can open a [`Link`].
pub trait Transport: Send {
    type Link: Link;

    fn connect(&self) -> std::io::Result<Self::Link>;

    /// Human-readable peer description for logs.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// TCP
// ---------------------------------------------------------------------------

impl Link for TcpStream {
    fn try_clone_link(&self) -> std::io::Result<Self> {
        self.try_clone()
    }

    fn is_ready(&self) -> bool {
        self.peer_addr().is_ok()
    }

    fn shutdown_link(&self) -> std::io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

/// Plain TCP to `host:port`.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: String,
    port: u16,
    connect_timeout: Option<Duration>,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: None,
        }
    }

    /// Bound each connect attempt instead of waiting on the OS default.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Transport for TcpTransport {
    type Link = TcpStream;

    fn connect(&self) -> std::io::Result<TcpStream> {
        let stream = match self.connect_timeout {
            None => TcpStream::connect((self.host.as_str(), self.port))?,
            Some(timeout) => {
                let mut last_err = None;
                let mut connected = None;
                for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(s) => {
                            connected = Some(s);
                            break;
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
                match connected {
                    Some(s) => s,
                    None => {
                        return Err(last_err.unwrap_or_else(|| {
                            std::io::Error::new(
                                std::io::ErrorKind::NotFound,
                                "host resolved to no addresses",
                            )
                        }))
                    }
                }
            }
        };

        // Small frames; don't let Nagle hold them back.
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {}", e);
        }
        Ok(stream)
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
