// SCPI session - Newline-terminated queries over a USBTMC device or TCP socket
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SCPI_PORT: u16 = 5555;
pub const MODEL_TAG: &str = "DM3058";

const DEVICE_DIR: &str = "/dev";
const USBTMC_PREFIX: &str = "usbtmc";
const READ_CHUNK: usize = 512;
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("instrument I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unparsable response to {command}: {response:?}")]
    Parse { command: String, response: String },

    #[error("no DM3058 found on {searched}")]
    NotFound { searched: String },

    #[error("{resource} identifies as {identity:?}, expected a DM3058")]
    UnexpectedIdentity { resource: String, identity: String },
}

/// Byte stream to the instrument.
#[derive(Debug)]
pub enum Transport {
    /// Linux USBTMC character device, e.g. `/dev/usbtmc0`
    Usbtmc(File),
    /// Raw SCPI socket, `host[:port]`
    Tcp(TcpStream),
}

impl Transport {
    pub fn open(resource: &str, timeout: Duration) -> Result<Self, InstrumentError> {
        if resource.starts_with('/') {
            let file = OpenOptions::new().read(true).write(true).open(resource)?;
            return Ok(Transport::Usbtmc(file));
        }

        let address = if resource.contains(':') {
            resource.to_string()
        } else {
            format!("{}:{}", resource, DEFAULT_SCPI_PORT)
        };
        let socket = address.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("cannot resolve {}", address))
        })?;
        let stream = TcpStream::connect_timeout(&socket, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(Transport::Tcp(stream))
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Usbtmc(file) => file.read(buf),
            Transport::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Usbtmc(file) => file.write(buf),
            Transport::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Usbtmc(file) => file.flush(),
            Transport::Tcp(stream) => stream.flush(),
        }
    }
}

pub struct ScpiSession<T: Read + Write> {
    transport: T,
    resource: String,
}

impl<T: Read + Write> ScpiSession<T> {
    pub fn new(transport: T, resource: impl Into<String>) -> Self {
        Self {
            transport,
            resource: resource.into(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn write(&mut self, command: &str) -> Result<(), InstrumentError> {
        tracing::trace!(resource = %self.resource, command, "scpi write");
        self.transport.write_all(command.as_bytes())?;
        self.transport.write_all(b"\n")?;
        self.transport.flush()?;
        Ok(())
    }

    pub fn query(&mut self, command: &str) -> Result<String, InstrumentError> {
        self.write(command)?;
        let response = self.read_response()?;
        tracing::trace!(resource = %self.resource, command, response = %response, "scpi response");
        Ok(response)
    }

    /// Query whose answer is a single finite number, e.g. `MEAS:VOLT:DC?`.
    pub fn query_f64(&mut self, command: &str) -> Result<f64, InstrumentError> {
        let response = self.query(command)?;
        match response.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(InstrumentError::Parse {
                command: command.to_string(),
                response,
            }),
        }
    }

    pub fn identify(&mut self) -> Result<String, InstrumentError> {
        self.query("*IDN?")
    }

    fn read_response(&mut self) -> Result<String, InstrumentError> {
        let mut response = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self.transport.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            response.extend_from_slice(&chunk[..n]);
            if response.ends_with(b"\n") {
                break;
            }
            if response.len() > MAX_RESPONSE_BYTES {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("response longer than {} bytes", MAX_RESPONSE_BYTES),
                )
                .into());
            }
        }
        Ok(String::from_utf8_lossy(&response).trim().to_string())
    }
}

/// `/dev/usbtmc*` device nodes, in name order.
pub fn usbtmc_devices() -> io::Result<Vec<PathBuf>> {
    let mut devices: Vec<PathBuf> = fs::read_dir(DEVICE_DIR)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(USBTMC_PREFIX))
        .map(|entry| entry.path())
        .collect();
    devices.sort();
    Ok(devices)
}

pub fn check_identity(resource: &str, identity: String) -> Result<String, InstrumentError> {
    if identity.contains(MODEL_TAG) {
        Ok(identity)
    } else {
        Err(InstrumentError::UnexpectedIdentity {
            resource: resource.to_string(),
            identity,
        })
    }
}

/// One USBTMC device and what it answered to `*IDN?`.
#[derive(Debug)]
pub struct ResourceReport {
    pub resource: String,
    pub identity: Result<String, InstrumentError>,
}

impl ResourceReport {
    /// Asks whatever `transport` leads to for its identity.
    pub fn query<T: Read + Write>(resource: String, transport: Result<T, InstrumentError>) -> Self {
        let identity = transport.and_then(|transport| ScpiSession::new(transport, resource.as_str()).identify());
        Self { resource, identity }
    }
}

impl fmt::Display for ResourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identity {
            Ok(identity) => write!(f, "{} -> {}", self.resource, identity),
            Err(e) => write!(f, "{} -> error: {}", self.resource, e),
        }
    }
}

/// Identity of every USBTMC device, DM3058 or not.
pub fn list_resources(timeout: Duration) -> Result<Vec<ResourceReport>, InstrumentError> {
    let reports = usbtmc_devices()?
        .into_iter()
        .map(|device| {
            let resource = device.to_string_lossy().into_owned();
            let transport = Transport::open(&resource, timeout);
            ResourceReport::query(resource, transport)
        })
        .collect();
    Ok(reports)
}

/// Opens `resource`, or the first USBTMC device that answers as a DM3058.
///
/// Returns the session together with its `*IDN?` string.
pub fn connect(
    resource: Option<&str>,
    timeout: Duration,
) -> Result<(ScpiSession<Transport>, String), InstrumentError> {
    if let Some(resource) = resource {
        let mut session = ScpiSession::new(Transport::open(resource, timeout)?, resource);
        let identity = check_identity(resource, session.identify()?)?;
        return Ok((session, identity));
    }

    for device in usbtmc_devices()? {
        let resource = device.to_string_lossy().into_owned();
        let attempt = Transport::open(&resource, timeout).and_then(|transport| {
            let mut session = ScpiSession::new(transport, resource.as_str());
            let identity = session.identify()?;
            Ok((session, identity))
        });
        match attempt {
            Ok((session, identity)) if identity.contains(MODEL_TAG) => {
                tracing::info!(resource = %resource, identity = %identity, "found instrument");
                return Ok((session, identity));
            }
            Ok((_, identity)) => {
                tracing::debug!(resource = %resource, identity = %identity, "skipping instrument");
            }
            Err(e) => {
                tracing::debug!(resource = %resource, "identify failed: {}", e);
            }
        }
    }

    Err(InstrumentError::NotFound {
        searched: format!("{}/{}*", DEVICE_DIR, USBTMC_PREFIX),
    })
}
