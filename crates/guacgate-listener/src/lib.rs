//! Listening socket selection
//!
//! In production the gateway runs inside an isolated network namespace and
//! the launcher passes it an already bound, already listening socket as a
//! file descriptor. For standalone testing a sentinel value switches to
//! binding a TCP port directly.
//!
//! Both paths run once at startup; any failure is a configuration error
//! and is never retried.

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Descriptor value that selects port mode
pub const INSECURE_TESTING_PORT: &str = "use-insecure-testing-port";

/// Port used in port mode when none (or an unusable one) is configured
pub const DEFAULT_PORT: u16 = 8080;

/// Listener setup errors
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Invalid file descriptor value: {0:?}")]
    InvalidDescriptor(String),

    #[error("File descriptor {fd} is not a usable listening socket: {reason}")]
    NotASocket { fd: i32, reason: String },

    #[error("Failed to bind to {address}:{port}: {reason}\n\nTroubleshooting:\n  • Check if another process is using this port: lsof -i :{port}\n  • Try using a different address or port")]
    Bind {
        address: String,
        port: u16,
        reason: String,
    },

    #[error("Inherited listening sockets are only supported on Unix")]
    Unsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the gateway obtains its listening socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenMode {
    /// Bind a TCP port ourselves
    Port { host: String, port: u16 },
    /// Adopt a socket opened by the isolation launcher
    InheritedFd(i32),
}

impl ListenMode {
    /// Choose the mode from the launcher-provided values
    ///
    /// `listening_fd` is either [`INSECURE_TESTING_PORT`] or a non-negative
    /// descriptor number. `listening_port` only matters in port mode; an
    /// unparsable or zero value falls back to [`DEFAULT_PORT`].
    pub fn select(
        listening_fd: &str,
        listening_port: Option<&str>,
        host: &str,
    ) -> Result<Self, ListenerError> {
        let listening_fd = listening_fd.trim();

        if listening_fd == INSECURE_TESTING_PORT {
            return Ok(ListenMode::Port {
                host: host.to_string(),
                port: parse_port(listening_port),
            });
        }

        match listening_fd.parse::<i32>() {
            Ok(fd) if fd >= 0 => Ok(ListenMode::InheritedFd(fd)),
            _ => Err(ListenerError::InvalidDescriptor(listening_fd.to_string())),
        }
    }

    /// Bring the listening socket up
    pub async fn bind(&self) -> Result<TcpListener, ListenerError> {
        match self {
            ListenMode::Port { host, port } => {
                let listener = TcpListener::bind((host.as_str(), *port))
                    .await
                    .map_err(|e| ListenerError::Bind {
                        address: host.clone(),
                        port: *port,
                        reason: e.to_string(),
                    })?;
                warn!(
                    "Running in insecure testing mode on {}",
                    listener.local_addr()?
                );
                Ok(listener)
            }
            ListenMode::InheritedFd(fd) => {
                let listener = adopt_listener(*fd)?;
                info!(
                    "Running on the passed-in socket (fd {}, {})",
                    fd,
                    listener.local_addr()?
                );
                Ok(listener)
            }
        }
    }
}

fn parse_port(value: Option<&str>) -> u16 {
    match value.map(str::trim) {
        None | Some("") => DEFAULT_PORT,
        Some(raw) => match raw.parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => {
                warn!("Ignoring unusable listening port {:?}, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }
        },
    }
}

#[cfg(unix)]
fn adopt_listener(fd: i32) -> Result<TcpListener, ListenerError> {
    use socket2::Socket;
    use std::os::unix::io::{FromRawFd, IntoRawFd};

    // SAFETY: the launcher transfers ownership of this descriptor to us and
    // nothing else in the process refers to it.
    let socket = unsafe { Socket::from_raw_fd(fd) };

    // On every failure the descriptor is handed back open to its owner
    if let Err(reason) = check_listening_socket(&socket) {
        let _ = socket.into_raw_fd();
        return Err(ListenerError::NotASocket { fd, reason });
    }
    if let Err(e) = socket.set_nonblocking(true) {
        let _ = socket.into_raw_fd();
        return Err(ListenerError::Io(e));
    }

    let listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(listener)?)
}

/// Accept only a TCP stream socket that is already listening
#[cfg(unix)]
fn check_listening_socket(socket: &socket2::Socket) -> Result<(), String> {
    let socket_type = socket.r#type().map_err(|e| e.to_string())?;
    if socket_type != socket2::Type::STREAM {
        return Err(format!("expected a stream socket, got {:?}", socket_type));
    }

    let addr = socket.local_addr().map_err(|e| e.to_string())?;
    if addr.as_socket().is_none() {
        return Err("not an IP socket".to_string());
    }

    ensure_listening(socket)
}

#[cfg(target_os = "linux")]
fn ensure_listening(socket: &socket2::Socket) -> Result<(), String> {
    match socket.is_listener() {
        Ok(true) => Ok(()),
        Ok(false) => Err("socket is bound but not listening".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

// SO_ACCEPTCONN is not portable; elsewhere a non-listening socket fails on first accept
#[cfg(all(unix, not(target_os = "linux")))]
fn ensure_listening(_socket: &socket2::Socket) -> Result<(), String> {
    Ok(())
}

#[cfg(not(unix))]
fn adopt_listener(_fd: i32) -> Result<TcpListener, ListenerError> {
    Err(ListenerError::Unsupported)
}
