//! Control API service: a local message bus exposing the border router
//! object. Methods are request/reply, properties are fetched on demand
//! with invalidation-style change notifications.
//!
//! The object identity follows the D-Bus naming of the interface
//! ([`OBJECT_PATH`] / [`INTERFACE`]); the transport is a Unix stream
//! socket carrying the messages of [`wire`].

pub mod api;
pub mod wire;

use std::io::{Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{Error, Result};

/// Object path of the border router object.
pub const OBJECT_PATH: &str = "/com/silabs/Wisun/BorderRouter";

/// Interface name; also the well-known service name requested on the bus.
pub const INTERFACE: &str = "com.silabs.Wisun.BorderRouter";

/// Picks the bus location: the user session when the environment says
/// so (or a runtime dir is available), the system location otherwise.
pub fn default_socket_path() -> PathBuf {
    let bus_type = std::env::var("DBUS_STARTER_BUS_TYPE").unwrap_or_default();
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").ok();
    let user = match bus_type.as_str() {
        "system" => false,
        "user" | "session" => true,
        _ => runtime_dir.is_some(),
    };
    match (user, runtime_dir) {
        (true, Some(dir)) => Path::new(&dir).join("wisunbrd.sock"),
        _ => PathBuf::from("/run/wisunbrd.sock"),
    }
}

struct Client {
    stream: UnixStream,
    rx: Vec<u8>,
    subscribed: bool,
    dead: bool,
}

/// The listening service and its connected clients.
pub struct ControlService {
    listener: UnixListener,
    clients: Vec<Client>,
    path: PathBuf,
}

impl ControlService {
    /// Binds the service socket, replacing a stale one.
    pub fn bind(path: &Path) -> Result<ControlService> {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
        let listener = UnixListener::bind(path)
            .map_err(|err| Error::Fatal(format!("bind {}: {}", path.display(), err)))?;
        listener
            .set_nonblocking(true)
            .map_err(|err| Error::Fatal(format!("set_nonblocking: {}", err)))?;
        info!("registered control API on {}", path.display());
        Ok(ControlService {
            listener,
            clients: Vec::new(),
            path: path.to_path_buf(),
        })
    }

    pub fn listener_fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }

    pub fn client_fds(&self) -> Vec<RawFd> {
        self.clients
            .iter()
            .map(|client| client.stream.as_raw_fd())
            .collect()
    }

    /// Accepts pending connections.
    pub fn accept(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if stream.set_nonblocking(true).is_err() {
                        continue;
                    }
                    debug!("control: client connected");
                    self.clients.push(Client {
                        stream,
                        rx: Vec::new(),
                        subscribed: false,
                        dead: false,
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => return,
                Err(err) => {
                    warn!("control: accept: {}", err);
                    return;
                }
            }
        }
    }

    /// Reads every complete request from every client.
    ///
    /// Subscriptions are handled here; method calls & property reads are
    /// returned for dispatch.
    pub fn read_requests(&mut self) -> Vec<(usize, wire::Request)> {
        let mut requests = Vec::new();
        for (id, client) in self.clients.iter_mut().enumerate() {
            let mut chunk = [0u8; 2048];
            loop {
                match client.stream.read(&mut chunk) {
                    Ok(0) => {
                        client.dead = true;
                        break;
                    }
                    Ok(n) => client.rx.extend_from_slice(&chunk[..n]),
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(_) => {
                        client.dead = true;
                        break;
                    }
                }
            }
            while let Some(message) = wire::next_message(&mut client.rx) {
                match wire::Request::decode(&message) {
                    Ok(wire::Request::Subscribe) => client.subscribed = true,
                    Ok(request) => requests.push((id, request)),
                    Err(err) => warn!("control: {}", err),
                }
            }
        }
        requests
    }

    /// Drops disconnected clients. Must only run once the requests
    /// returned by [`ControlService::read_requests`] have been answered:
    /// their client ids are positional.
    pub fn reap(&mut self) {
        self.clients.retain(|client| {
            if client.dead {
                debug!("control: client disconnected");
            }
            !client.dead
        });
    }

    /// Sends a reply to one client.
    pub fn send(&mut self, client_id: usize, message: &[u8]) {
        if let Some(client) = self.clients.get_mut(client_id) {
            if client.stream.write_all(&wire::frame_message(message)).is_err() {
                client.dead = true;
            }
        }
    }

    /// Notifies every subscriber that a property changed.
    pub fn emit_property_changed(&mut self, name: &str) {
        let message = wire::frame_message(&wire::encode_property_changed(name));
        for client in &mut self.clients {
            if !client.subscribed {
                continue;
            }
            if client.stream.write_all(&message).is_err() {
                client.dead = true;
            }
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ControlService {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
