use super::service::AppService;
use crate::app::Core;
use may::coroutine::JoinHandle;
use may_minihttp::HttpService;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Poll interval used while waiting for the listener
const READY_POLL: Duration = Duration::from_millis(5);

/// Default time [`ServerHandle::wait_ready`] allows the listener to come up
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(250);

/// Any `may_minihttp` service, started on a coroutine listener
pub struct HttpServer<T>(pub T);

/// A listening server
///
/// Dropping the handle leaves the server running; call [`ServerHandle::stop`]
/// or [`ServerHandle::join`] to end it.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block until the listener accepts a TCP connection
    ///
    /// # Errors
    ///
    /// `TimedOut` after [`DEFAULT_READY_TIMEOUT`].
    pub fn wait_ready(&self) -> io::Result<()> {
        self.wait_ready_for(DEFAULT_READY_TIMEOUT)
    }

    /// [`ServerHandle::wait_ready`] with an explicit timeout
    ///
    /// # Errors
    ///
    /// `TimedOut` when no connect succeeds within `timeout`.
    pub fn wait_ready_for(&self, timeout: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if TcpStream::connect(self.addr).is_ok() {
                debug!(addr = %self.addr, "Listener ready");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("server on {} not ready after {timeout:?}", self.addr),
                ));
            }
            thread::sleep(READY_POLL);
        }
    }

    /// Cancel the listener coroutine and wait for it to exit
    pub fn stop(self) {
        info!(addr = %self.addr, "Stopping HTTP server");
        // SAFETY: the handle is owned here and the server coroutine is only
        // ever cancelled once, on shutdown.
        unsafe {
            self.handle.coroutine().cancel();
        }
        if self.handle.join().is_err() {
            warn!(addr = %self.addr, "Server coroutine panicked during shutdown");
        }
    }

    /// Run until the listener coroutine ends on its own
    ///
    /// # Errors
    ///
    /// The panic payload when the listener coroutine panicked.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Bind `addr` and start accepting connections
    ///
    /// Only the first address `addr` resolves to is used.
    ///
    /// # Errors
    ///
    /// Resolution and bind failures.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing"))?;
        let handle = may_minihttp::HttpServer(self.0).start(addr)?;
        info!(addr = %addr, "HTTP server listening");
        Ok(ServerHandle { addr, handle })
    }
}

/// Serve `core` on `addr` through an [`AppService`]
///
/// # Errors
///
/// Resolution and bind failures.
pub fn serve<A: ToSocketAddrs>(core: Arc<Core>, addr: A) -> io::Result<ServerHandle> {
    HttpServer(AppService::new(core)).start(addr)
}
