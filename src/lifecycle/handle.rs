//! Handle to a running server.

use std::io;
use std::net::SocketAddr;
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

/// Returned by `HttpServer::start`; owns the serving task.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    pub(crate) fn new(
        local_addr: SocketAddr,
        shutdown: Shutdown,
        task: JoinHandle<io::Result<()>>,
    ) -> Self {
        Self {
            local_addr,
            shutdown,
            task,
        }
    }

    /// The address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections, drain in-flight requests and wait for the
    /// serving task to finish.
    pub async fn shutdown(self) -> io::Result<()> {
        self.shutdown.trigger();
        self.wait().await
    }

    /// Wait for the server to stop on its own.
    pub async fn wait(self) -> io::Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }
}
