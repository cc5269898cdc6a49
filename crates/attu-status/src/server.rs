//! Status server lifecycle.
//!
//! The bot binds the listener before connecting to the gateway, so a port
//! clash surfaces in the startup log rather than after the first event.
//! Serving then runs in its own task until the shutdown future resolves.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::StatusState;

/// Errors from binding or running the status server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The status address could not be bound.
    #[error("status API cannot listen on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The accept loop failed.
    #[error("status API stopped: {0}")]
    Serve(#[source] io::Error),
}

/// A bound, not yet serving, status API.
#[derive(Debug)]
pub struct StatusServer {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl StatusServer {
    /// Bind `addr` and build the route table over `state`.
    ///
    /// Port `0` picks a free port; read it back with
    /// [`local_addr`](Self::local_addr).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr, state: Arc<StatusState>) -> Result<Self, ServerError> {
        let bind_err = |source| ServerError::Bind { addr, source };
        let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;
        Ok(Self {
            listener,
            router: build_router(state),
            local_addr,
        })
    }

    /// The address actually bound.
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `shutdown` resolves, finishing in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Serve`] if the accept loop fails.
    pub async fn serve_until(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<(), ServerError> {
        info!(addr = %self.local_addr, "status API listening");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)?;
        info!(addr = %self.local_addr, "status API stopped");
        Ok(())
    }
}
