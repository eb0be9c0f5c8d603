//! HTTP/1 server hosting a [`DocDavFs`].

use super::DocDavFs;
use crate::fs::DocFs;
use dav_server::{fakels::FakeLs, DavHandler};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use log::{debug, error, info};
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Handle on a server started with [`serve_background`].
pub struct DocWebDavServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl DocWebDavServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL to give to a WebDAV client.
    pub fn mount_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn handler(fs: DocFs) -> DavHandler {
    DavHandler::builder()
        .filesystem(Box::new(DocDavFs::new(fs)))
        // Finder and Explorer refuse to write without LOCK support.
        .locksystem(FakeLs::new())
        .build_handler()
}

async fn bind(port: u16) -> io::Result<TcpListener> {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    TcpListener::bind(addr).await
}

fn spawn_connection(stream: TcpStream, remote_addr: SocketAddr, dav_server: DavHandler) {
    debug!("Connection from {}", remote_addr);
    let io = TokioIo::new(stream);

    tokio::spawn(async move {
        if let Err(err) = http1::Builder::new()
            .serve_connection(
                io,
                service_fn(move |req| {
                    let dav_server = dav_server.clone();
                    async move { Ok::<_, Infallible>(dav_server.handle(req).await) }
                }),
            )
            .await
        {
            error!("Connection error: {:?}", err);
        }
    });
}

/// Serve `fs` on `127.0.0.1:port` until the process stops.
///
/// Port 0 picks a free port.
pub async fn serve(fs: DocFs, port: u16) -> io::Result<()> {
    let dav_server = handler(fs);
    let listener = bind(port).await?;
    let local_addr = listener.local_addr()?;

    info!("WebDAV server listening on http://{}", local_addr);
    info!("To mount from a terminal:");
    info!("  mkdir -p /tmp/docstore");
    info!("  mount_webdav http://{} /tmp/docstore", local_addr);
    info!("Press Ctrl+C to stop the server");

    loop {
        let (stream, remote_addr) = listener.accept().await?;
        spawn_connection(stream, remote_addr, dav_server.clone());
    }
}

/// Serve `fs` on `127.0.0.1:port` from a background task.
pub async fn serve_background(fs: DocFs, port: u16) -> io::Result<DocWebDavServer> {
    let dav_server = handler(fs);
    let listener = bind(port).await?;
    let local_addr = listener.local_addr()?;
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    info!("WebDAV server started on http://{}", local_addr);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, remote_addr)) => {
                        spawn_connection(stream, remote_addr, dav_server.clone());
                    }
                    Err(e) => error!("Accept error: {:?}", e),
                },
                _ = &mut shutdown_rx => {
                    info!("WebDAV server shutting down");
                    break;
                }
            }
        }
    });

    Ok(DocWebDavServer {
        addr: local_addr,
        shutdown_tx: Some(shutdown_tx),
    })
}
