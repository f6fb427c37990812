//! Accepted connections that can be severed on a forced stop.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tonic::transport::server::{Connected, TcpConnectInfo};

/// TCP stream whose reads and writes fail once `sever` is cancelled.
///
/// The HTTP/2 connection driving it then errors out and drops the socket,
/// ending every call still in flight on it.
pub struct SeverableStream {
    stream: TcpStream,
    sever: CancellationToken,
    severed: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl SeverableStream {
    pub fn new(stream: TcpStream, sever: CancellationToken) -> Self {
        let severed = Box::pin(sever.clone().cancelled_owned());
        Self {
            stream,
            sever,
            severed,
        }
    }

    /// Registers the task for wakeup on cancellation.
    fn poll_severed(&mut self, cx: &mut Context<'_>) -> Poll<io::Error> {
        if self.sever.is_cancelled() || self.severed.as_mut().poll(cx).is_ready() {
            return Poll::Ready(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "server forced to stop",
            ));
        }
        Poll::Pending
    }
}

impl fmt::Debug for SeverableStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeverableStream")
            .field("stream", &self.stream)
            .field("severed", &self.sever.is_cancelled())
            .finish()
    }
}

impl AsyncRead for SeverableStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Poll::Ready(err) = self.poll_severed(cx) {
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for SeverableStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Poll::Ready(err) = self.poll_severed(cx) {
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if let Poll::Ready(err) = self.poll_severed(cx) {
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

impl Connected for SeverableStream {
    type ConnectInfo = TcpConnectInfo;

    fn connect_info(&self) -> Self::ConnectInfo {
        self.stream.connect_info()
    }
}
