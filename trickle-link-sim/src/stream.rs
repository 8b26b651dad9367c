use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

// ---

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;

// ---

use trickle_domain::{Result, TrickleStream};

// ---------------------------------------------------------------------------
// LinkSimStream
// ---------------------------------------------------------------------------

/// One end of an in-process stream backed by mpsc channels.
///
/// Created in connected pairs by [`LinkSimStream::pair`]. The write side
/// sends `Vec<u8>` chunks; the read side receives them. Dropping the sender
/// (on close or cut) signals EOF to the peer.
///
/// When `write_budget` is `Some`, the stream is cut as soon as a write
/// would exceed the remaining budget: the bytes that still fit are
/// delivered, the sender is dropped, and every later write fails with
/// `BrokenPipe`.
#[derive(Debug)]
pub struct LinkSimStream {
    // ---
    label: &'static str,
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    /// Leftover bytes from a partially consumed chunk.
    read_buf: Vec<u8>,
    /// `None` = never cut. `Some(n)` = `n` bytes may still be written.
    write_budget: Option<usize>,
}

// ---

impl LinkSimStream {
    // ---
    /// Create a connected `(client, server)` pair.
    ///
    /// `server_cut` bounds how many bytes the server end may write before
    /// the link is severed.
    pub fn pair(server_cut: Option<usize>) -> (Self, Self) {
        // ---
        let (c2s_tx, c2s_rx) = mpsc::unbounded_channel();
        let (s2c_tx, s2c_rx) = mpsc::unbounded_channel();

        let client = Self {
            label: "link-sim client",
            tx: Some(c2s_tx),
            rx: s2c_rx,
            read_buf: Vec::new(),
            write_budget: None,
        };
        let server = Self {
            label: "link-sim server",
            tx: Some(s2c_tx),
            rx: c2s_rx,
            read_buf: Vec::new(),
            write_budget: server_cut,
        };

        (client, server)
    }

    // ---

    /// `true` once this end's write direction is cut or closed.
    pub fn is_severed(&self) -> bool {
        self.tx.is_none()
    }

    // ---

    fn sever(&mut self) {
        // ---
        if self.tx.take().is_some() {
            tracing::debug!(end = self.label, "link-sim: write direction severed");
        }
    }
}

// ---

#[async_trait]
impl TrickleStream for LinkSimStream {
    // ---
    fn peer(&self) -> String {
        self.label.to_string()
    }

    async fn close(&mut self) -> Result<()> {
        // ---
        self.tx = None;
        self.rx.close();
        Ok(())
    }
}

// ---

impl AsyncRead for LinkSimStream {
    // ---
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        // ---
        if !self.read_buf.is_empty() {
            let n = buf.remaining().min(self.read_buf.len());
            buf.put_slice(&self.read_buf[..n]);
            self.read_buf.drain(..n);
            return Poll::Ready(Ok(()));
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => {
                let n = buf.remaining().min(chunk.len());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.read_buf.extend_from_slice(&chunk[n..]);
                }
                Poll::Ready(Ok(()))
            }
            // Sender gone: EOF.
            Poll::Ready(None) => Poll::Ready(Ok(())),
            Poll::Pending => Poll::Pending,
        }
    }
}

// ---

impl AsyncWrite for LinkSimStream {
    // ---
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        // ---
        // An empty chunk would read as EOF on the other side.
        if data.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let allowed = match self.write_budget {
            None => data.len(),
            Some(budget) => budget.min(data.len()),
        };

        if allowed == 0 {
            self.sever();
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "link-sim: connection cut",
            )));
        }

        let sent = match self.tx.as_ref() {
            Some(tx) => tx.send(data[..allowed].to_vec()).is_ok(),
            None => false,
        };

        if !sent {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "link-sim: stream closed",
            )));
        }

        if let Some(budget) = self.write_budget.as_mut() {
            *budget -= allowed;
        }
        Poll::Ready(Ok(allowed))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // ---
        self.tx = None;
        Poll::Ready(Ok(()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
