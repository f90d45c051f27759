//! Synchronous request/reply channel to the remote command service.
//!
//! The command service answers requests strictly in order on a single
//! connection and carries no correlation ids, so the channel enforces
//! single-flight discipline: a mutex around the stream serializes callers,
//! and a second call issued while one is outstanding queues until the first
//! reply has been read. A call that never receives a reply blocks
//! indefinitely; the protocol has no timeout or cancellation.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

use courier_protocol::{LogicalClock, MAX_MESSAGE_SIZE, Reply, Request, encode_message};

use crate::error::{ClientError, ClientResult};

/// Client for the request/reply command service.
pub struct CommandChannel {
    stream: Mutex<TcpStream>,
    clock: Arc<LogicalClock>,
}

impl CommandChannel {
    /// Connects to the command service.
    pub async fn connect(addr: &str, clock: Arc<LogicalClock>) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            ClientError::Connection(format!("failed to connect to command service {}: {}", addr, e))
        })?;
        debug!(addr, "command channel connected");

        Ok(Self {
            stream: Mutex::new(stream),
            clock,
        })
    }

    /// Sends a request and waits for the matching reply.
    ///
    /// Transport failures surface as an error result; they never tear down
    /// the session beyond failing this one call.
    pub async fn call(&self, request: &Request) -> ClientResult<Reply> {
        let frame = encode_message(request)?;

        // Holding the lock across the full exchange is what keeps replies
        // correlated to their requests on a wire without ids.
        let mut stream = self.stream.lock().await;

        debug!(service = request.service(), "sending request");
        stream.write_all(&frame).await?;
        stream.flush().await?;

        let payload = read_frame(&mut *stream).await?.ok_or_else(|| {
            ClientError::Connection("command service closed the connection".to_string())
        })?;
        drop(stream);

        let reply: Reply = serde_json::from_slice(&payload)
            .map_err(|e| ClientError::Protocol(format!("failed to decode reply: {}", e)))?;

        self.clock.observe(reply.clock());
        debug!(service = reply.service(), "reply received");
        Ok(reply)
    }
}

/// Reads one length-prefixed frame. Returns `Ok(None)` on clean EOF at a
/// frame boundary.
pub(crate) async fn read_frame<R>(reader: &mut R) -> ClientResult<Option<Vec<u8>>>
where
    R: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len as u32 > MAX_MESSAGE_SIZE {
        return Err(ClientError::Protocol(format!(
            "frame too large: {} bytes (max: {})",
            len, MAX_MESSAGE_SIZE
        )));
    }
    if len == 0 {
        return Err(ClientError::Protocol("empty frame".to_string()));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}
