//! DNS listeners in front of the [`Router`].

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use completion::CompletionBackend;
use dns::QType;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

use crate::router::Router;

// Large enough for EDNS sized queries.
const MAX_QUERY_SIZE: usize = 4096;
const TCP_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Decodes a DNS query, routes its name and encodes the TXT answer.
pub struct Handler<B> {
    router: Arc<Router<B>>,
    ttl: u32,
}

impl<B: CompletionBackend + 'static> Handler<B> {
    pub fn new(router: Router<B>, ttl: u32) -> Self {
        Self {
            router: Arc::new(router),
            ttl,
        }
    }

    /// The encoded response, or `None` when the packet is dropped.
    pub async fn answer(&self, packet: &[u8]) -> Option<Vec<u8>> {
        let request = match dns::decode_request(packet) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("dropping undecodable packet of {} bytes: {}", packet.len(), e);
                return None;
            }
        };

        let question = request.question();
        let text = if question.qtype() == QType::Txt {
            let router = self.router.clone();
            let name = question.domain();

            // a panicking query still gets the fallback answer
            match tokio::spawn(async move { router.route(&name).await }).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("query handler failed: {}", e);
                    self.router.fallback().to_string()
                }
            }
        } else {
            tracing::debug!("{} query, answering without records", question.qtype());
            String::new()
        };

        match dns::encode_txt_response(&request, self.ttl, &text) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::error!("failed to encode response: {}", e);
                None
            }
        }
    }
}

pub async fn serve_udp<B>(socket: UdpSocket, handler: Arc<Handler<B>>) -> std::io::Result<()>
where
    B: CompletionBackend + 'static,
{
    let socket = Arc::new(socket);

    loop {
        let mut buf = BytesMut::with_capacity(MAX_QUERY_SIZE);
        let (len, peer) = match socket.recv_buf_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                tracing::warn!("UDP receive error, err: {}", e);
                continue;
            }
        };
        tracing::debug!("received {} bytes from {}", len, peer);

        let socket = socket.clone();
        let handler = handler.clone();
        tokio::spawn(async move {
            let Some(response) = handler.answer(&buf[..len]).await else {
                return;
            };
            if let Err(e) = socket.send_to(&response, peer).await {
                tracing::warn!("failed to answer {}, err: {}", peer, e);
            }
        });
    }
}

pub async fn serve_tcp<B>(listener: TcpListener, handler: Arc<Handler<B>>) -> std::io::Result<()>
where
    B: CompletionBackend + 'static,
{
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) if is_connection_error(&e) => continue,
            Err(e) => {
                // likely out of file descriptors, give open connections a
                // moment to close
                // https://github.com/tokio-rs/axum/blob/axum-v0.7.5/axum/src/serve.rs#L388
                tracing::error!("TCP accept error, err: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        tracing::debug!("accepted a connection from {}", peer);

        let handler = handler.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, peer, handler).await {
                tracing::debug!("connection from {} closed, err: {}", peer, e);
            }
        });
    }
}

fn is_connection_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset
    )
}

// Length prefixed messages, several per connection.
async fn serve_connection<B>(mut stream: TcpStream, peer: SocketAddr, handler: Arc<Handler<B>>) -> std::io::Result<()>
where
    B: CompletionBackend + 'static,
{
    loop {
        let len = match tokio::time::timeout(TCP_IDLE_TIMEOUT, stream.read_u16()).await {
            Ok(Ok(len)) => len as usize,
            Ok(Err(e)) if e.kind() == ErrorKind::UnexpectedEof => return Ok(()),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                tracing::debug!("closing idle connection from {}", peer);
                return Ok(());
            }
        };

        let mut packet = vec![0u8; len];
        stream.read_exact(&mut packet).await?;

        if let Some(response) = handler.answer(&packet).await {
            stream.write_u16(response.len() as u16).await?;
            stream.write_all(&response).await?;
        }
    }
}
