use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chat_protocol::{is_error_reply, KEY_LENGTH, LIST, LISTING_PREFIX, PING, PONG};
use dns::QType;
use log::debug;
use tokio::net::UdpSocket;

const MAX_RESPONSE_SIZE: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("DNS query timed out after {0:?}")]
    Timeout(Duration),
    #[error("no TXT record in the response (rcode {0})")]
    NoAnswer(u8),
    /// The server answered with an `ERROR:` reply.
    #[error("{0}")]
    Server(String),
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

pub struct DnsChatClient {
    server: SocketAddr,
    timeout: Duration,
    api_key: Option<String>,
}

impl DnsChatClient {
    pub fn new(server: SocketAddr, timeout: Duration) -> Self {
        Self {
            server,
            timeout,
            api_key: None,
        }
    }

    pub fn set_api_key(&mut self, api_key: &str) -> Result<(), ClientError> {
        let len = api_key.chars().count();
        if len != KEY_LENGTH {
            return Err(ClientError::Usage(format!(
                "API key must be exactly {} characters. Got {} characters.",
                KEY_LENGTH, len
            )));
        }

        self.api_key = Some(api_key.to_string());
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends `name` as a TXT question and returns the text of the answer.
    pub async fn query(&self, name: &str) -> Result<String, ClientError> {
        let id = query_id();
        let request = dns::encode_request(id, name, QType::Txt)
            .map_err(|e| ClientError::Usage(format!("query does not fit in a DNS name: {}", e)))?;

        let sock = UdpSocket::bind(unspecified_for(self.server)).await?;
        sock.connect(self.server).await?;
        sock.send(&request).await?;
        debug!("sent {} bytes to {}", request.len(), self.server);

        let mut buf = vec![0u8; MAX_RESPONSE_SIZE];
        loop {
            let n = tokio::time::timeout(self.timeout, sock.recv(&mut buf))
                .await
                .map_err(|_| ClientError::Timeout(self.timeout))??;

            let resp = dns::decode_response(&buf[..n])?;
            if resp.header().id() != id {
                debug!("ignoring response with id {}", resp.header().id());
                continue;
            }

            return resp
                .first_txt()
                .ok_or_else(|| ClientError::NoAnswer(resp.header().response_code()));
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        let reply = self.query(PING).await?;
        if reply == PONG {
            Ok(())
        } else {
            Err(ClientError::Unexpected(reply))
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let reply = self.query(LIST).await?;
        parse_listing(&reply).ok_or(ClientError::Unexpected(reply))
    }

    pub async fn chat(&self, model_index: u8, prompt: &str) -> Result<String, ClientError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ClientError::Usage("API key not set, use --api-key".to_string()))?;
        let query = chat_query(api_key, model_index, prompt)?;

        let reply = self.query(&query).await?;
        if is_error_reply(&reply) {
            return Err(ClientError::Server(reply));
        }

        Ok(reply)
    }
}

pub fn chat_query(api_key: &str, model_index: u8, prompt: &str) -> Result<String, ClientError> {
    if model_index > 9 {
        return Err(ClientError::Usage("Model index must be between 0 and 9".to_string()));
    }
    if prompt.trim().is_empty() {
        return Err(ClientError::Usage("Prompt cannot be empty".to_string()));
    }

    Ok(format!("{}{}{}", api_key, model_index, prompt))
}

/// Entries of a `LIST` reply, e.g. `0:gpt-4o`.
pub fn parse_listing(reply: &str) -> Option<Vec<String>> {
    let models = reply.strip_prefix(LISTING_PREFIX)?;

    Some(
        models
            .split('|')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn query_id() -> u16 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos ^ std::process::id()) as u16
}

fn unspecified_for(server: SocketAddr) -> SocketAddr {
    let ip: IpAddr = match server {
        SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
        SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
    };
    SocketAddr::new(ip, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Answers every TXT question with `answer(name)`.
    async fn fake_server(answer: fn(&str) -> String) -> SocketAddr {
        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = sock.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            loop {
                let (n, peer) = sock.recv_from(&mut buf).await.unwrap();
                let request = dns::decode_request(&buf[..n]).unwrap();
                let text = answer(&request.question().domain());
                let response = dns::encode_txt_response(&request, 0, &text).unwrap();
                sock.send_to(&response, peer).await.unwrap();
            }
        });

        addr
    }

    fn echo_server(name: &str) -> String {
        match name {
            "PING" => "PONG".to_string(),
            "LIST" => "Available models: 0:gpt-4o | 1:gpt-4o-mini".to_string(),
            "my-api-key9Hello" => "ERROR: Invalid model index. Use 0-1".to_string(),
            other => format!("you said {}", other),
        }
    }

    fn client(server: SocketAddr) -> DnsChatClient {
        let mut client = DnsChatClient::new(server, Duration::from_secs(5));
        client.set_api_key("my-api-key").unwrap();
        client
    }

    #[test]
    fn api_key_must_be_ten_characters() {
        let mut client = DnsChatClient::new("127.0.0.1:53".parse().unwrap(), Duration::from_secs(1));
        assert!(matches!(client.set_api_key("short"), Err(ClientError::Usage(_))));
        assert!(!client.has_api_key());
        assert!(client.set_api_key("0123456789").is_ok());
        assert!(client.has_api_key());
    }

    #[test]
    fn chat_query_layout() {
        assert_eq!(chat_query("my-api-key", 1, "Hello").unwrap(), "my-api-key1Hello");
        assert!(chat_query("my-api-key", 10, "Hello").is_err());
        assert!(chat_query("my-api-key", 0, "  ").is_err());
    }

    #[test]
    fn listing_is_split() {
        assert_eq!(
            parse_listing("Available models: 0:gpt-4o | 1:gpt-4o-mini").unwrap(),
            vec!["0:gpt-4o", "1:gpt-4o-mini"]
        );
        assert!(parse_listing("PONG").is_none());
    }

    #[tokio::test]
    async fn ping_list_and_chat() {
        let server = fake_server(echo_server).await;
        let client = client(server);

        client.ping().await.unwrap();
        assert_eq!(client.list_models().await.unwrap().len(), 2);
        assert_eq!(client.chat(0, "Hello").await.unwrap(), "you said my-api-key0Hello");
    }

    #[tokio::test]
    async fn error_reply_is_a_failure() {
        let server = fake_server(echo_server).await;
        let client = client(server);

        match client.chat(9, "Hello").await {
            Err(ClientError::Server(reply)) => assert_eq!(reply, "ERROR: Invalid model index. Use 0-1"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn prompt_too_long_for_a_label() {
        let client = client("127.0.0.1:9".parse().unwrap());
        let prompt = "a".repeat(80);
        assert!(matches!(client.chat(0, &prompt).await, Err(ClientError::Usage(_))));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = DnsChatClient::new(silent.local_addr().unwrap(), Duration::from_millis(50));

        assert!(matches!(client.ping().await, Err(ClientError::Timeout(_))));
    }
}
