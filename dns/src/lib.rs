// https://www.reddit.com/r/rust/comments/381y9g/why_udpsocket_in_rust_must_be_created_using_the/

mod header;
mod question;
mod record_type;
mod request_message;
mod resource_record;
mod response_message;
mod utils;

pub use record_type::QType;
pub use request_message::RequestMessage;
pub use response_message::ResponseMessage;
pub use utils::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH};

// https://datatracker.ietf.org/doc/html/rfc1035#section-4.2.1
//
// Messages carried by UDP are restricted to 512 bytes (not counting the IP
// or UDP headers).
pub const MAX_UDP_MESSAGE_SIZE: usize = 512;

pub fn encode_request(id: u16, domain: &str, qtype: QType) -> std::io::Result<Vec<u8>> {
    let request_msg = RequestMessage::new(id, domain, qtype)?;
    let mut request_bytes: Vec<u8> = vec![];
    request_msg.to_bytes(&mut request_bytes)?;

    Ok(request_bytes)
}

pub fn decode_request(request_bytes: &[u8]) -> std::io::Result<RequestMessage> {
    RequestMessage::parse_request(request_bytes)
}

/// Encodes the answer to `request`, see [`ResponseMessage::txt_answer`].
pub fn encode_txt_response(request: &RequestMessage, ttl: u32, text: &str) -> std::io::Result<Vec<u8>> {
    let response_msg = ResponseMessage::txt_answer(request, ttl, text);
    let mut response_bytes: Vec<u8> = Vec::with_capacity(MAX_UDP_MESSAGE_SIZE);
    response_msg.to_bytes(&mut response_bytes)?;

    Ok(response_bytes)
}

pub fn decode_response(response_bytes: &[u8]) -> std::io::Result<ResponseMessage> {
    ResponseMessage::parse_response(response_bytes)
}
