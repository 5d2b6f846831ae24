use crate::header::Header;
use crate::question::Question;
use crate::record_type::QType;
use std::io::{Cursor, Error, ErrorKind};

#[derive(Debug)]
pub struct RequestMessage {
    header: Header,
    question: Question,
}

impl RequestMessage {
    pub fn new(id: u16, domain: &str, qtype: QType) -> std::io::Result<Self> {
        let header = Header::query(id);
        let question = Question::new(domain, qtype)?;

        Ok(Self { header, question })
    }

    pub fn to_bytes(&self, bytes: &mut Vec<u8>) -> std::io::Result<()> {
        self.header.to_bytes(bytes)?;
        self.question.to_bytes(bytes)?;

        Ok(())
    }

    // 解析 DNS 的请求，只读取第一个 question
    pub fn parse_request(request: &[u8]) -> std::io::Result<Self> {
        let mut reader = Cursor::new(request);

        let header = Header::parse_from_reader(&mut reader)?;
        if header.is_response() {
            return Err(Error::new(ErrorKind::InvalidData, "message is a response"));
        }
        if header.qd_count() == 0 {
            return Err(Error::new(ErrorKind::InvalidData, "message has no question"));
        }

        let question = Question::parse_from_reader(&mut reader)?;

        Ok(Self { header, question })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn question(&self) -> &Question {
        &self.question
    }
}
