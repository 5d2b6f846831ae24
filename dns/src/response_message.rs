use crate::header::Header;
use crate::question::Question;
use crate::record_type::QType;
use crate::request_message::RequestMessage;
use crate::resource_record::ResourceRecord;
use std::io::Cursor;

#[derive(Debug)]
pub struct ResponseMessage {
    header: Header,
    question: Option<Question>,
    answer_records: Vec<ResourceRecord>,
}

impl ResponseMessage {
    /// Answers `request` with one TXT record carrying `text`. Questions of
    /// any other type get an empty answer section.
    pub fn txt_answer(request: &RequestMessage, ttl: u32, text: &str) -> Self {
        let question = request.question().clone();

        let answer_records = if question.qtype() == QType::Txt {
            vec![ResourceRecord::txt(ttl, text)]
        } else {
            vec![]
        };

        let header = Header::answer_to(request.header(), answer_records.len() as u16);

        Self {
            header,
            question: Some(question),
            answer_records,
        }
    }

    pub fn to_bytes(&self, bytes: &mut Vec<u8>) -> std::io::Result<()> {
        self.header.to_bytes(bytes)?;
        if let Some(question) = &self.question {
            question.to_bytes(bytes)?;
        }
        for record in &self.answer_records {
            record.to_bytes(bytes)?;
        }

        Ok(())
    }

    // 解析 DNS 的响应
    pub fn parse_response(response: &[u8]) -> std::io::Result<Self> {
        let mut reader = Cursor::new(response);

        let header = Header::parse_from_reader(&mut reader)?;

        let question = if header.qd_count() == 1 {
            Some(Question::parse_from_reader(&mut reader)?)
        } else {
            None
        };

        let count = header.answer_count() as usize;
        let mut answer_records: Vec<ResourceRecord> = Vec::with_capacity(count);
        for _ in 0..header.answer_count() {
            let record = ResourceRecord::parse_from_reader(&mut reader)?;
            answer_records.push(record);
        }

        let msg = Self {
            header,
            question,
            answer_records,
        };

        Ok(msg)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn answers(&self) -> &[ResourceRecord] {
        &self.answer_records
    }

    pub fn first_txt(&self) -> Option<String> {
        self.answer_records.iter().find_map(|r| r.text())
    }

    pub fn txt_strings(&self) -> Vec<String> {
        self.answer_records.iter().filter_map(|r| r.text()).collect()
    }
}
