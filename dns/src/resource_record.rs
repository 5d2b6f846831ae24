use crate::record_type::{QType, CLASS_IN};
use crate::utils::{character_strings, parse_character_strings, skip_name};
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::io::{Cursor, Read};

// Compression pointer to the name of the first question, right after the
// 12 byte header.
const QUESTION_NAME_POINTER: u16 = 0xC00C;

#[derive(Debug)]
pub struct ResourceRecord {
    rtype: u16,
    rclass: u16,
    ttl: u32,
    pub rdata: Vec<u8>,
}

impl ResourceRecord {
    pub fn txt(ttl: u32, text: &str) -> Self {
        Self {
            rtype: QType::Txt.into(),
            rclass: CLASS_IN,
            ttl,
            rdata: character_strings(text),
        }
    }

    /// Writes the record with its owner name pointing at the question.
    pub fn to_bytes(&self, bytes: &mut Vec<u8>) -> std::io::Result<()> {
        bytes.write_u16::<BE>(QUESTION_NAME_POINTER)?;
        bytes.write_u16::<BE>(self.rtype)?;
        bytes.write_u16::<BE>(self.rclass)?;
        bytes.write_u32::<BE>(self.ttl)?;
        bytes.write_u16::<BE>(self.rdata.len() as u16)?;
        bytes.extend_from_slice(&self.rdata);

        Ok(())
    }

    pub fn parse_from_reader(rdr: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        skip_name(rdr)?;

        let rtype = rdr.read_u16::<BE>()?;
        let rclass = rdr.read_u16::<BE>()?;
        let ttl = rdr.read_u32::<BE>()?;
        let rdlength = rdr.read_u16::<BE>()?;

        let mut rdata = vec![0u8; rdlength as usize];
        rdr.read_exact(&mut rdata)?;

        let record = Self {
            rtype,
            rclass,
            ttl,
            rdata,
        };

        Ok(record)
    }

    pub fn rtype(&self) -> QType {
        QType::from(self.rtype)
    }

    pub fn rclass(&self) -> u16 {
        self.rclass
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn text(&self) -> Option<String> {
        if self.rtype() != QType::Txt {
            return None;
        }
        parse_character_strings(&self.rdata).ok()
    }
}
