use crate::record_type::{QType, CLASS_IN};
use crate::utils::{domain_to_qname, qname_to_domain, read_qname};
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::io::Cursor;

#[derive(Debug, Clone)]
pub struct Question {
    qname: Vec<u8>,
    qtype: u16,
    qclass: u16,
}

impl Question {
    pub fn new(domain: &str, qtype: QType) -> std::io::Result<Self> {
        Ok(Self {
            qname: domain_to_qname(domain)?,
            qtype: qtype.into(),
            qclass: CLASS_IN,
        })
    }

    pub fn to_bytes(&self, bytes: &mut Vec<u8>) -> std::io::Result<()> {
        bytes.extend_from_slice(&self.qname);

        bytes.write_u16::<BE>(self.qtype)?;
        bytes.write_u16::<BE>(self.qclass)?;

        Ok(())
    }

    pub fn parse_from_reader(rdr: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        let qname = read_qname(rdr)?;

        let qtype = rdr.read_u16::<BE>()?;
        let qclass = rdr.read_u16::<BE>()?;

        let q = Self {
            qname,
            qtype,
            qclass,
        };

        Ok(q)
    }

    /// Labels joined by `.`, without the root.
    pub fn domain(&self) -> String {
        qname_to_domain(&self.qname)
    }

    pub fn qtype(&self) -> QType {
        QType::from(self.qtype)
    }

    pub fn qclass(&self) -> u16 {
        self.qclass
    }
}
