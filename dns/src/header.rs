use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::io::Cursor;

const QR_MASK: u16 = 0x8000;
const OPCODE_MASK: u16 = 0x7800;
const AA_MASK: u16 = 0x0400;
const RD_MASK: u16 = 0x0100;

// 12 bytes
#[derive(Debug, Clone)]
pub struct Header {
    id: u16,
    flags: u16,
    qdcount: u16, // question 数量，一般为 1
    ancount: u16,
    nscount: u16,
    arcount: u16,
}

impl Header {
    pub fn query(id: u16) -> Self {
        Self {
            id,
            flags: RD_MASK, // rd = 1
            qdcount: 1,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        }
    }

    /// Header of an authoritative answer to `request`: same id and opcode,
    /// RD copied, RCODE 0.
    pub fn answer_to(request: &Header, ancount: u16) -> Self {
        let flags = QR_MASK | AA_MASK | (request.flags & (OPCODE_MASK | RD_MASK));

        Self {
            id: request.id,
            flags,
            qdcount: 1,
            ancount,
            nscount: 0,
            arcount: 0,
        }
    }

    pub fn to_bytes(&self, bytes: &mut Vec<u8>) -> std::io::Result<()> {
        bytes.write_u16::<BE>(self.id)?;
        bytes.write_u16::<BE>(self.flags)?;
        bytes.write_u16::<BE>(self.qdcount)?;
        bytes.write_u16::<BE>(self.ancount)?;
        bytes.write_u16::<BE>(self.nscount)?;
        bytes.write_u16::<BE>(self.arcount)?;

        Ok(())
    }

    pub fn parse_from_reader(rdr: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        let id = rdr.read_u16::<BE>()?;
        let flags = rdr.read_u16::<BE>()?;
        let qdcount = rdr.read_u16::<BE>()?;
        let ancount = rdr.read_u16::<BE>()?;
        let nscount = rdr.read_u16::<BE>()?;
        let arcount = rdr.read_u16::<BE>()?;

        let h = Self {
            id,
            flags,
            qdcount,
            ancount,
            nscount,
            arcount,
        };

        Ok(h)
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn is_response(&self) -> bool {
        self.flags & QR_MASK != 0
    }

    pub fn qd_count(&self) -> u16 {
        self.qdcount
    }

    pub fn answer_count(&self) -> u16 {
        self.ancount
    }

    pub fn response_code(&self) -> u8 {
        (self.flags & 0x000F) as u8
    }
}
