use byteorder::ReadBytesExt;
use std::io::{Cursor, Error, ErrorKind, Read};

// https://datatracker.ietf.org/doc/html/rfc1035#section-2.3.4
pub const MAX_LABEL_LENGTH: usize = 63;
pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_CHARACTER_STRING_LENGTH: usize = 255;

// qname 转换为可读的字符串
pub fn qname_to_domain(qname: &[u8]) -> String {
    let mut labels = Vec::new();

    let mut index = 0;
    while index < qname.len() {
        let label_len: usize = qname[index] as usize;

        if label_len == 0 {
            break;
        }

        let label_begin_index = index + 1;
        let next_index = (label_begin_index + label_len).min(qname.len());

        let label_bytes = &qname[label_begin_index..next_index];

        let label = String::from_utf8_lossy(label_bytes).to_string();
        labels.push(label);

        index = next_index
    }

    labels.join(".")
}

// 把域名从转换为 C 风格的字符串
pub fn domain_to_qname(domain: &str) -> std::io::Result<Vec<u8>> {
    let mut qname: Vec<u8> = Vec::new();

    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.is_empty() {
        qname.push(0);
        return Ok(qname);
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(invalid_input("empty label in domain name"));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(invalid_input(&format!(
                "label is {} bytes long, at most {} allowed",
                label.len(),
                MAX_LABEL_LENGTH
            )));
        }

        qname.push(label.len() as u8);
        qname.extend_from_slice(label.as_bytes());
    }

    qname.push(0);

    if qname.len() > MAX_NAME_LENGTH {
        return Err(invalid_input(&format!(
            "domain name is {} bytes long, at most {} allowed",
            qname.len(),
            MAX_NAME_LENGTH
        )));
    }

    Ok(qname)
}

/// Reads an uncompressed name, returning its wire form including the
/// terminating zero byte.
pub fn read_qname(rdr: &mut Cursor<&[u8]>) -> std::io::Result<Vec<u8>> {
    let mut qname: Vec<u8> = Vec::new();

    loop {
        let label_len = rdr.read_u8()?;
        qname.push(label_len);

        if label_len == 0 {
            break;
        }
        if label_len & 0xC0 != 0 {
            return Err(Error::new(ErrorKind::InvalidData, "compressed question name"));
        }

        let start = qname.len();
        qname.resize(start + label_len as usize, 0);
        rdr.read_exact(&mut qname[start..])?;

        if qname.len() > MAX_NAME_LENGTH {
            return Err(Error::new(ErrorKind::InvalidData, "domain name too long"));
        }
    }

    Ok(qname)
}

/// Skips a possibly compressed name in a resource record.
pub fn skip_name(rdr: &mut Cursor<&[u8]>) -> std::io::Result<()> {
    loop {
        let label_len = rdr.read_u8()?;

        if label_len == 0 {
            return Ok(());
        }
        // [192, 12]
        if label_len & 0xC0 == 0xC0 {
            let _offset_low = rdr.read_u8()?;
            return Ok(());
        }

        let pos = rdr.position() + u64::from(label_len);
        if pos > rdr.get_ref().len() as u64 {
            return Err(Error::new(ErrorKind::UnexpectedEof, "truncated name"));
        }
        rdr.set_position(pos);
    }
}

/// Splits `text` into <character-string>s of at most 255 bytes each. An empty
/// text becomes a single empty character-string.
pub fn character_strings(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut rdata = Vec::with_capacity(bytes.len() + bytes.len() / MAX_CHARACTER_STRING_LENGTH + 1);

    if bytes.is_empty() {
        rdata.push(0);
        return rdata;
    }

    for chunk in bytes.chunks(MAX_CHARACTER_STRING_LENGTH) {
        rdata.push(chunk.len() as u8);
        rdata.extend_from_slice(chunk);
    }

    rdata
}

/// Concatenated contents of every <character-string> in `rdata`.
pub fn parse_character_strings(rdata: &[u8]) -> std::io::Result<String> {
    let mut text: Vec<u8> = Vec::with_capacity(rdata.len());

    let mut index = 0;
    while index < rdata.len() {
        let len = rdata[index] as usize;
        let begin = index + 1;
        let end = begin + len;
        if end > rdata.len() {
            return Err(Error::new(ErrorKind::InvalidData, "truncated character-string"));
        }

        text.extend_from_slice(&rdata[begin..end]);
        index = end;
    }

    Ok(String::from_utf8_lossy(&text).to_string())
}

fn invalid_input(msg: &str) -> Error {
    Error::new(ErrorKind::InvalidInput, msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_round_trip_keeps_dots() {
        let qname = domain_to_qname("my-api-key0Hello world.how are you").unwrap();
        assert_eq!(qname[0], 22);
        assert_eq!(qname_to_domain(&qname), "my-api-key0Hello world.how are you");
    }

    #[test]
    fn trailing_root_dot_is_ignored() {
        assert_eq!(domain_to_qname("PING.").unwrap(), domain_to_qname("PING").unwrap());
    }

    #[test]
    fn long_label_is_rejected() {
        let label = "a".repeat(64);
        let err = domain_to_qname(&label).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn long_name_is_rejected() {
        let name = vec!["a".repeat(60); 5].join(".");
        let err = domain_to_qname(&name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn long_text_is_split_into_character_strings() {
        let text = "x".repeat(300);
        let rdata = character_strings(&text);

        assert_eq!(rdata.len(), 302);
        assert_eq!(rdata[0], 255);
        assert_eq!(rdata[256], 45);
        assert_eq!(parse_character_strings(&rdata).unwrap(), text);
    }

    #[test]
    fn empty_text_is_one_empty_character_string() {
        assert_eq!(character_strings(""), vec![0]);
    }

    #[test]
    fn read_qname_rejects_pointers() {
        let bytes: &[u8] = &[0xC0, 0x0C];
        let mut rdr = Cursor::new(bytes);
        assert!(read_qname(&mut rdr).is_err());
    }
}
