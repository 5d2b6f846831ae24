use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum QType {
    A,
    Txt,
    Other(u16),
}

impl From<u16> for QType {
    fn from(value: u16) -> Self {
        match value {
            1 => QType::A,
            16 => QType::Txt,
            other => QType::Other(other),
        }
    }
}

impl From<QType> for u16 {
    fn from(value: QType) -> Self {
        match value {
            QType::A => 1,
            QType::Txt => 16,
            QType::Other(other) => other,
        }
    }
}

impl fmt::Display for QType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QType::A => write!(f, "A"),
            QType::Txt => write!(f, "TXT"),
            QType::Other(v) => write!(f, "TYPE{}", v),
        }
    }
}

pub const CLASS_IN: u16 = 1;
