use std::fmt;

/// Client-facing selectors are a single digit.
pub const MAX_CATALOG_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("model index {index} out of range, catalog has {size} models")]
pub struct OutOfRange {
    pub index: usize,
    pub size: usize,
}

/// Ordered list of backend model identifiers. An entry's index is its
/// position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<String>,
}

impl ModelCatalog {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn identifier_at(&self, index: usize) -> Result<&str, OutOfRange> {
        self.models.get(index).map(String::as_str).ok_or(OutOfRange {
            index,
            size: self.models.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.models.iter().map(String::as_str).enumerate()
    }

    /// `LIST` reply: `Available models: 0:<id0> | 1:<id1> | ...`.
    pub fn listing(&self) -> String {
        format!("{}{}", LISTING_PREFIX, self)
    }
}

pub const LISTING_PREFIX: &str = "Available models: ";
const LISTING_SEPARATOR: &str = " | ";

impl fmt::Display for ModelCatalog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (index, model) in self.iter() {
            if index > 0 {
                f.write_str(LISTING_SEPARATOR)?;
            }
            write!(f, "{}:{}", index, model)?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for ModelCatalog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}
