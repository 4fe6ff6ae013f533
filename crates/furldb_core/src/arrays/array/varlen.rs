use crate::arrays::bitmap::Bitmap;

/// Array storing utf8 data in a contiguous buffer with offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Utf8Array {
    validity: Option<Bitmap>,
    /// Offsets into `data`, length is one more than the number of values.
    offsets: Vec<usize>,
    /// Contiguous string bytes.
    data: Vec<u8>,
}

impl Utf8Array {
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the value at the given index.
    ///
    /// This does not take validity into account.
    pub fn value(&self, idx: usize) -> Option<&str> {
        if idx >= self.len() {
            return None;
        }
        let bytes = &self.data[self.offsets[idx]..self.offsets[idx + 1]];
        // Only ever constructed from str values.
        Some(std::str::from_utf8(bytes).expect("utf8 array to contain valid utf8"))
    }

    pub fn is_valid(&self, idx: usize) -> Option<bool> {
        if idx >= self.len() {
            return None;
        }
        Some(super::is_valid(self.validity.as_ref(), idx))
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }
}

impl<'a> FromIterator<&'a str> for Utf8Array {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut offsets = vec![0];
        let mut data = Vec::new();
        for s in iter {
            data.extend_from_slice(s.as_bytes());
            offsets.push(data.len());
        }
        Utf8Array {
            validity: None,
            offsets,
            data,
        }
    }
}

impl<'a> FromIterator<Option<&'a str>> for Utf8Array {
    fn from_iter<T: IntoIterator<Item = Option<&'a str>>>(iter: T) -> Self {
        let mut validity = Bitmap::default();
        let mut offsets = vec![0];
        let mut data = Vec::new();

        for item in iter {
            match item {
                Some(s) => {
                    validity.push(true);
                    data.extend_from_slice(s.as_bytes());
                }
                None => validity.push(false),
            }
            offsets.push(data.len());
        }

        Utf8Array {
            validity: Some(validity),
            offsets,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_and_validity() {
        let arr = Utf8Array::from_iter([Some("tag1"), None, Some("tag3")]);

        assert_eq!(3, arr.len());
        assert_eq!(Some("tag1"), arr.value(0));
        assert_eq!(Some(false), arr.is_valid(1));
        assert_eq!(Some("tag3"), arr.value(2));
    }
}
