use std::fmt;

/// Half-open key range `[begin, end)`. `end == None` is unbounded.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub begin: Vec<u8>,
    pub end: Option<Vec<u8>>,
}

impl Span {
    pub fn new(begin: impl Into<Vec<u8>>, end: Option<Vec<u8>>) -> Self {
        Self {
            begin: begin.into(),
            end,
        }
    }

    /// Every key.
    pub fn all() -> Self {
        Self::default()
    }

    /// Every key starting with `prefix`.
    pub fn prefix(prefix: &[u8]) -> Self {
        Self {
            begin: prefix.to_vec(),
            end: prefix_end(prefix),
        }
    }

    /// Exactly one key.
    pub fn single(key: &[u8]) -> Self {
        Self {
            begin: key.to_vec(),
            end: Some(key_after(key)),
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.begin.as_slice() && self.below_end(key)
    }

    /// `true` if `key` is below the upper bound.
    pub fn below_end(&self, key: &[u8]) -> bool {
        self.end.as_deref().map_or(true, |end| key < end)
    }

    /// `true` if no key can fall inside the span.
    pub fn is_empty(&self) -> bool {
        self.end
            .as_deref()
            .map_or(false, |end| end <= self.begin.as_slice())
    }

    /// Move a span expressed relative to `prefix` into the absolute key
    /// space. An unbounded end becomes the end of the prefix.
    pub fn with_prefix(&self, prefix: &[u8]) -> Self {
        let begin = [prefix, &self.begin].concat();
        let end = match &self.end {
            Some(end) => Some([prefix, end].concat()),
            None => prefix_end(prefix),
        };
        Self { begin, end }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.end {
            Some(end) => write!(
                f,
                "[{}, {})",
                self.begin.escape_ascii(),
                end.escape_ascii()
            ),
            None => write!(f, "[{}, ∞)", self.begin.escape_ascii()),
        }
    }
}

/// The smallest key strictly greater than `key`.
pub fn key_after(key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + 1);
    out.extend_from_slice(key);
    out.push(0x00);
    out
}

/// The smallest key greater than every key that starts with `prefix`, or
/// `None` if no such key exists (empty or all-`0xff` prefix).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    while let Some(last) = out.pop() {
        if last < 0xff {
            out.push(last + 1);
            return Some(out);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_after_appends_zero() {
        assert_eq!(key_after(b"ab"), b"ab\x00");
        assert_eq!(key_after(b""), b"\x00");
    }

    #[test]
    fn prefix_end_increments_last_byte() {
        assert_eq!(prefix_end(b"ab"), Some(b"ac".to_vec()));
        assert_eq!(prefix_end(b"a\xff"), Some(b"b".to_vec()));
        assert_eq!(prefix_end(b"\xff\xff"), None);
        assert_eq!(prefix_end(b""), None);
    }

    #[test]
    fn prefix_span_bounds() {
        let span = Span::prefix(b"i\x00");
        assert!(span.contains(b"i\x00artist"));
        assert!(!span.contains(b"f\x00"));
        assert!(!span.contains(b"i\x01"));
    }

    #[test]
    fn single_span_holds_one_key() {
        let span = Span::single(b"k");
        assert!(span.contains(b"k"));
        assert!(!span.contains(b"k\x00"));
        assert!(!span.contains(b"j"));
    }

    #[test]
    fn with_prefix_relocates_bounds() {
        let rel = Span::new(b"a".to_vec(), Some(b"c".to_vec()));
        let abs = rel.with_prefix(b"i\x00");
        assert_eq!(abs.begin, b"i\x00a");
        assert_eq!(abs.end.as_deref(), Some(&b"i\x00c"[..]));

        let open = Span::all().with_prefix(b"f\x00");
        assert_eq!(open.begin, b"f\x00");
        assert_eq!(open.end.as_deref(), Some(&b"f\x01"[..]));
    }

    #[test]
    fn empty_span() {
        assert!(Span::new(b"b".to_vec(), Some(b"a".to_vec())).is_empty());
        assert!(Span::new(b"a".to_vec(), Some(b"a".to_vec())).is_empty());
        assert!(!Span::all().is_empty());
    }
}
