use super::IdParseError;

/// Cursor over the `/`-separated segments of an ID
pub(super) struct Segments<'a> {
    id: &'a str,
    parts: Vec<&'a str>,
    pos: usize,
}

impl<'a> Segments<'a> {
    pub(super) fn new(id: &'a str) -> Result<Self, IdParseError> {
        if id.is_empty() {
            return Err(IdParseError::Empty);
        }
        let Some(rest) = id.strip_prefix('/') else {
            return Err(IdParseError::MissingLeadingSlash { id: id.to_string() });
        };
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(IdParseError::EmptySegment { id: id.to_string() });
        }
        Ok(Self { id, parts, pos: 0 })
    }

    /// Consumes a fixed segment, compared case-insensitively
    pub(super) fn literal(&mut self, expected: &str) -> Result<(), IdParseError> {
        match self.parts.get(self.pos) {
            Some(found) if found.eq_ignore_ascii_case(expected) => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(IdParseError::UnexpectedSegment {
                id: self.id.to_string(),
                expected: expected.to_string(),
                found: found.to_string(),
            }),
            None => Err(self.missing(expected)),
        }
    }

    /// Consumes a user-supplied value
    pub(super) fn value(&mut self, name: &str) -> Result<String, IdParseError> {
        match self.parts.get(self.pos) {
            Some(value) => {
                self.pos += 1;
                Ok(value.to_string())
            }
            None => Err(self.missing(name)),
        }
    }

    /// `{literal}/{value}` pair
    pub(super) fn keyed(&mut self, key: &str, name: &str) -> Result<String, IdParseError> {
        self.literal(key)?;
        self.value(name)
    }

    pub(super) fn peek_is(&self, literal: &str) -> bool {
        self.parts
            .get(self.pos)
            .is_some_and(|p| p.eq_ignore_ascii_case(literal))
    }

    pub(super) fn is_done(&self) -> bool {
        self.pos >= self.parts.len()
    }

    pub(super) fn finish(self) -> Result<(), IdParseError> {
        if self.is_done() {
            return Ok(());
        }
        Err(IdParseError::TrailingSegments {
            id: self.id.to_string(),
            extra: self.parts[self.pos..].join("/"),
        })
    }

    fn missing(&self, expected: &str) -> IdParseError {
        IdParseError::MissingSegment {
            id: self.id.to_string(),
            expected: expected.to_string(),
        }
    }
}
