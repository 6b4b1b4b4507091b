use std::collections::HashMap;

use super::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Open {
        name: &'a str,
        attributes: HashMap<String, String>,
        at: usize,
    },
    Close {
        name: &'a str,
        at: usize,
    },
    Text {
        text: &'a str,
        at: usize,
    },
}

/// Splits a document into open tags, close tags and raw text runs.
///
/// Declarations (`<?...?>`) and comments (`<!--...-->`) are consumed silently.
/// Self-closing tags are rejected: every element must carry an explicit close tag.
pub(crate) struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    failed: bool,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            failed: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn skip_until(&mut self, terminator: &str, at: usize) -> Result<(), DecodeError> {
        match self.rest().find(terminator) {
            Some(offset) => {
                self.pos += offset + terminator.len();
                Ok(())
            }
            None => Err(DecodeError::Unterminated { at }),
        }
    }

    fn read_name(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(_, c)| !is_name_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn read_attributes(
        &mut self,
        tag: &str,
        at: usize,
    ) -> Result<HashMap<String, String>, DecodeError> {
        let mut attributes = HashMap::new();
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok(attributes);
            }
            if rest.starts_with("/>") {
                return Err(DecodeError::SelfClosingTag {
                    tag: tag.to_string(),
                    at,
                });
            }
            if rest.is_empty() {
                return Err(DecodeError::Unterminated { at });
            }

            let attr_at = self.pos;
            let name = self.read_name();
            if name.is_empty() {
                return Err(DecodeError::InvalidAttribute { at: attr_at });
            }
            self.skip_whitespace();
            if !self.rest().starts_with('=') {
                return Err(DecodeError::InvalidAttribute { at: attr_at });
            }
            self.pos += 1;
            self.skip_whitespace();
            if !self.rest().starts_with('"') {
                return Err(DecodeError::InvalidAttribute { at: attr_at });
            }
            self.pos += 1;
            let Some(end) = self.rest().find('"') else {
                return Err(DecodeError::Unterminated { at: attr_at });
            };
            let value = &self.rest()[..end];
            self.pos += end + 1;
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, DecodeError> {
        loop {
            if self.pos >= self.input.len() {
                return Ok(None);
            }
            let at = self.pos;
            let rest = self.rest();

            if !rest.starts_with('<') {
                let len = rest.find('<').unwrap_or(rest.len());
                self.pos += len;
                return Ok(Some(Token::Text {
                    text: &rest[..len],
                    at,
                }));
            }

            if rest.starts_with("<?") {
                self.skip_until("?>", at)?;
                continue;
            }
            if rest.starts_with("<!--") {
                self.skip_until("-->", at)?;
                continue;
            }

            if rest.starts_with("</") {
                self.pos += 2;
                let name = self.read_name();
                if name.is_empty() {
                    return Err(DecodeError::InvalidTag { at });
                }
                self.skip_whitespace();
                if !self.rest().starts_with('>') {
                    return Err(DecodeError::InvalidTag { at });
                }
                self.pos += 1;
                return Ok(Some(Token::Close { name, at }));
            }

            self.pos += 1;
            let name = self.read_name();
            if name.is_empty() {
                return Err(DecodeError::InvalidTag { at });
            }
            let attributes = self.read_attributes(name, at)?;
            return Ok(Some(Token::Open {
                name,
                attributes,
                at,
            }));
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | ':' | '.' | '-')
}
