use crate::attributes::*;
use crate::checks::*;
use crate::message::*;
use shared::error::*;
use std::fmt;

const MAX_USERNAME_B: usize = 513;
const MAX_SOFTWARE_B: usize = 763;

/// Username represents USERNAME attribute.
///
/// RFC 5389 Section 15.3
pub type Username = TextAttribute;

/// Software is SOFTWARE attribute.
///
/// RFC 5389 Section 15.10
pub type Software = TextAttribute;

/// TextAttribute is helper for adding and getting text attributes.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct TextAttribute {
    pub attr: AttrType,
    pub text: String,
}

impl fmt::Display for TextAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl Setter for TextAttribute {
    /// add_to adds attribute with type t to m, checking maximum length. If max_len
    /// is less than 0, no check is performed.
    fn add_to(&self, m: &mut Message) -> Result<()> {
        let text = self.text.as_bytes();
        let max_len = match self.attr {
            ATTR_USERNAME => MAX_USERNAME_B,
            ATTR_SOFTWARE => MAX_SOFTWARE_B,
            _ => {
                return Err(Error::ErrUnexpectedAttributeValue(format!(
                    "Unsupported AttrType {}",
                    self.attr
                )));
            }
        };

        check_overflow(self.attr, text.len(), max_len)?;
        m.add(self.attr, text);
        Ok(())
    }
}

impl Getter for TextAttribute {
    fn get_from(&mut self, m: &Message) -> Result<()> {
        let attr = self.attr;
        *self = TextAttribute::get_from_as(m, attr)?;
        Ok(())
    }
}

impl TextAttribute {
    pub fn new(attr: AttrType, text: String) -> Self {
        TextAttribute { attr, text }
    }

    /// get_from_as gets t attribute from m and appends its value to reseted v.
    pub fn get_from_as(m: &Message, attr: AttrType) -> Result<Self> {
        match attr {
            ATTR_USERNAME | ATTR_SOFTWARE => {}
            _ => {
                return Err(Error::ErrUnexpectedAttributeValue(format!(
                    "Unsupported AttrType {attr}"
                )));
            }
        };

        let a = m.get(attr)?;
        let text = String::from_utf8(a)?;
        Ok(TextAttribute { attr, text })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_username_round_trip() -> Result<()> {
        let username = "username".to_owned();
        let u = Username::new(ATTR_USERNAME, username.clone());
        let mut m = Message::new();
        m.write_header();
        u.add_to(&mut m)?;

        let mut got = Username::new(ATTR_USERNAME, String::new());
        got.get_from(&m)?;
        assert_eq!(got.text, username);
        assert_eq!(got.to_string(), "username");
        Ok(())
    }

    #[test]
    fn test_username_overflow() {
        let u = Username::new(ATTR_USERNAME, "a".repeat(MAX_USERNAME_B + 1));
        let mut m = Message::new();
        assert_eq!(u.add_to(&mut m), Err(Error::ErrAttributeSizeOverflow));
    }

    #[test]
    fn test_text_attribute_not_found() {
        let m = Message::new();
        assert_eq!(
            TextAttribute::get_from_as(&m, ATTR_USERNAME),
            Err(Error::ErrAttributeNotFound)
        );
    }
}
