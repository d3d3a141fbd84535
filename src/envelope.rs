use super::*;

pub const ENVELOPE_ROOT: &str = "ajax-response";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Component { id: String, markup: String },
    Evaluate { script: String },
}

impl Envelope {
    pub fn parse(text: &str) -> Result<Self> {
        stacker::grow(8 * 1024 * 1024, || Self::parse_impl(text))
    }

    fn parse_impl(text: &str) -> Result<Self> {
        let root = parse_document(text)?;
        if root.name != ENVELOPE_ROOT {
            return Err(Error::MalformedEnvelope(format!(
                "expected <{ENVELOPE_ROOT}> root, found <{}>",
                root.name
            )));
        }

        let mut instructions = Vec::new();
        for child in &root.children {
            let XmlChild::Element(element) = child else {
                continue;
            };
            match element.name.as_str() {
                "component" => {
                    let id = element.attr("id").ok_or_else(|| {
                        Error::EnvelopeParse(
                            "<component> instruction is missing its id attribute".into(),
                        )
                    })?;
                    let markup = decode_payload(element.attr("encoding"), element.payload())?;
                    instructions.push(Instruction::Component { id, markup });
                }
                "evaluate" => {
                    let script = decode_payload(element.attr("encoding"), element.payload())?;
                    instructions.push(Instruction::Evaluate { script });
                }
                // Unrecognized instruction elements are ignored, not rejected.
                _ => {}
            }
        }

        Ok(Self { instructions })
    }
}

// Server-side escaping of "]" inside CDATA payloads.
fn decode_payload(encoding: Option<String>, payload: String) -> Result<String> {
    match encoding.as_deref() {
        None | Some("") => Ok(payload),
        Some("wicket1") => Ok(payload.replace("]^", "]")),
        Some(other) => Err(Error::EnvelopeParse(format!(
            "unknown payload encoding: {other}"
        ))),
    }
}

#[derive(Debug)]
struct XmlElement {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<XmlChild>,
}

#[derive(Debug)]
enum XmlChild {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    fn attr(&self, name: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    // The payload of an instruction is the concatenation of its direct
    // text and CDATA children; nested elements contribute nothing.
    fn payload(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlChild::Text(text) = child {
                out.push_str(text);
            }
        }
        out
    }
}

fn parse_document(text: &str) -> Result<XmlElement> {
    let mut cursor = XmlCursor::new(text);
    cursor.skip_misc()?;
    if cursor.eof() {
        return Err(Error::MalformedEnvelope(
            "document has no root element".into(),
        ));
    }
    let root = cursor.parse_element()?;
    cursor.skip_misc()?;
    if !cursor.eof() {
        return Err(Error::EnvelopeParse(format!(
            "unexpected content after document root at {}",
            cursor.pos()
        )));
    }
    Ok(root)
}

struct XmlCursor<'a> {
    src: &'a str,
    i: usize,
}

impl<'a> XmlCursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, i: 0 }
    }

    fn eof(&self) -> bool {
        self.i >= self.src.len()
    }

    fn pos(&self) -> usize {
        self.i
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.i).copied()
    }

    fn consume_ascii(&mut self, token: &str) -> bool {
        if starts_with_at(self.bytes(), self.i, token.as_bytes()) {
            self.i += token.len();
            true
        } else {
            false
        }
    }

    fn expect_byte(&mut self, b: u8) -> Result<()> {
        if self.peek() == Some(b) {
            self.i += 1;
            Ok(())
        } else {
            Err(Error::EnvelopeParse(format!(
                "expected '{}' at {}",
                b as char, self.i
            )))
        }
    }

    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.i += 1;
            } else {
                break;
            }
        }
    }

    // Whitespace, the XML prolog, comments, and doctype between elements.
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.skip_ws();
            if self.consume_ascii("<?") {
                let end = find_subslice(self.bytes(), self.i, b"?>")
                    .ok_or_else(|| Error::EnvelopeParse("unclosed processing instruction".into()))?;
                self.i = end + 2;
                continue;
            }
            if self.consume_ascii("<!--") {
                let end = find_subslice(self.bytes(), self.i, b"-->")
                    .ok_or_else(|| Error::EnvelopeParse("unclosed XML comment".into()))?;
                self.i = end + 3;
                continue;
            }
            if starts_with_at(self.bytes(), self.i, b"<!DOCTYPE")
                || starts_with_at(self.bytes(), self.i, b"<!doctype")
            {
                while let Some(b) = self.peek() {
                    self.i += 1;
                    if b == b'>' {
                        break;
                    }
                }
                continue;
            }
            return Ok(());
        }
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.i;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':' || b == b'.' {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.i == start {
            return Err(Error::EnvelopeParse(format!(
                "expected a name at {}",
                start
            )));
        }
        Ok(self.src[start..self.i].to_string())
    }

    fn parse_element(&mut self) -> Result<XmlElement> {
        self.expect_byte(b'<')?;
        let name = self.parse_name()?;
        let mut attrs = Vec::new();

        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'>') => {
                    self.i += 1;
                    break;
                }
                Some(b'/') => {
                    self.i += 1;
                    self.expect_byte(b'>')?;
                    return Ok(XmlElement {
                        name,
                        attrs,
                        children: Vec::new(),
                    });
                }
                Some(_) => {
                    let attr_name = self.parse_name()?;
                    self.skip_ws();
                    self.expect_byte(b'=')?;
                    self.skip_ws();
                    let value = self.parse_attr_value()?;
                    attrs.push((attr_name, value));
                }
                None => {
                    return Err(Error::EnvelopeParse(format!("unclosed <{name}> tag")));
                }
            }
        }

        let children = self.parse_children(&name)?;
        Ok(XmlElement {
            name,
            attrs,
            children,
        })
    }

    fn parse_attr_value(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(b @ (b'"' | b'\'')) => b,
            _ => {
                return Err(Error::EnvelopeParse(format!(
                    "expected a quoted attribute value at {}",
                    self.i
                )));
            }
        };
        self.i += 1;
        let start = self.i;
        while let Some(b) = self.peek() {
            if b == quote {
                let raw = &self.src[start..self.i];
                self.i += 1;
                return Ok(decode_character_references(raw));
            }
            self.i += 1;
        }
        Err(Error::EnvelopeParse("unclosed attribute value".into()))
    }

    fn parse_children(&mut self, parent: &str) -> Result<Vec<XmlChild>> {
        let mut children = Vec::new();
        let mut text = String::new();

        loop {
            if self.eof() {
                return Err(Error::EnvelopeParse(format!("unclosed <{parent}> element")));
            }

            if self.consume_ascii("<![CDATA[") {
                let end = find_subslice(self.bytes(), self.i, b"]]>")
                    .ok_or_else(|| Error::EnvelopeParse("unclosed CDATA section".into()))?;
                text.push_str(&self.src[self.i..end]);
                self.i = end + 3;
                continue;
            }

            if self.consume_ascii("<!--") {
                let end = find_subslice(self.bytes(), self.i, b"-->")
                    .ok_or_else(|| Error::EnvelopeParse("unclosed XML comment".into()))?;
                self.i = end + 3;
                continue;
            }

            if starts_with_at(self.bytes(), self.i, b"</") {
                if !text.is_empty() {
                    children.push(XmlChild::Text(std::mem::take(&mut text)));
                }
                self.i += 2;
                let name = self.parse_name()?;
                if name != parent {
                    return Err(Error::EnvelopeParse(format!(
                        "mismatched end tag: expected </{parent}>, found </{name}>"
                    )));
                }
                self.skip_ws();
                self.expect_byte(b'>')?;
                return Ok(children);
            }

            if self.peek() == Some(b'<') {
                if !text.is_empty() {
                    children.push(XmlChild::Text(std::mem::take(&mut text)));
                }
                children.push(XmlChild::Element(self.parse_element()?));
                continue;
            }

            let start = self.i;
            while let Some(b) = self.peek() {
                if b == b'<' {
                    break;
                }
                self.i += 1;
            }
            text.push_str(&decode_character_references(&self.src[start..self.i]));
        }
    }
}
