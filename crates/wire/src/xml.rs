//! XML codec
//!
//! ```text
//! <container>
//!   <header><message_type>..</message_type><version>..</version></header>
//!   <values><name>text</name>...</values>
//! </container>
//! ```
//!
//! Routing header fields follow the same omission rule as every other
//! format. Text is escaped with the five XML 1.0 entities; other control
//! characters are written as `&#xNN;`. Bytes are written as lowercase hex.
//! Nested containers are embedded as a child `<container>` element and
//! arrays as a sequence of `<item>` elements.
//!
//! The format is human-facing: every scalar is read back as a string.

use crate::{Format, Serializer, MAX_NESTING_DEPTH};
use vessel_core::{Document, Error, HeaderField, NamedValue, Result, Value};

/// Codec for XML
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Serializer for XmlCodec {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn name(&self) -> &'static str {
        "XML"
    }

    fn serialize_into(&self, doc: &Document, out: &mut Vec<u8>) -> Result<()> {
        let mut text = String::new();
        write_document(doc, &mut text)?;
        out.extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Document> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::DeserializationFailed(format!("XML is not UTF-8: {}", e)))?;
        let mut parser = Parser { src: text, pos: 0 };
        parser.skip_prolog()?;
        let root = parser.element(0)?;
        parser.skip_misc()?;
        if parser.pos < parser.src.len() {
            return Err(parser.malformed("content after root element"));
        }
        read_document(&root, 0)
    }
}

// ============================================================================
// Writing
// ============================================================================

fn write_document(doc: &Document, out: &mut String) -> Result<()> {
    out.push_str("<container><header>");
    for (field, value) in doc.header.wire_fields() {
        write_text_element(field.name(), value, out);
    }
    out.push_str("</header><values>");
    for nv in &doc.values {
        check_name(&nv.name)?;
        write_value(&nv.name, &nv.value, out)?;
    }
    out.push_str("</values></container>");
    Ok(())
}

fn write_value(tag: &str, value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Container(doc) => {
            out.push('<');
            out.push_str(tag);
            out.push('>');
            write_document(doc, out)?;
            push_close(tag, out);
        }
        Value::Array(items) => {
            out.push('<');
            out.push_str(tag);
            out.push('>');
            for item in items {
                write_value("item", item, out)?;
            }
            push_close(tag, out);
        }
        scalar => write_text_element(tag, &scalar.to_string(), out),
    }
    Ok(())
}

fn write_text_element(tag: &str, text: &str, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    escape_into(text, out);
    push_close(tag, out);
}

fn push_close(tag: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {
                out.push_str(&format!("&#x{:02X};", c as u32));
            }
            c => out.push(c),
        }
    }
}

fn check_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::EncodingError(format!(
            "'{}' is not a valid XML element name",
            name
        )))
    }
}

// ============================================================================
// Reading
// ============================================================================

#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn read_document(root: &Element, depth: usize) -> Result<Document> {
    if root.name != "container" {
        return Err(Error::DeserializationFailed(format!(
            "expected <container> root, found <{}>",
            root.name
        )));
    }
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::DeserializationFailed(format!(
            "containers nested deeper than {}",
            MAX_NESTING_DEPTH
        )));
    }

    let mut doc = Document::new();
    if let Some(header) = root.child("header") {
        for field in &header.children {
            if let Some(id) = HeaderField::from_name(&field.name) {
                doc.header.set_field(id, field.text.trim());
            }
        }
    }
    if let Some(values) = root.child("values") {
        for element in &values.children {
            doc.values.push(NamedValue {
                name: element.name.clone(),
                value: read_value(element, depth)?,
            });
        }
    }
    Ok(doc)
}

fn read_value(element: &Element, depth: usize) -> Result<Value> {
    match element.children.first() {
        None => Ok(Value::String(element.text.clone())),
        Some(first) if first.name == "container" && element.children.len() == 1 => {
            Ok(Value::Container(Box::new(read_document(first, depth + 1)?)))
        }
        Some(_) => {
            let mut items = Vec::with_capacity(element.children.len());
            for item in &element.children {
                items.push(read_value(item, depth + 1)?);
            }
            Ok(Value::Array(items))
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn malformed(&self, what: &str) -> Error {
        Error::DeserializationFailed(format!("malformed XML at byte {}: {}", self.pos, what))
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn skip_past(&mut self, end: &str) -> Result<()> {
        match self.rest().find(end) {
            Some(i) => {
                self.pos += i + end.len();
                Ok(())
            }
            None => Err(self.malformed(&format!("missing '{}'", end))),
        }
    }

    /// Skip whitespace, comments and processing instructions
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.skip_ws();
            if self.rest().starts_with("<!--") {
                self.skip_past("-->")?;
            } else if self.rest().starts_with("<?") {
                self.skip_past("?>")?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_prolog(&mut self) -> Result<()> {
        self.skip_misc()?;
        if self.rest().starts_with("<!DOCTYPE") {
            self.skip_past(">")?;
            self.skip_misc()?;
        }
        Ok(())
    }

    fn name(&mut self) -> Result<&'a str> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '='))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.malformed("expected element name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn element(&mut self, depth: usize) -> Result<Element> {
        if depth > MAX_NESTING_DEPTH * 3 {
            return Err(self.malformed("elements nested too deeply"));
        }
        if !self.rest().starts_with('<') {
            return Err(self.malformed("expected '<'"));
        }
        self.pos += 1;
        let name = self.name()?.to_string();

        // attributes carry nothing in this format
        match self.rest().find('>') {
            Some(i) => {
                let self_closing = self.rest()[..i].ends_with('/');
                self.pos += i + 1;
                if self_closing {
                    return Ok(Element {
                        name,
                        ..Element::default()
                    });
                }
            }
            None => return Err(self.malformed("unterminated start tag")),
        }

        let mut element = Element {
            name,
            ..Element::default()
        };
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.malformed(&format!("missing </{}>", element.name)));
            }
            if rest.starts_with("</") {
                self.pos += 2;
                let close = self.name()?;
                if close != element.name {
                    return Err(self.malformed(&format!(
                        "expected </{}>, found </{}>",
                        element.name, close
                    )));
                }
                self.skip_ws();
                if !self.rest().starts_with('>') {
                    return Err(self.malformed("unterminated end tag"));
                }
                self.pos += 1;
                if !element.children.is_empty() && element.text.trim().is_empty() {
                    element.text.clear();
                }
                return Ok(element);
            }
            if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if rest.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                let end = self
                    .rest()
                    .find("]]>")
                    .ok_or_else(|| self.malformed("unterminated CDATA"))?;
                element.text.push_str(&self.rest()[..end]);
                self.pos += end + 3;
            } else if rest.starts_with('<') {
                element.children.push(self.element(depth + 1)?);
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                unescape_into(&rest[..end], &mut element.text)
                    .map_err(|what| self.malformed(&what))?;
                self.pos += end;
            }
        }
    }
}

fn unescape_into(text: &str, out: &mut String) -> std::result::Result<(), String> {
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| "unterminated entity".to_string())?;
        let entity = &after[..semi];
        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| format!("unknown entity '&{};'", entity))?
            }
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(())
}
