//! Delimited text wire format
//!
//! ```text
//! document    := header? data?
//! header      := "@header=" brace-block        ; [field-id,value];
//! data        := "@data="   brace-block        ; [name,type-tag,value];
//! brace-block := "{" "{"? pair* "}" "}"? ";"?
//! ```
//!
//! Header field ids 1..=6 are target id, target sub id, source id, source
//! sub id, message type and version. Ids 1..=4 are omitted when the message
//! type is `data_container`. The type tag is the decimal kind tag.
//!
//! Strings and bytes are written verbatim, so a payload containing the pair
//! terminator `];` cannot be represented; encoding such a payload fails with
//! `EncodingError` instead of producing a document that parses differently.
//! Nested containers and arrays are written as lowercase hex of their own
//! encoding, so each level of nesting doubles the size of its payload.
//!
//! The parser is a single forward pass over bytes. It tolerates single or
//! doubled braces and whitespace between structural tokens, and records the
//! byte range of every value so the zero-copy index can serve raw views.
//! Value names and header values are read verbatim, surrounding spaces
//! included, so they decode to exactly what was encoded.

use crate::{Format, Serializer, MAX_NESTING_DEPTH};
use std::ops::Range;
use tracing::{debug, warn};
use vessel_core::{Document, Error, Header, HeaderField, NamedValue, Result, Value, ValueKind};

const HEADER_TAG: &[u8] = b"@header";
const DATA_TAG: &[u8] = b"@data";
const TERMINATOR: &[u8] = b"];";

/// Codec for the delimited text format
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Serializer for TextCodec {
    fn format(&self) -> Format {
        Format::Text
    }

    fn name(&self) -> &'static str {
        "Text"
    }

    fn serialize_into(&self, doc: &Document, out: &mut Vec<u8>) -> Result<()> {
        encode(doc, out)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Document> {
        decode(bytes)
    }
}

/// Location of one data pair inside a raw buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Byte range of the name
    pub name: Range<usize>,
    /// Kind named by the type tag
    pub kind: ValueKind,
    /// Byte range of the value, exactly as written
    pub value: Range<usize>,
}

// ============================================================================
// Encoding
// ============================================================================

/// Append the text encoding of `doc` to `out`
pub fn encode(doc: &Document, out: &mut Vec<u8>) -> Result<()> {
    out.extend_from_slice(b"@header={{");
    for (field, value) in doc.header.wire_fields() {
        check_verbatim(field.name(), value.as_bytes())?;
        out.push(b'[');
        out.extend_from_slice(field.id().to_string().as_bytes());
        out.push(b',');
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(TERMINATOR);
    }
    out.extend_from_slice(b"}};");
    encode_data(doc.values.iter().map(|nv| (nv.name.as_str(), &nv.value)), out)
}

fn encode_data<'a>(
    pairs: impl Iterator<Item = (&'a str, &'a Value)>,
    out: &mut Vec<u8>,
) -> Result<()> {
    out.extend_from_slice(b"@data={{");
    for (name, value) in pairs {
        if name.is_empty() || name.bytes().any(|b| matches!(b, b',' | b'[' | b']')) {
            return Err(Error::EncodingError(format!(
                "value name '{}' is empty or contains a delimiter",
                name
            )));
        }
        out.push(b'[');
        out.extend_from_slice(name.as_bytes());
        out.push(b',');
        out.extend_from_slice(value.kind().tag().to_string().as_bytes());
        out.push(b',');
        encode_value(name, value, out)?;
        out.extend_from_slice(TERMINATOR);
    }
    out.extend_from_slice(b"}};");
    Ok(())
}

/// Append the textual form of a single value
///
/// This is the exact byte sequence a zero-copy view of the value returns.
pub fn encode_value(name: &str, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Bool(v) => out.extend_from_slice(if *v { "true" } else { "false" }.as_bytes()),
        Value::Short(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::UShort(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Int(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::UInt(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Long(v) | Value::LLong(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::ULong(v) | Value::ULLong(v) => out.extend_from_slice(v.to_string().as_bytes()),
        // Display is the shortest representation that parses back exactly
        Value::Float(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Double(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::String(s) => {
            check_verbatim(name, s.as_bytes())?;
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            check_verbatim(name, b)?;
            out.extend_from_slice(b);
        }
        Value::Container(doc) => {
            let mut inner = Vec::new();
            encode(doc, &mut inner)?;
            out.extend_from_slice(hex::encode(inner).as_bytes());
        }
        Value::Array(items) => {
            let names: Vec<String> = (0..items.len()).map(|i| i.to_string()).collect();
            let mut inner = Vec::new();
            encode_data(names.iter().map(String::as_str).zip(items.iter()), &mut inner)?;
            out.extend_from_slice(hex::encode(inner).as_bytes());
        }
    }
    Ok(())
}

fn check_verbatim(name: &str, payload: &[u8]) -> Result<()> {
    if payload.windows(TERMINATOR.len()).any(|w| w == TERMINATOR) {
        return Err(Error::EncodingError(format!(
            "'{}' contains the pair terminator \"];\" which the text format cannot carry",
            name
        )));
    }
    Ok(())
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a full document
pub fn decode(bytes: &[u8]) -> Result<Document> {
    decode_at_depth(bytes, 0)
}

fn decode_at_depth(bytes: &[u8], depth: usize) -> Result<Document> {
    let (header, entries) = scan(bytes, true)?;
    let mut values = Vec::with_capacity(entries.len());
    for entry in &entries {
        values.push(materialize(bytes, entry, depth)?);
    }
    Ok(Document { header, values })
}

/// Parse only the header block, leaving values untouched
pub fn parse_header(bytes: &[u8]) -> Result<Header> {
    scan(bytes, false).map(|(header, _)| header)
}

/// Locate every data pair without decoding any value
pub fn index_entries(bytes: &[u8]) -> Result<Vec<RawEntry>> {
    scan(bytes, true).map(|(_, entries)| entries)
}

/// Decode the value of an indexed entry
pub fn materialize(bytes: &[u8], entry: &RawEntry, depth: usize) -> Result<NamedValue> {
    let name = utf8(&bytes[entry.name.clone()], "value name")?;
    let value = decode_value(entry.kind, &bytes[entry.value.clone()], depth)?;
    Ok(NamedValue {
        name: name.to_string(),
        value,
    })
}

/// Decode the raw text of one value
pub fn decode_value(kind: ValueKind, raw: &[u8], depth: usize) -> Result<Value> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::DeserializationFailed(format!(
            "containers nested deeper than {}",
            MAX_NESTING_DEPTH
        )));
    }

    let value = match kind {
        ValueKind::Null => Value::Null,
        ValueKind::Bool => {
            let text = literal(kind, raw)?;
            Value::Bool(text == "true" || text == "1")
        }
        ValueKind::Short => Value::Short(number(kind, raw)?),
        ValueKind::UShort => Value::UShort(number(kind, raw)?),
        ValueKind::Int => Value::Int(number(kind, raw)?),
        ValueKind::UInt => Value::UInt(number(kind, raw)?),
        ValueKind::Long => Value::Long(number(kind, raw)?),
        ValueKind::ULong => Value::ULong(number(kind, raw)?),
        ValueKind::LLong => Value::LLong(number(kind, raw)?),
        ValueKind::ULLong => Value::ULLong(number(kind, raw)?),
        ValueKind::Float => Value::Float(number(kind, raw)?),
        ValueKind::Double => Value::Double(number(kind, raw)?),
        ValueKind::String => Value::String(utf8(raw, "string value")?.to_string()),
        ValueKind::Bytes => Value::Bytes(raw.to_vec()),
        ValueKind::Container => {
            let inner = unhex(kind, raw)?;
            Value::Container(Box::new(decode_at_depth(&inner, depth + 1)?))
        }
        ValueKind::Array => {
            let inner = unhex(kind, raw)?;
            let (_, entries) = scan(&inner, true)?;
            let mut items = Vec::with_capacity(entries.len());
            for entry in &entries {
                items.push(decode_value(entry.kind, &inner[entry.value.clone()], depth + 1)?);
            }
            Value::Array(items)
        }
    };
    Ok(value)
}

fn utf8<'a>(raw: &'a [u8], what: &str) -> Result<&'a str> {
    std::str::from_utf8(raw)
        .map_err(|e| Error::DeserializationFailed(format!("{} is not valid UTF-8: {}", what, e)))
}

fn literal(kind: ValueKind, raw: &[u8]) -> Result<&str> {
    utf8(raw, kind.name()).map(str::trim)
}

fn number<T: std::str::FromStr>(kind: ValueKind, raw: &[u8]) -> Result<T> {
    let text = literal(kind, raw)?;
    text.parse::<T>().map_err(|_| {
        Error::DeserializationFailed(format!("invalid {} literal '{}'", kind, text))
    })
}

fn unhex(kind: ValueKind, raw: &[u8]) -> Result<Vec<u8>> {
    hex::decode(literal(kind, raw)?).map_err(|e| {
        Error::DeserializationFailed(format!("invalid hex payload for {}: {}", kind, e))
    })
}

// ============================================================================
// Scanner
// ============================================================================

fn scan(bytes: &[u8], want_data: bool) -> Result<(Header, Vec<RawEntry>)> {
    let mut cursor = Cursor { buf: bytes, pos: 0 };
    let mut header = Header::default();
    let mut entries = Vec::new();

    cursor.skip_ws();
    let has_header = cursor.eat_tag(HEADER_TAG);
    if has_header {
        cursor.header_block(&mut header)?;
        cursor.skip_ws();
    }
    if !want_data {
        if !has_header && !cursor.rest().starts_with(DATA_TAG) {
            return Err(cursor.malformed("expected '@header' or '@data'"));
        }
        return Ok((header, entries));
    }

    if cursor.eat_tag(DATA_TAG) {
        cursor.data_block(&mut entries)?;
        cursor.skip_ws();
    } else if !has_header {
        return Err(cursor.malformed("expected '@header' or '@data'"));
    }

    if !cursor.at_end() {
        return Err(cursor.malformed("unexpected trailing content"));
    }
    Ok((header, entries))
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_tag(&mut self, tag: &[u8]) -> bool {
        if self.rest().starts_with(tag) {
            self.pos += tag.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.malformed(&format!("expected '{}'", byte as char)))
        }
    }

    fn malformed(&self, what: &str) -> Error {
        Error::DeserializationFailed(format!("malformed document at byte {}: {}", self.pos, what))
    }

    /// Range up to the next `delim`, consuming the delimiter
    fn until(&mut self, delim: u8) -> Result<Range<usize>> {
        let start = self.pos;
        match self.rest().iter().position(|&b| b == delim) {
            Some(len) => {
                self.pos = start + len + 1;
                Ok(start..start + len)
            }
            None => Err(self.malformed(&format!("missing '{}'", delim as char))),
        }
    }

    /// Range up to the next pair terminator, consuming it
    fn until_terminator(&mut self) -> Result<Range<usize>> {
        let start = self.pos;
        match self.rest().windows(TERMINATOR.len()).position(|w| w == TERMINATOR) {
            Some(len) => {
                self.pos = start + len + TERMINATOR.len();
                Ok(start..start + len)
            }
            None => Err(self.malformed("unterminated pair")),
        }
    }

    fn trimmed(&self, range: Range<usize>) -> Range<usize> {
        let slice = &self.buf[range.clone()];
        let lead = slice.iter().take_while(|b| b.is_ascii_whitespace()).count();
        let trail = slice[lead..]
            .iter()
            .rev()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        range.start + lead..range.end - trail
    }

    fn open_block(&mut self) -> Result<()> {
        self.skip_ws();
        self.expect(b'=')?;
        self.skip_ws();
        self.expect(b'{')?;
        self.eat(b'{');
        Ok(())
    }

    fn close_block(&mut self) -> Result<()> {
        self.expect(b'}')?;
        self.eat(b'}');
        self.skip_ws();
        self.eat(b';');
        Ok(())
    }

    fn header_block(&mut self, header: &mut Header) -> Result<()> {
        let buf = self.buf;
        self.open_block()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'[') => {
                    self.pos += 1;
                    let id = self.until(b',')?;
                    let value = self.until_terminator()?;
                    let id = utf8(&buf[id], "header field id")?.trim();
                    let value = utf8(&buf[value], "header value")?;
                    match id.parse::<u8>().ok().and_then(HeaderField::from_id) {
                        Some(field) => header.set_field(field, value),
                        None => debug!(target: "vessel::wire", id, "ignoring unknown header field"),
                    }
                }
                Some(b'}') => return self.close_block(),
                _ => return Err(self.malformed("expected '[' or '}' in header block")),
            }
        }
    }

    fn data_block(&mut self, entries: &mut Vec<RawEntry>) -> Result<()> {
        let buf = self.buf;
        self.open_block()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'[') => {
                    self.pos += 1;
                    let name = self.until(b',')?;
                    let tag = self.until(b',')?;
                    let tag = self.trimmed(tag);
                    let value = self.until_terminator()?;

                    let tag_text = utf8(&buf[tag], "type tag")?;
                    let kind = tag_text
                        .parse::<u8>()
                        .ok()
                        .and_then(ValueKind::from_tag)
                        .ok_or_else(|| {
                            warn!(target: "vessel::wire", tag = tag_text, "unknown type tag");
                            self.malformed(&format!("unknown type tag '{}'", tag_text))
                        })?;
                    if name.is_empty() {
                        return Err(self.malformed("empty value name"));
                    }
                    entries.push(RawEntry { name, kind, value });
                }
                Some(b'}') => return self.close_block(),
                _ => return Err(self.malformed("expected '[' or '}' in data block")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_to_string(doc: &Document) -> String {
        let mut out = Vec::new();
        encode(doc, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    // ====================================================================
    // Encoding layout
    // ====================================================================

    #[test]
    fn test_untyped_header_omits_routing_ids() {
        let doc = Document::new().with("name", "Alice").with("age", 30i32);
        assert_eq!(
            encode_to_string(&doc),
            "@header={{[5,data_container];[6,1.0];}};@data={{[name,12,Alice];[age,4,30];}};"
        );
    }

    #[test]
    fn test_typed_header_writes_all_ids() {
        let mut doc = Document::new();
        doc.header.message_type = "order".into();
        doc.header.target_id = "svc".into();
        doc.header.source_id = "cli".into();
        let text = encode_to_string(&doc);
        assert!(text.starts_with("@header={{[1,svc];[2,];[3,cli];[4,];[5,order];[6,1.0];}};"));
    }

    #[test]
    fn test_scalar_literals() {
        let doc = Document::new()
            .with("b", true)
            .with("f", 0.1f32)
            .with("d", -2.5f64)
            .with("n", ())
            .with("u", u64::MAX);
        assert_eq!(
            encode_to_string(&doc),
            format!(
                "@header={{{{[5,data_container];[6,1.0];}}}};@data={{{{[b,1,true];[f,10,0.1];[d,11,-2.5];[n,0,];[u,7,{}];}}}};",
                u64::MAX
            )
        );
    }

    #[test]
    fn test_terminator_in_payload_is_rejected() {
        let doc = Document::new().with("s", "a];b");
        let err = TextCodec.serialize(&doc).unwrap_err();
        assert_eq!(err.code(), 207);

        let doc = Document::new().with("bad,name", 1i32);
        assert!(TextCodec.serialize(&doc).is_err());
    }

    // ====================================================================
    // Decoding
    // ====================================================================

    #[test]
    fn test_decode_round_trips_every_kind() {
        let nested = Document::new().with("inner", "x").with("n", 7i16);
        let doc = Document::new()
            .with("null", ())
            .with("bool", false)
            .with("short", -3i16)
            .with("ushort", 3u16)
            .with("int", i32::MIN)
            .with("uint", u32::MAX)
            .with("long", i64::MIN)
            .with("ulong", u64::MAX)
            .with("llong", Value::LLong(-9))
            .with("ullong", Value::ULLong(9))
            .with("float", 1.25f32)
            .with("double", std::f64::consts::PI)
            .with("string", "hello world")
            .with("bytes", vec![0u8, 1, 255, b'[', b'{'])
            .with("container", nested)
            .with("array", vec![Value::Int(1), Value::from("two"), Value::Null]);

        let bytes = TextCodec.serialize(&doc).unwrap();
        let decoded = TextCodec.deserialize(&bytes).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_decode_tolerates_single_braces_and_whitespace() {
        let input = b"  @header = { [3,src]; [5,msg]; } ;\n@data={ [k, 4 ,42]; [s,12, padded ]; }";
        let doc = decode(input).unwrap();
        assert_eq!(doc.header.source_id, "src");
        assert_eq!(doc.header.message_type, "msg");
        assert_eq!(doc.get("k").map(|v| &v.value), Some(&Value::Int(42)));
        // string payloads are verbatim
        assert_eq!(doc.get("s").map(|v| &v.value), Some(&Value::from(" padded ")));
    }

    #[test]
    fn test_names_and_header_values_keep_surrounding_spaces() {
        let mut doc = Document::new();
        doc.header.message_type = "order".into();
        doc.header.source_id = " node ".into();
        doc.header.target_sub_id = "\tsub".into();
        doc.push(NamedValue::new(" padded ", 1i32));
        doc.push(NamedValue::new("trailing ", "x"));

        let decoded = TextCodec.deserialize(&TextCodec.serialize(&doc).unwrap()).unwrap();
        assert_eq!(decoded, doc);
        assert!(decoded.get("padded").is_none());

        let entries = index_entries(&TextCodec.serialize(&doc).unwrap()).unwrap();
        assert_eq!(entries[0].name.len(), " padded ".len());
    }

    #[test]
    fn test_decode_data_only() {
        let doc = decode(b"@data={{[x,6,5];}};").unwrap();
        assert_eq!(doc.header, Header::default());
        assert_eq!(doc.get("x").map(|v| &v.value), Some(&Value::Long(5)));
    }

    #[test]
    fn test_decode_bool_accepts_one() {
        let doc = decode(b"@data={{[a,1,1];[b,1,0];[c,1,true];}};").unwrap();
        let bools: Vec<Value> = doc.values.into_iter().map(|v| v.value).collect();
        assert_eq!(
            bools,
            vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)]
        );
    }

    #[test]
    fn test_decode_errors() {
        for input in [
            &b""[..],
            b"garbage",
            b"@header={{[5,x];",
            b"@data={{[a,99,1];}};",
            b"@data={{[a,4,notanumber];}};",
            b"@data={{[a,4,1]}};",
            b"@data={{}};trailing",
        ] {
            let err = decode(input).unwrap_err();
            assert_eq!(err.code(), 201, "input {:?}", String::from_utf8_lossy(input));
        }
    }

    // ====================================================================
    // Index
    // ====================================================================

    #[test]
    fn test_index_entries_point_into_buffer() {
        let bytes = b"@header={{[5,data_container];}};@data={{[name,12,Alice];[age,4,30];}};";
        let entries = index_entries(bytes).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(&bytes[entries[0].name.clone()], b"name");
        assert_eq!(&bytes[entries[0].value.clone()], b"Alice");
        assert_eq!(entries[1].kind, ValueKind::Int);
        assert_eq!(&bytes[entries[1].value.clone()], b"30");
    }

    #[test]
    fn test_parse_header_ignores_data() {
        let header = parse_header(b"@header={{[5,event];[6,2.0];}};@data={{[broken").unwrap();
        assert_eq!(header.message_type, "event");
        assert_eq!(header.version, "2.0");
    }

    #[test]
    fn test_nesting_depth_limit() {
        let err = decode_value(ValueKind::Container, b"", MAX_NESTING_DEPTH + 1).unwrap_err();
        assert!(err.to_string().contains("nested deeper"));

        let two_deep = Document::new().with("child", Document::new().with("leaf", 1i32));
        let outer = Document::new().with("c", two_deep);
        let decoded = TextCodec.deserialize(&TextCodec.serialize(&outer).unwrap()).unwrap();
        assert_eq!(decoded, outer);
    }
}
