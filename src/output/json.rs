use crate::error::{LocresError, Result};
use encoding_rs::Encoding;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use std::io;

const INDENT: &[u8] = b"    ";

/// Text encoding of the written JSON file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Legacy(&'static Encoding),
}

impl OutputEncoding {
    /// Resolve a WHATWG encoding label such as `utf-8`, `utf-16le` or `windows-1252`.
    pub fn from_label(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            LocresError::Encoding {
                encoding: label.to_string(),
                message: "unknown encoding label".to_string(),
            }
        })?;

        Ok(if encoding == encoding_rs::UTF_8 {
            OutputEncoding::Utf8
        } else if encoding == encoding_rs::UTF_16LE {
            OutputEncoding::Utf16Le
        } else if encoding == encoding_rs::UTF_16BE {
            OutputEncoding::Utf16Be
        } else {
            OutputEncoding::Legacy(encoding)
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputEncoding::Utf8 => "UTF-8",
            OutputEncoding::Utf16Le => "UTF-16LE",
            OutputEncoding::Utf16Be => "UTF-16BE",
            OutputEncoding::Legacy(encoding) => encoding.name(),
        }
    }

    pub fn encode(&self, text: String) -> Result<Vec<u8>> {
        match self {
            OutputEncoding::Utf8 => Ok(text.into_bytes()),
            OutputEncoding::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            OutputEncoding::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            OutputEncoding::Legacy(encoding) => {
                let (bytes, _, had_unmappable) = encoding.encode(&text);
                if had_unmappable {
                    return Err(LocresError::Encoding {
                        encoding: encoding.name().to_string(),
                        message: "text contains characters the encoding cannot represent"
                            .to_string(),
                    });
                }
                Ok(bytes.into_owned())
            }
        }
    }
}

/// Serialize `value` as JSON indented with four spaces, optionally escaping
/// every non-ASCII character as `\uXXXX`.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T, ascii: bool) -> Result<String> {
    let mut buffer = Vec::new();
    if ascii {
        let mut serializer = Serializer::with_formatter(&mut buffer, AsciiFormatter::new());
        value.serialize(&mut serializer)?;
    } else {
        let mut serializer =
            Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(INDENT));
        value.serialize(&mut serializer)?;
    }

    String::from_utf8(buffer).map_err(|e| LocresError::Serialization {
        message: e.to_string(),
    })
}

/// Pretty formatter that escapes non-ASCII string content.
struct AsciiFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl<'a> AsciiFormatter<'a> {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(INDENT),
        }
    }
}

impl Formatter for AsciiFormatter<'_> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..index])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}
