//! # Media Type Sniffing
//!
//! Classifies content by inspecting its leading bytes. Declared filenames and
//! headers are never consulted.
use std::io::SeekFrom;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Number of leading bytes inspected when sniffing a stream.
pub const SNIFF_LEN: u64 = 8 * 1024;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";

struct Signature {
    media_type: &'static str,
    extension: &'static str,
    matches: fn(&[u8]) -> bool,
}

const SIGNATURES: &[Signature] = &[
    Signature {
        media_type: "image/png",
        extension: "png",
        matches: |d| d.starts_with(b"\x89PNG\r\n\x1a\n"),
    },
    Signature {
        media_type: "image/jpeg",
        extension: "jpg",
        matches: |d| d.starts_with(b"\xff\xd8\xff"),
    },
    Signature {
        media_type: "image/gif",
        extension: "gif",
        matches: |d| d.starts_with(b"GIF87a") || d.starts_with(b"GIF89a"),
    },
    Signature {
        media_type: "image/webp",
        extension: "webp",
        matches: |d| riff_form(d, b"WEBP"),
    },
    Signature {
        media_type: "image/bmp",
        extension: "bmp",
        matches: is_bmp,
    },
    Signature {
        media_type: "image/tiff",
        extension: "tif",
        matches: |d| d.starts_with(b"II*\x00") || d.starts_with(b"MM\x00*"),
    },
    Signature {
        media_type: "image/vnd.microsoft.icon",
        extension: "ico",
        matches: |d| d.starts_with(b"\x00\x00\x01\x00"),
    },
    Signature {
        media_type: "application/pdf",
        extension: "pdf",
        matches: |d| d.starts_with(b"%PDF-"),
    },
    Signature {
        media_type: "application/zip",
        extension: "zip",
        matches: |d| {
            d.starts_with(b"PK\x03\x04") || d.starts_with(b"PK\x05\x06") || d.starts_with(b"PK\x07\x08")
        },
    },
    Signature {
        media_type: "application/gzip",
        extension: "gz",
        matches: |d| d.starts_with(b"\x1f\x8b"),
    },
    Signature {
        media_type: "application/x-7z-compressed",
        extension: "7z",
        matches: |d| d.starts_with(b"7z\xbc\xaf\x27\x1c"),
    },
    Signature {
        media_type: "application/x-rar-compressed",
        extension: "rar",
        matches: |d| d.starts_with(b"Rar!\x1a\x07"),
    },
    Signature {
        media_type: "application/x-executable",
        extension: "elf",
        matches: |d| d.starts_with(b"\x7fELF"),
    },
    Signature {
        media_type: "application/x-msdownload",
        extension: "exe",
        matches: is_pe,
    },
    Signature {
        media_type: "application/wasm",
        extension: "wasm",
        matches: |d| d.starts_with(b"\x00asm"),
    },
    Signature {
        media_type: "application/vnd.sqlite3",
        extension: "sqlite",
        matches: |d| d.starts_with(b"SQLite format 3\x00"),
    },
    Signature {
        media_type: "audio/mpeg",
        extension: "mp3",
        matches: |d| d.starts_with(b"ID3") || (d.len() >= 2 && d[0] == 0xff && d[1] & 0xe0 == 0xe0),
    },
    Signature {
        media_type: "audio/wav",
        extension: "wav",
        matches: |d| riff_form(d, b"WAVE"),
    },
    Signature {
        media_type: "audio/ogg",
        extension: "ogg",
        matches: |d| d.starts_with(b"OggS"),
    },
    Signature {
        media_type: "audio/flac",
        extension: "flac",
        matches: |d| d.starts_with(b"fLaC"),
    },
    Signature {
        media_type: "video/mp4",
        extension: "mp4",
        matches: |d| d.len() >= 12 && &d[4..8] == b"ftyp",
    },
];

/// Markup recognized at the start of textual content, compared ignoring
/// ASCII case and leading whitespace.
const MARKUP: &[(&[u8], &str, &str)] = &[
    (b"<svg", "image/svg+xml", "svg"),
    (b"<!doctype html", "text/html", "html"),
    (b"<html", "text/html", "html"),
    (b"<?xml", "application/xml", "xml"),
];

fn riff_form(data: &[u8], form: &[u8; 4]) -> bool {
    data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == form
}

fn le_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// `BM`, zeroed reserved words, and a known DIB header size.
fn is_bmp(data: &[u8]) -> bool {
    data.starts_with(b"BM")
        && le_u32(data, 6) == Some(0)
        && matches!(le_u32(data, 14), Some(12 | 40 | 52 | 56 | 108 | 124))
}

/// DOS stub whose `e_lfanew` points at a `PE\0\0` header inside the prefix.
fn is_pe(data: &[u8]) -> bool {
    if !data.starts_with(b"MZ") {
        return false;
    }
    le_u32(data, 0x3c)
        .and_then(|offset| usize::try_from(offset).ok())
        .and_then(|offset| data.get(offset..offset.checked_add(4)?))
        .is_some_and(|header| header == b"PE\0\0")
}

fn is_text(data: &[u8]) -> bool {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        // the prefix may cut a multi-byte character in half
        Err(err) if err.error_len().is_none() => {
            std::str::from_utf8(&data[..err.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => return false,
    };
    !text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\x0c'))
}

fn markup(data: &[u8]) -> Option<&'static str> {
    let start = data.iter().position(|b| !b.is_ascii_whitespace())?;
    let data = &data[start..];
    MARKUP.iter().find_map(|(prefix, media_type, _)| {
        (data.len() >= prefix.len() && data[..prefix.len()].eq_ignore_ascii_case(prefix))
            .then_some(*media_type)
    })
}

/// Detects the media type of the given content prefix.
#[must_use]
pub fn detect(data: &[u8]) -> &'static str {
    if data.is_empty() {
        return OCTET_STREAM;
    }
    if let Some(signature) = SIGNATURES.iter().find(|s| (s.matches)(data)) {
        return signature.media_type;
    }
    if is_text(data) {
        return markup(data).unwrap_or(TEXT_PLAIN);
    }
    OCTET_STREAM
}

/// Detects the media type of a re-readable stream.
///
/// At most [`SNIFF_LEN`] bytes are read from the current position, then the
/// stream is moved back to where it was, so the same bytes can be read again
/// by the upload.
///
/// # Errors
///
/// Returns an error when the stream cannot be read or repositioned.
pub async fn detect_reader<R>(reader: &mut R) -> std::io::Result<&'static str>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let mark = reader.stream_position().await?;
    let mut prefix = Vec::with_capacity(usize::try_from(SNIFF_LEN).unwrap_or(8192));
    let read = (&mut *reader).take(SNIFF_LEN).read_to_end(&mut prefix).await;
    reader.seek(SeekFrom::Start(mark)).await?;
    read?;
    Ok(detect(&prefix))
}

/// The canonical file extension of a media type, when known.
#[must_use]
pub fn extension_for(media_type: &str) -> Option<&'static str> {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    SIGNATURES
        .iter()
        .map(|s| (s.media_type, s.extension))
        .chain(MARKUP.iter().map(|(_, media_type, ext)| (*media_type, *ext)))
        .chain([(TEXT_PLAIN, "txt"), ("application/json", "json"), ("text/csv", "csv")])
        .find_map(|(candidate, ext)| (candidate == essence).then_some(ext))
}

/// Whether `media_type` starts with any of the allowed prefixes.
#[must_use]
pub fn is_allowed(media_type: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|prefix| media_type.starts_with(prefix.as_str()))
}
