//! Media type classification for attachments
//!
//! A declared mime type wins; otherwise the bytes are matched against an
//! ordered signature table where the first match wins.

/// Content type used when nothing better is known
pub const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

/// File extension and content type of an attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub extension: String,
    pub content_type: String,
}

impl MediaType {
    fn new(extension: &str, content_type: &str) -> Self {
        Self {
            extension: extension.to_string(),
            content_type: content_type.to_string(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// How a signature recognises a payload
#[derive(Debug)]
enum Predicate {
    /// Payload starts with any of the prefixes
    Prefix(&'static [&'static [u8]]),
    /// RIFF container whose form type (bytes 8..12) matches
    Riff(&'static [u8; 4]),
    /// Payload starts with the prefix and spans more than one line
    MultilinePrefix(&'static [u8]),
    /// Payload is UTF-8 text that is printable or multi-line
    Utf8Text,
}

impl Predicate {
    fn matches(&self, bytes: &[u8]) -> bool {
        match self {
            Predicate::Prefix(prefixes) => prefixes.iter().any(|p| bytes.starts_with(p)),
            Predicate::Riff(form) => {
                bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(form.as_slice())
            }
            Predicate::MultilinePrefix(prefix) => {
                bytes.starts_with(prefix) && bytes.contains(&b'\n')
            }
            Predicate::Utf8Text => std::str::from_utf8(bytes)
                .map(|text| text.contains('\n') || text.chars().all(|c| !c.is_control()))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug)]
struct Signature {
    predicate: Predicate,
    extension: &'static str,
    content_type: &'static str,
}

const fn sig(predicate: Predicate, extension: &'static str, content_type: &'static str) -> Signature {
    Signature {
        predicate,
        extension,
        content_type,
    }
}

/// Ordered signature table; order matters (e.g. `# ` before `#`).
static SIGNATURES: &[Signature] = &[
    sig(Predicate::Prefix(&[b"\x89PNG\r\n\x1a\n"]), "png", "image/png"),
    sig(Predicate::Prefix(&[b"\xff\xd8\xff"]), "jpg", "image/jpeg"),
    sig(Predicate::Prefix(&[b"GIF87a", b"GIF89a"]), "gif", "image/gif"),
    sig(Predicate::Riff(b"WEBP"), "webp", "image/webp"),
    sig(Predicate::Prefix(&[b"%PDF"]), "pdf", "application/pdf"),
    sig(Predicate::Prefix(&[b"PK\x03\x04"]), "zip", "application/zip"),
    sig(
        Predicate::Prefix(&[b"#!/usr/bin/env python", b"#!python"]),
        "py",
        "text/x-python",
    ),
    sig(
        Predicate::Prefix(&[b"#!/bin/bash", b"#!/usr/bin/bash", b"#!/bin/sh"]),
        "sh",
        "text/x-sh",
    ),
    sig(Predicate::Prefix(&[b"@echo off", b"@echo on"]), "bat", "text/x-bat"),
    sig(
        Predicate::Prefix(&[b"#Requires", b"param(", b"function "]),
        "ps1",
        "text/x-powershell",
    ),
    sig(Predicate::Prefix(&[b"<?xml"]), "xml", "application/xml"),
    sig(Predicate::Prefix(&[b"{", b"["]), "json", "application/json"),
    sig(Predicate::Prefix(&[b"<!DOCTYPE", b"<html"]), "html", "text/html"),
    sig(Predicate::Prefix(&[b"/*", b"@import"]), "css", "text/css"),
    sig(
        Predicate::Prefix(&[b"function", b"var ", b"const "]),
        "js",
        "application/javascript",
    ),
    sig(Predicate::MultilinePrefix(b"---"), "yml", "text/x-yaml"),
    sig(Predicate::MultilinePrefix(b"# "), "md", "text/x-markdown"),
    sig(Predicate::MultilinePrefix(b"#"), "txt", "text/plain"),
    sig(Predicate::Utf8Text, "txt", "text/plain"),
];

/// Classify raw bytes by signature
pub fn sniff(bytes: &[u8]) -> MediaType {
    SIGNATURES
        .iter()
        .find(|s| !bytes.is_empty() && s.predicate.matches(bytes))
        .map(|s| MediaType::new(s.extension, s.content_type))
        .unwrap_or_else(|| MediaType::new("bin", GENERIC_CONTENT_TYPE))
}

/// File extension for a declared mime type
pub fn extension_for_mime(mime: &str) -> String {
    let subtype = mime.split_once('/').map(|(_, sub)| sub).unwrap_or(mime);
    let ext = match subtype {
        "jpeg" => "jpg",
        "svg+xml" => "svg",
        "plain" => "txt",
        "python" | "x-python" => "py",
        "javascript" => "js",
        "x-icon" => "ico",
        "x-bat" => "bat",
        "x-sh" | "x-bash" => "sh",
        "x-powershell" => "ps1",
        "x-cmd" => "cmd",
        "x-zsh" => "zsh",
        "x-fish" => "fish",
        "x-yaml" => "yml",
        "x-toml" => "toml",
        "x-ini" => "ini",
        "x-config" => "conf",
        "x-log" => "log",
        "x-markdown" => "md",
        "x-rst" => "rst",
        "x-asciidoc" => "adoc",
        other => other,
    };
    let ext: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        .collect();
    let ext = ext.trim_matches('.');
    if ext.is_empty() {
        "bin".to_string()
    } else {
        ext.to_string()
    }
}

/// Resolve the media type of an attachment.
///
/// A specific declared mime is trusted; a missing or generic one falls back
/// to sniffing the bytes.
pub fn classify(bytes: &[u8], declared_mime: Option<&str>) -> MediaType {
    match declared_mime.map(str::trim) {
        Some(mime) if !mime.is_empty() && mime != GENERIC_CONTENT_TYPE => MediaType {
            extension: extension_for_mime(mime),
            content_type: mime.to_string(),
        },
        _ => sniff(bytes),
    }
}
