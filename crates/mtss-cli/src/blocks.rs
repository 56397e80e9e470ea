//! Message file handling: block splitting, reassembly, and output paths.
//!
//! Two file types are supported. A txt message blocks per line; an xml
//! message blocks per tag, with indentation stripped so that whitespace-only
//! formatting never counts as a modification.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

/// Supported message file types, chosen by extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    /// Plain text, one block per line.
    Txt,
    /// XML, one block per tag (or open-tag-with-text plus its close tag).
    Xml,
}

impl FileType {
    /// Determine the file type from a message path.
    ///
    /// # Errors
    ///
    /// Fails for any extension other than `txt` or `xml`.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("txt") => Ok(Self::Txt),
            Some("xml") => Ok(Self::Xml),
            _ => bail!(
                "unsupported message file type for {} (must be .txt or .xml)",
                path.display()
            ),
        }
    }
}

/// Split message content into signable blocks.
pub fn split_blocks(content: &str, file_type: FileType) -> Vec<String> {
    match file_type {
        FileType::Txt => content.split('\n').map(str::to_string).collect(),
        FileType::Xml => split_xml_blocks(content),
    }
}

/// Rebuild message content from blocks; the inverse of [`split_blocks`] for
/// txt, and the unindented form for xml.
pub fn rebuild_content(blocks: &[String], file_type: FileType) -> String {
    match file_type {
        FileType::Txt => blocks.join("\n"),
        FileType::Xml => blocks.concat(),
    }
}

/// One block per tag: an opening tag keeps its text content and absorbs the
/// immediately following closing tag, while consecutive closing tags stay
/// separate so nesting depth maps to block count.
fn split_xml_blocks(content: &str) -> Vec<String> {
    let flat: String = content.chars().filter(|&c| c != '\n' && c != '\t').collect();
    let tags: Vec<String> = flat
        .split('<')
        .filter(|part| !part.is_empty())
        .map(|part| format!("<{part}"))
        .collect();

    let mut blocks = Vec::with_capacity(tags.len());
    let mut index = 0;
    while index < tags.len() {
        let merge = !tags[index].starts_with("</")
            && tags.get(index + 1).is_some_and(|next| next.starts_with("</"));
        if merge {
            blocks.push(format!("{}{}", tags[index], tags[index + 1]).trim_end().to_string());
            index += 2;
        } else {
            blocks.push(tags[index].trim_end().to_string());
            index += 1;
        }
    }
    blocks
}

/// Where the signature bundle for a message is written:
/// `<stem>_signature.mts` next to the message.
pub fn signature_path(message: &Path) -> PathBuf {
    message.with_file_name(format!("{}_signature.mts", stem(message)))
}

/// Where a corrected message is written: `<stem>_corrected.<ext>` next to
/// the message.
pub fn correction_path(message: &Path) -> PathBuf {
    let extension = message
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    message.with_file_name(format!("{}_corrected.{extension}", stem(message)))
}

fn stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("message")
}
