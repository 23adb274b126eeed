//! Heuristic classification of an on-disk library: DXVK build or vendor
//! original. Used to gate deletions when no backup tells us what a file is.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Pluggable "is this file the translation layer" strategy, so the engine
/// can be tested with a deterministic stand-in.
pub trait LayerSniffer {
    fn looks_like_translation_layer(&self, path: &Path) -> bool;
}

/// How much of the file prefix is scanned. Larger windows catch markers the
/// linker placed past the headers.
const SCAN_WINDOW: usize = 4096;

/// Anything smaller cannot be a real library; refuse to classify it.
const MIN_FILE_LEN: usize = 100;

/// Byte sequences that only show up in DXVK builds: the project name, the
/// upstream author handle, and Vulkan entry points the layer resolves.
const MARKERS: &[&[u8]] = &[
    b"dxvk",
    b"doitsujin",
    b"vkcreateinstance",
    b"vkcreatedevice",
    b"vkgetinstanceprocaddr",
];

/// Default sniffer: case-insensitive marker scan over a bounded prefix.
///
/// A single marker hit classifies the file as DXVK. No hit, an unreadable
/// file, or a file under [`MIN_FILE_LEN`] bytes classifies it as "not the
/// layer": an ambiguous file is kept, never deleted. Renamed or stripped
/// builds can therefore slip through as false negatives, which is accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerSniffer;

impl LayerSniffer for MarkerSniffer {
    fn looks_like_translation_layer(&self, path: &Path) -> bool {
        let Ok(mut file) = File::open(path) else {
            return false;
        };
        let mut buffer = vec![0u8; SCAN_WINDOW];
        let mut filled = 0;
        while filled < buffer.len() {
            match file.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(_) => return false,
            }
        }
        if filled < MIN_FILE_LEN {
            return false;
        }
        buffer.truncate(filled);
        buffer.make_ascii_lowercase();
        MARKERS
            .iter()
            .any(|marker| find_subsequence(&buffer, marker))
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn padded(body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; 256];
        bytes[64..64 + body.len()].copy_from_slice(body);
        bytes
    }

    #[test]
    fn recognizes_project_marker_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d3d11.dll");
        fs::write(&path, padded(b"built from DXVK sources")).unwrap();
        assert!(MarkerSniffer.looks_like_translation_layer(&path));
    }

    #[test]
    fn recognizes_vulkan_entry_point_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dxgi.dll");
        fs::write(&path, padded(b"vkCreateInstance")).unwrap();
        assert!(MarkerSniffer.looks_like_translation_layer(&path));
    }

    #[test]
    fn markerless_file_is_not_the_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d3d9.dll");
        fs::write(&path, padded(b"Microsoft Corporation")).unwrap();
        assert!(!MarkerSniffer.looks_like_translation_layer(&path));
    }

    #[test]
    fn tiny_and_missing_files_are_not_the_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stub.dll");
        fs::write(&path, b"dxvk").unwrap(); // marker present but under the size floor
        assert!(!MarkerSniffer.looks_like_translation_layer(&path));
        assert!(!MarkerSniffer.looks_like_translation_layer(&dir.path().join("absent.dll")));
    }
}
