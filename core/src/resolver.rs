//! Maps a detected graphics-API description onto the set of runtime
//! libraries DXVK has to provide for it.

use std::sync::OnceLock;

use regex::Regex;

/// Conservative fallback covering the most common titles when detection
/// produced nothing usable.
pub const DEFAULT_LIBRARIES: &[&str] = &["d3d9.dll", "dxgi.dll", "d3d11.dll"];

/// Every library any DXVK build may ship, for the copy-everything policy.
pub const ALL_KNOWN_LIBRARIES: &[&str] = &[
    "d3d8.dll",
    "d3d9.dll",
    "d3d10.dll",
    "d3d10_1.dll",
    "d3d11.dll",
    "d3d12.dll",
    "dxgi.dll",
];

/// Resolves an API-version description (e.g. `"Direct3D 11"`, `"dx9"`,
/// `"11"`) to the ordered library set a patch must install.
///
/// Total: unrecognizable or absent input falls back to
/// [`DEFAULT_LIBRARIES`] rather than blocking the operation, since the
/// upstream detection heuristics are allowed to be wrong or missing.
pub fn resolve_required_libraries(api_version: &str) -> Vec<&'static str> {
    let description = api_version.trim().to_lowercase();
    if description.is_empty() || description == "unknown" {
        return DEFAULT_LIBRARIES.to_vec();
    }

    let major = extract_major_version(&description)
        .or_else(|| contained_major_version(&description));

    match major {
        Some(8) => vec!["d3d8.dll"],
        Some(9) => vec!["d3d9.dll", "dxgi.dll"],
        Some(10) => vec!["d3d10.dll", "d3d10_1.dll", "dxgi.dll"],
        Some(11) => vec!["d3d11.dll", "d3d10.dll", "d3d10_1.dll", "dxgi.dll"],
        Some(12) => vec![
            "d3d12.dll",
            "d3d11.dll",
            "d3d10.dll",
            "d3d10_1.dll",
            "dxgi.dll",
        ],
        _ => DEFAULT_LIBRARIES.to_vec(),
    }
}

fn version_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"direct3d\s*(\d+)", r"d3d\s*(\d+)", r"dx\s*(\d+)", r"(\d+)"]
            .iter()
            .map(|p| Regex::new(p).unwrap())
            .collect()
    })
}

/// First pattern that captures a number wins.
fn extract_major_version(description: &str) -> Option<u32> {
    version_patterns().iter().find_map(|pattern| {
        pattern
            .captures(description)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

/// Substring fallback when no numeric pattern applied. Two-digit versions
/// are checked first so `"11"` is not mistaken for a `1`-adjacent token.
fn contained_major_version(description: &str) -> Option<u32> {
    [("12", 12), ("11", 11), ("10", 10), ("9", 9), ("8", 8)]
        .iter()
        .find(|(token, _)| description.contains(token))
        .map(|(_, major)| *major)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_unknown_yield_default_set() {
        assert_eq!(resolve_required_libraries(""), DEFAULT_LIBRARIES);
        assert_eq!(resolve_required_libraries("   "), DEFAULT_LIBRARIES);
        assert_eq!(resolve_required_libraries("Unknown"), DEFAULT_LIBRARIES);
        assert_eq!(resolve_required_libraries("unknown"), DEFAULT_LIBRARIES);
    }

    #[test]
    fn recognizes_spelled_out_descriptions() {
        assert_eq!(
            resolve_required_libraries("Direct3D 11"),
            vec!["d3d11.dll", "d3d10.dll", "d3d10_1.dll", "dxgi.dll"]
        );
        assert_eq!(resolve_required_libraries("Direct3D 8"), vec!["d3d8.dll"]);
    }

    #[test]
    fn recognizes_short_forms_and_bare_numbers() {
        assert_eq!(
            resolve_required_libraries("d3d9"),
            vec!["d3d9.dll", "dxgi.dll"]
        );
        assert_eq!(
            resolve_required_libraries("DX12"),
            vec![
                "d3d12.dll",
                "d3d11.dll",
                "d3d10.dll",
                "d3d10_1.dll",
                "dxgi.dll"
            ]
        );
        assert_eq!(
            resolve_required_libraries("10"),
            vec!["d3d10.dll", "d3d10_1.dll", "dxgi.dll"]
        );
    }

    #[test]
    fn substring_fallback_prefers_two_digit_versions() {
        assert_eq!(contained_major_version("d3d12"), Some(12));
        assert_eq!(contained_major_version("something 10-ish"), Some(10));
        assert_eq!(contained_major_version("no version here"), None);
    }

    #[test]
    fn unresolvable_input_never_fails() {
        assert_eq!(resolve_required_libraries("Vulkan"), DEFAULT_LIBRARIES);
        assert_eq!(resolve_required_libraries("OpenGL"), DEFAULT_LIBRARIES);
    }

    #[test]
    fn unsupported_major_version_yields_default_set() {
        assert_eq!(resolve_required_libraries("d3d7"), DEFAULT_LIBRARIES);
    }
}
