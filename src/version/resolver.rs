use crate::config::VersionConfig;
use crate::error::{LocresError, Result};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 1024 * 1024;

/// Build identity read from the game executable, rendered as `branch-version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionIdentifier {
    pub branch: String,
    pub version: String,
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.branch, self.version)
    }
}

/// Finds the build-info block that follows a UTF-16LE marker in an executable.
///
/// The block is a run of NUL-separated UTF-16LE strings. Empty strings are
/// dropped and the remaining tokens are picked by position: the branch, the
/// version, and a dotted build string whose last component (without leading
/// zeros) is appended to the version.
pub struct VersionResolver {
    marker: Vec<u8>,
    window_bytes: usize,
    branch_token: usize,
    version_token: usize,
    build_token: usize,
    chunk_size: usize,
}

impl VersionResolver {
    pub fn new(config: &VersionConfig) -> Self {
        Self {
            marker: config
                .marker
                .encode_utf16()
                .flat_map(u16::to_le_bytes)
                .collect(),
            window_bytes: config.window_bytes,
            branch_token: config.branch_token,
            version_token: config.version_token,
            build_token: config.build_token,
            chunk_size: CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn resolve_file(&self, path: &Path) -> Result<VersionIdentifier> {
        let file = File::open(path)?;
        self.resolve_reader(
            BufReader::with_capacity(self.chunk_size, file),
            &path.display().to_string(),
        )
    }

    pub fn resolve_bytes(&self, bytes: &[u8]) -> Result<VersionIdentifier> {
        self.resolve_reader(bytes, "byte buffer")
    }

    pub fn resolve_reader<R: Read>(&self, reader: R, source_name: &str) -> Result<VersionIdentifier> {
        let window = self
            .find_window(reader)?
            .ok_or_else(|| LocresError::VersionNotFound {
                source_name: source_name.to_string(),
            })?;

        self.compose(&decode_tokens(&window))
    }

    /// Stream the input looking for the marker and return up to `window_bytes`
    /// bytes that follow it. Only one chunk plus a marker-sized tail is held
    /// in memory at a time.
    fn find_window<R: Read>(&self, mut reader: R) -> io::Result<Option<Vec<u8>>> {
        if self.marker.is_empty() {
            return Ok(None);
        }

        let keep = self.marker.len() - 1;
        let mut chunk = vec![0u8; self.chunk_size];
        let mut buffer: Vec<u8> = Vec::with_capacity(self.chunk_size + keep);

        loop {
            let read = read_some(&mut reader, &mut chunk)?;
            if read == 0 {
                return Ok(None);
            }
            buffer.extend_from_slice(&chunk[..read]);

            if let Some(position) = find(&buffer, &self.marker) {
                buffer.drain(..position + self.marker.len());

                while buffer.len() < self.window_bytes {
                    let read = read_some(&mut reader, &mut chunk)?;
                    if read == 0 {
                        break;
                    }
                    buffer.extend_from_slice(&chunk[..read]);
                }

                buffer.truncate(self.window_bytes);
                return Ok(Some(buffer));
            }

            if buffer.len() > keep {
                buffer.drain(..buffer.len() - keep);
            }
        }
    }

    fn compose(&self, tokens: &[String]) -> Result<VersionIdentifier> {
        let required = self
            .branch_token
            .max(self.version_token)
            .max(self.build_token)
            + 1;

        if tokens.len() < required {
            return Err(LocresError::MalformedVersionData {
                found: tokens.len(),
                required,
            });
        }

        let build = tokens[self.build_token]
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .trim_start_matches('0');

        Ok(VersionIdentifier {
            branch: tokens[self.branch_token].clone(),
            version: format!("{}-{}", tokens[self.version_token], build),
        })
    }
}

/// Decode UTF-16LE text, split on NUL and drop empty pieces. A trailing odd
/// byte is ignored.
fn decode_tokens(window: &[u8]) -> Vec<String> {
    let units = window
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));

    let text: String = char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();

    text.split('\0')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn read_some<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buffer) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use std::io::Write;

    pub(crate) fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    /// Executable-like bytes with the build-info block somewhere in the middle.
    pub(crate) fn fake_executable(tokens: &[&str]) -> Vec<u8> {
        let mut bytes = vec![0x4d, 0x5a, 0x90, 0x00];
        bytes.extend(std::iter::repeat(0xcc).take(4096));
        bytes.extend(utf16le("++Ares-Core+"));
        for token in tokens {
            bytes.extend(utf16le(token));
            bytes.extend([0, 0]);
        }
        bytes.extend(std::iter::repeat(0u8).take(256));
        bytes.extend(std::iter::repeat(0xcc).take(4096));
        bytes
    }

    fn resolver() -> VersionResolver {
        VersionResolver::new(&VersionConfig::default())
    }

    #[test]
    fn test_missing_marker() {
        let result = resolver().resolve_bytes(&[0xcc; 8192]);
        assert!(matches!(result, Err(LocresError::VersionNotFound { .. })));

        let result = resolver().resolve_bytes(&[]);
        assert!(matches!(result, Err(LocresError::VersionNotFound { .. })));
    }

    #[test]
    fn test_crafted_version_tokens() {
        let bytes = fake_executable(&["main", "1", "2", "3.045"]);
        let version = resolver().resolve_bytes(&bytes).unwrap();

        assert_eq!(version.branch, "main");
        assert_eq!(version.version, "1-45");
        assert_eq!(version.to_string(), "main-1-45");
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let mut bytes = utf16le("++Ares-Core+");
        bytes.extend(utf16le("\0\0release-08.11\0\0\0shipping\0\0x\0\0\04.0.0.0712\0"));
        let version = resolver().resolve_bytes(&bytes).unwrap();
        assert_eq!(version.to_string(), "release-08.11-shipping-712");
    }

    #[test]
    fn test_too_few_tokens() {
        let bytes = fake_executable(&["main", "1"]);
        match resolver().resolve_bytes(&bytes) {
            Err(LocresError::MalformedVersionData { found, required }) => {
                assert_eq!(found, 2);
                assert_eq!(required, 4);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_window_limits_tokens() {
        // 96 bytes cover 48 UTF-16 code units; the fourth token falls outside
        let long = "x".repeat(40);
        let bytes = fake_executable(&["main", &long, "2", "3.045"]);
        assert!(matches!(
            resolver().resolve_bytes(&bytes),
            Err(LocresError::MalformedVersionData { found: 3, .. })
        ));
    }

    #[test]
    fn test_marker_split_across_chunks() {
        let bytes = fake_executable(&["main", "1", "2", "3.045"]);
        for chunk_size in [1, 3, 7, 13, 4099, 4101] {
            let version = resolver()
                .with_chunk_size(chunk_size)
                .resolve_bytes(&bytes)
                .unwrap();
            assert_eq!(version.to_string(), "main-1-45", "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_window_truncated_at_end_of_input() {
        let mut bytes = utf16le("++Ares-Core+");
        bytes.extend(utf16le("main\01\02\03.100"));
        let version = resolver().resolve_bytes(&bytes).unwrap();
        assert_eq!(version.to_string(), "main-1-100");
    }

    #[test]
    fn test_build_without_dot_and_all_zero_suffix() {
        let bytes = fake_executable(&["main", "7", "2", "0500"]);
        assert_eq!(resolver().resolve_bytes(&bytes).unwrap().version, "7-500");

        let bytes = fake_executable(&["main", "7", "2", "3.000"]);
        assert_eq!(resolver().resolve_bytes(&bytes).unwrap().version, "7-");
    }

    #[test]
    fn test_custom_token_layout() {
        let config = VersionConfig {
            version_token: 2,
            ..VersionConfig::default()
        };
        let bytes = fake_executable(&["main", "1", "2", "3.045"]);
        let version = VersionResolver::new(&config).resolve_bytes(&bytes).unwrap();
        assert_eq!(version.to_string(), "main-2-45");
    }

    #[test]
    fn test_resolve_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&fake_executable(&["release-09.00", "shipping-4", "x", "9.0.0.0123"]))
            .unwrap();

        let version = resolver().resolve_file(file.path()).unwrap();
        assert_eq!(version.to_string(), "release-09.00-shipping-4-123");
        assert_eq!(
            resolver().resolve_file(file.path()).unwrap(),
            version,
            "resolution is deterministic"
        );
    }
}
