//! Rendered file resource - whole-file content, compared byte-exact

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::path::{Path, PathBuf};

use super::Resource;
use crate::context::{ApplyContext, Host};
use crate::types::ProbeResult;

/// A file whose full content must equal `content`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub content: String,
}

impl RenderedFile {
    pub fn new(path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            content: content.into(),
        }
    }
}

/// First 8 hex characters of the blake3 digest, enough to tell contents apart
fn short_digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex()[..8].to_string()
}

impl Resource for RenderedFile {
    fn id(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn description(&self) -> String {
        format!("Render {}", self.path.display())
    }

    fn resource_type(&self) -> &'static str {
        "file"
    }

    fn probe(&self, host: &dyn Host) -> Result<ProbeResult> {
        let Some(current) = host.read_file(&self.path)? else {
            return Ok(ProbeResult::absent().with_details("missing"));
        };

        let desired = self.content.as_bytes();
        if current == desired {
            return Ok(ProbeResult::in_sync().with_details(short_digest(desired)));
        }

        let mut probe = ProbeResult::drifted().with_details(format!(
            "content differs ({} -> {})",
            short_digest(&current),
            short_digest(desired)
        ));

        if let Ok(text) = std::str::from_utf8(&current) {
            let path = self.path.display().to_string();
            let diff = TextDiff::from_lines(text, self.content.as_str())
                .unified_diff()
                .header(&path, &path)
                .to_string();
            probe = probe.with_diff(diff);
        }

        Ok(probe)
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<()> {
        ctx.privileged
            .write_file(&self.path, self.content.as_bytes())
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;

    const UNIT: &str = "[Unit]\nDescription=dnsR\n";

    #[test]
    fn test_missing_file_required() {
        let host = MemoryHost::new();
        let file = RenderedFile::new("/etc/systemd/system/dnsR.service", UNIT);
        let probe = file.probe(&host).unwrap();
        assert!(!probe.exists);
        assert!(file.is_required(&probe));
    }

    #[test]
    fn test_identical_content_not_required() {
        let host = MemoryHost::new().with_file("/etc/systemd/system/dnsR.service", UNIT);
        let file = RenderedFile::new("/etc/systemd/system/dnsR.service", UNIT);
        assert!(!file.is_required(&file.probe(&host).unwrap()));
    }

    #[test]
    fn test_trailing_newline_difference_is_drift() {
        let host = MemoryHost::new()
            .with_file("/etc/systemd/system/dnsR.service", UNIT.trim_end());
        let file = RenderedFile::new("/etc/systemd/system/dnsR.service", UNIT);
        let probe = file.probe(&host).unwrap();
        assert!(probe.exists);
        assert!(file.is_required(&probe));
        assert!(probe.details.unwrap().starts_with("content differs"));
    }

    #[test]
    fn test_drift_carries_unified_diff() {
        let host = MemoryHost::new().with_file(
            "/etc/systemd/system/dnsR.service",
            "[Unit]\nDescription=old\n",
        );
        let file = RenderedFile::new("/etc/systemd/system/dnsR.service", UNIT);
        let diff = file.probe(&host).unwrap().diff.unwrap();
        assert!(diff.contains("-Description=old"));
        assert!(diff.contains("+Description=dnsR"));
    }
}
