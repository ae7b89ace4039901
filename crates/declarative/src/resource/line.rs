//! Line-in-file resource
//!
//! Append-only: the line is added when no line of the file equals it
//! exactly. Existing lines are never rewritten or deduplicated, so a stale
//! `DNS=` line stays next to a newly appended one.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::Resource;
use crate::context::{ApplyContext, Host};
use crate::types::ProbeResult;

/// A literal line that must be present in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLine {
    pub path: PathBuf,
    pub line: String,
}

impl FileLine {
    pub fn new(path: impl AsRef<Path>, line: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            line: line.into(),
        }
    }

    /// Only `\n` terminates a line; a trailing `\r` is part of the line
    fn contains_line(&self, content: &[u8]) -> bool {
        content
            .split(|b| *b == b'\n')
            .any(|l| l == self.line.as_bytes())
    }

    /// Bytes to append so the file ends with `line` on its own line
    fn append_bytes(&self, current: Option<&[u8]>) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.line.len() + 2);
        if let Some(current) = current
            && !current.is_empty()
            && !current.ends_with(b"\n")
        {
            bytes.push(b'\n');
        }
        bytes.extend_from_slice(self.line.as_bytes());
        bytes.push(b'\n');
        bytes
    }
}

impl Resource for FileLine {
    fn id(&self) -> String {
        format!("line:{}:{}", self.path.display(), self.line)
    }

    fn description(&self) -> String {
        format!("Ensure '{}' in {}", self.line, self.path.display())
    }

    fn resource_type(&self) -> &'static str {
        "line"
    }

    fn probe(&self, host: &dyn Host) -> Result<ProbeResult> {
        match host.read_file(&self.path)? {
            None => Ok(ProbeResult::absent().with_details("file missing")),
            Some(content) if self.contains_line(&content) => Ok(ProbeResult::in_sync()),
            Some(_) => Ok(ProbeResult::drifted().with_details("line missing")),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<()> {
        let current = ctx.host.read_file(&self.path)?;
        let bytes = self.append_bytes(current.as_deref());

        ctx.privileged
            .append_file(&self.path, &bytes)
            .with_context(|| format!("Failed to append to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;

    const CONF: &str = "/etc/systemd/resolved.conf.d/dnsR.conf";

    #[test]
    fn test_present_line_not_required() {
        let host = MemoryHost::new().with_file(CONF, "[Resolve]\nDNS=127.0.0.1:1053\n");
        let line = FileLine::new(CONF, "DNS=127.0.0.1:1053");
        assert!(!line.is_required(&line.probe(&host).unwrap()));
    }

    #[test]
    fn test_partial_match_is_not_presence() {
        let host = MemoryHost::new().with_file(CONF, "#DNS=127.0.0.1:1053\n");
        let line = FileLine::new(CONF, "DNS=127.0.0.1:1053");
        assert!(line.is_required(&line.probe(&host).unwrap()));
    }

    #[test]
    fn test_crlf_line_is_not_presence() {
        let host = MemoryHost::new().with_file(CONF, "[Resolve]\r\nDNS=127.0.0.1:1053\r\n");
        let line = FileLine::new(CONF, "DNS=127.0.0.1:1053");
        assert!(line.is_required(&line.probe(&host).unwrap()));

        let crlf = FileLine::new(CONF, "DNS=127.0.0.1:1053\r");
        assert!(!crlf.is_required(&crlf.probe(&host).unwrap()));
    }

    #[test]
    fn test_missing_file_required() {
        let host = MemoryHost::new();
        let line = FileLine::new(CONF, "[Resolve]");
        let probe = line.probe(&host).unwrap();
        assert!(!probe.exists);
        assert!(line.is_required(&probe));
    }

    #[test]
    fn test_append_bytes_adds_separator_when_unterminated() {
        let line = FileLine::new(CONF, "Domains=~example.");
        assert_eq!(line.append_bytes(None), b"Domains=~example.\n");
        assert_eq!(line.append_bytes(Some(b"")), b"Domains=~example.\n");
        assert_eq!(line.append_bytes(Some(b"[Resolve]\n")), b"Domains=~example.\n");
        assert_eq!(line.append_bytes(Some(b"[Resolve]")), b"\nDomains=~example.\n");
    }
}
