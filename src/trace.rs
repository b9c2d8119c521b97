use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    pub fn from_store_flag(is_store: bool) -> Self {
        if is_store {
            AccessKind::Write
        } else {
            AccessKind::Read
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Read => write!(f, "R"),
            AccessKind::Write => write!(f, "W"),
        }
    }
}

/// One memory access as recorded by the tracer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub address: u64,
    pub client_id: usize, // cpu index of the issuing core
    pub kind: AccessKind,
}

/// Same layout as the input: hex address, hex cpu index, store flag.
impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = u8::from(self.kind == AccessKind::Write);
        write!(f, "{:x} {:x} {store}", self.address, self.client_id)
    }
}

#[derive(Debug, Clone)]
pub struct TraceFile {
    pub name: String,
    pub entries: Vec<TraceRecord>,
}

impl TraceFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Unable to open trace file {}", path.display()))?;
        let name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(name, file)
            .with_context(|| format!("Failed to parse trace file {}", path.display()))
    }

    /// Parses `<hex address> <hex cpu index> <store flag>` records, one per line.
    pub fn parse(name: impl Into<String>, input: impl Read) -> Result<Self> {
        let reader = BufReader::new(input);
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read line from trace")?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut parts = trimmed.split_whitespace();
            let addr = parts
                .next()
                .with_context(|| format!("Trace line {} missing address", idx + 1))?;
            let cpu = parts
                .next()
                .with_context(|| format!("Trace line {} missing cpu index", idx + 1))?;
            let store = parts
                .next()
                .with_context(|| format!("Trace line {} missing store flag", idx + 1))?;
            if parts.next().is_some() {
                bail!("Trace line {} has extra tokens", idx + 1);
            }
            let address = parse_hex(addr).with_context(|| {
                format!("Trace line {}: invalid address literal '{}'", idx + 1, addr)
            })?;
            let client_id = parse_hex(cpu).with_context(|| {
                format!("Trace line {}: invalid cpu index '{}'", idx + 1, cpu)
            })?;
            let is_store = match store {
                "0" | "false" => false,
                "1" | "true" => true,
                _ => bail!("Trace line {} has invalid store flag '{}'", idx + 1, store),
            };
            entries.push(TraceRecord {
                address,
                client_id: client_id as usize,
                kind: AccessKind::from_store_flag(is_store),
            });
        }
        Ok(Self {
            name: name.into(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the parsed records back out, one per line.
    pub fn dump(&self, mut out: impl Write) -> io::Result<()> {
        for record in &self.entries {
            writeln!(out, "{record}")?;
        }
        Ok(())
    }
}

fn parse_hex(token: &str) -> io::Result<u64> {
    let token = token.trim();
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u64::from_str_radix(digits, 16).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records() {
        let input = "# addr cpu store\n7f00a0 0 0\n\n0x7f00c8 1 1\nff 1a 0\n";
        let trace = TraceFile::parse("inline", input.as_bytes()).unwrap();
        assert_eq!(trace.len(), 3);
        assert_eq!(
            trace.entries[0],
            TraceRecord {
                address: 0x7f00a0,
                client_id: 0,
                kind: AccessKind::Read
            }
        );
        assert_eq!(trace.entries[1].kind, AccessKind::Write);
        assert_eq!(trace.entries[1].address, 0x7f00c8);
        assert_eq!(trace.entries[2].client_id, 0x1a);
    }

    #[test]
    fn reports_bad_lines() {
        let err = TraceFile::parse("bad", "10 0 0\nzz 0 0\n".as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("Trace line 2"));
        assert!(TraceFile::parse("bad", "10 0\n".as_bytes()).is_err());
        assert!(TraceFile::parse("bad", "10 0 2\n".as_bytes()).is_err());
        assert!(TraceFile::parse("bad", "10 0 0 0\n".as_bytes()).is_err());
    }

    #[test]
    fn dump_normalises_records() {
        let input = "# header\n0x7F00A0 0 false\n\n  ff   1a 1\n";
        let trace = TraceFile::parse("inline", input.as_bytes()).unwrap();
        let mut out = Vec::new();
        trace.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "7f00a0 0 0\nff 1a 1\n");

        let reparsed = TraceFile::parse("again", text.as_bytes()).unwrap();
        assert_eq!(reparsed.entries, trace.entries);
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1000 0 0").unwrap();
        writeln!(file, "1040 2 1").unwrap();
        let trace = TraceFile::load(file.path()).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.entries[1].client_id, 2);
        assert!(!trace.name.is_empty());

        assert!(TraceFile::load(file.path().with_extension("missing")).is_err());
    }
}
