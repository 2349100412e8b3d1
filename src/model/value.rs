use std::sync::Arc;

/// Raw configuration payload: ordered text lines plus a content checksum.
///
/// Immutable once built. Cloning shares the line buffer. Two values are equal
/// iff their checksums match.
#[derive(Debug, Clone)]
pub struct ConfigValue {
    lines: Arc<[String]>,
    checksum: u32,
    /// Schema checksum of the definition the payload was produced for.
    /// Literal and file payloads are untagged.
    def_md5: Option<String>,
}

impl ConfigValue {
    pub fn new(lines: Vec<String>) -> Self {
        let checksum = content_checksum(&lines);
        Self {
            lines: lines.into(),
            checksum,
            def_md5: None,
        }
    }

    /// Splits `text` on line boundaries. A trailing newline does not produce an
    /// extra empty line.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines().map(str::to_string).collect())
    }

    pub fn with_def_md5(
        mut self,
        def_md5: impl Into<String>,
    ) -> Self {
        self.def_md5 = Some(def_md5.into());
        self
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn get_line(
        &self,
        index: usize,
    ) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Checksum rendered the way states carry it
    pub fn md5(&self) -> String {
        format!("{:08x}", self.checksum)
    }

    pub fn def_md5(&self) -> Option<&str> {
        self.def_md5.as_deref()
    }

    pub fn as_text(&self) -> String {
        self.lines.join("\n")
    }
}

impl PartialEq for ConfigValue {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.checksum == other.checksum
    }
}

impl Eq for ConfigValue {}

fn content_checksum(lines: &[String]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize()
}
