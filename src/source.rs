//! Raw access to kernel-exposed status files.
//!
//! `StatSource` owns the file layout (where `/proc`, `os-release` and the
//! account database live, plus the key strings looked up in them) and offers
//! the small set of best-effort parsing primitives the rest of the crate is
//! built on. Every read opens, consumes and drops its file handle within the
//! call; a file that cannot be opened yields the type's default value.

use once_cell::sync::Lazy;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Fallback tick rate when `sysconf` gives no usable answer.
pub const DEFAULT_TICKS_PER_SECOND: u64 = 100;

static CLOCK_TICKS: Lazy<u64> = Lazy::new(|| {
    // SAFETY: sysconf has no preconditions and _SC_CLK_TCK is always valid.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as u64
    } else {
        DEFAULT_TICKS_PER_SECOND
    }
});

/// Kernel clock ticks per second (`USER_HZ`) for this machine.
pub fn clock_ticks_per_second() -> u64 {
    *CLOCK_TICKS
}

/// Keys looked up in the keyed status files.
#[derive(Debug, Clone)]
pub struct StatKeys {
    pub pretty_name: &'static str,
    pub mem_total: &'static str,
    pub mem_free: &'static str,
    pub buffers: &'static str,
    pub cached: &'static str,
    pub total_processes: &'static str,
    pub running_processes: &'static str,
    pub uid: &'static str,
    pub resident_memory: &'static str,
}

impl Default for StatKeys {
    fn default() -> Self {
        Self {
            pretty_name: "PRETTY_NAME",
            mem_total: "MemTotal",
            mem_free: "MemFree",
            buffers: "Buffers",
            cached: "Cached",
            total_processes: "processes",
            running_processes: "procs_running",
            uid: "Uid",
            // VmRSS is physical memory; VmSize would include all mapped virtual memory
            resident_memory: "VmRSS",
        }
    }
}

/// Immutable description of where the monitored statistics live.
#[derive(Debug, Clone)]
pub struct SourceLayout {
    pub proc_root: PathBuf,
    pub os_release: PathBuf,
    pub passwd: PathBuf,
    pub ticks_per_second: u64,
    pub keys: StatKeys,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            os_release: PathBuf::from("/etc/os-release"),
            passwd: PathBuf::from("/etc/passwd"),
            ticks_per_second: clock_ticks_per_second(),
            keys: StatKeys::default(),
        }
    }
}

impl SourceLayout {
    /// Layout mirroring the canonical one below `root` (`root/proc`,
    /// `root/etc/os-release`, `root/etc/passwd`).
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            proc_root: root.join("proc"),
            os_release: root.join("etc").join("os-release"),
            passwd: root.join("etc").join("passwd"),
            ..Self::default()
        }
    }

    pub fn with_ticks_per_second(mut self, ticks: u64) -> Self {
        self.ticks_per_second = ticks.max(1);
        self
    }
}

/// Best-effort reader over a [`SourceLayout`].
#[derive(Debug, Clone, Default)]
pub struct StatSource {
    layout: SourceLayout,
}

impl StatSource {
    pub fn new(layout: SourceLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    pub fn keys(&self) -> &StatKeys {
        &self.layout.keys
    }

    pub fn ticks_per_second(&self) -> u64 {
        self.layout.ticks_per_second
    }

    /// Path of a system-wide file below the process namespace, e.g. `stat`.
    pub fn proc_file(&self, name: &str) -> PathBuf {
        self.layout.proc_root.join(name)
    }

    /// Path of a per-process file, e.g. `/proc/<pid>/status`.
    pub fn pid_file(&self, pid: u32, name: &str) -> PathBuf {
        self.layout.proc_root.join(pid.to_string()).join(name)
    }

    /// Returns the value of the first `key value` pair whose key matches.
    ///
    /// `:`, `=` and `"` are treated as whitespace so `Key: value`,
    /// `KEY="value"` and `key value` lines scan identically. Several pairs
    /// may share a line. Missing file, missing key and unparsable value all
    /// yield `T::default()`.
    pub fn read_keyed_value<T>(&self, key: &str, path: &Path) -> T
    where
        T: FromStr + Default,
    {
        let Some(content) = read_to_string_lossy(path) else {
            return T::default();
        };

        for line in content.lines() {
            let normalized = normalize_separators(line);
            let mut tokens = normalized.split_whitespace();
            while let (Some(k), Some(v)) = (tokens.next(), tokens.next()) {
                if k == key {
                    return v.parse().unwrap_or_default();
                }
            }
        }
        T::default()
    }

    /// Parses the first whitespace-delimited token of the first line.
    pub fn read_first_value<T>(&self, path: &Path) -> T
    where
        T: FromStr + Default,
    {
        self.read_first_line(path)
            .split_whitespace()
            .next()
            .and_then(|token| token.parse().ok())
            .unwrap_or_default()
    }

    /// Tokenizes the first line after skipping `skip_prefix_chars` leading
    /// characters (used to drop the `cpu` label of `/proc/stat`).
    pub fn read_token_sequence(&self, path: &Path, skip_prefix_chars: usize) -> Vec<String> {
        let line = self.read_first_line(path);
        let rest = match line.char_indices().nth(skip_prefix_chars) {
            Some((offset, _)) => &line[offset..],
            None => "",
        };
        rest.split_whitespace().map(str::to_string).collect()
    }

    /// First line of a file without its terminator, decoded lossily.
    /// Embedded NUL bytes are preserved.
    pub fn read_first_line(&self, path: &Path) -> String {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                debug!("Failed to open {}: {}", path.display(), e);
                return String::new();
            }
        };

        let mut buf = Vec::new();
        if let Err(e) = BufReader::new(file).read_until(b'\n', &mut buf) {
            debug!("Failed to read {}: {}", path.display(), e);
            return String::new();
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Lists subdirectories of `dir` whose names are purely decimal digits,
    /// sorted ascending. Anything else is skipped silently.
    pub fn enumerate_numeric_entries(&self, dir: &Path) -> Vec<u32> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Failed to list {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut out: Vec<u32> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_str()?;
                if !is_numeric_string(name) {
                    return None;
                }
                name.parse().ok()
            })
            .collect();
        out.sort_unstable();
        out
    }

    /// Live process identifiers in the process namespace.
    pub fn pids(&self) -> Vec<u32> {
        self.enumerate_numeric_entries(&self.layout.proc_root)
    }
}

/// True iff `s` is non-empty and every character is an ASCII digit.
pub fn is_numeric_string(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Replaces tokenization-hostile separators with spaces.
pub fn normalize_separators(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            ':' | '=' | '"' => ' ',
            other => other,
        })
        .collect()
}

/// Whole file decoded lossily; invalid UTF-8 becomes U+FFFD instead of
/// failing the read.
pub(crate) fn read_to_string_lossy(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            debug!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_is_numeric_string() {
        assert!(is_numeric_string("123"));
        assert!(is_numeric_string("0"));
        assert!(!is_numeric_string(""));
        assert!(!is_numeric_string("12a"));
        assert!(!is_numeric_string("-1"));
        assert!(!is_numeric_string("1.5"));
    }

    #[test]
    fn test_keyed_value_meminfo_shape() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "meminfo",
            "MemTotal:       16384000 kB\nMemFree:         8192000 kB\nBuffers:          102400 kB\n",
        );
        let source = StatSource::default();

        assert_eq!(source.read_keyed_value::<u64>("MemTotal", &path), 16384000);
        assert_eq!(source.read_keyed_value::<u64>("Buffers", &path), 102400);
        assert_eq!(source.read_keyed_value::<f64>("MemFree", &path), 8192000.0);
    }

    #[test]
    fn test_keyed_value_missing_key_or_file_is_default() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "status", "Name:\tbash\nUid:\t1000\t1000\t1000\t1000\n");
        let source = StatSource::default();

        assert_eq!(source.read_keyed_value::<u64>("VmRSS", &path), 0);
        assert_eq!(source.read_keyed_value::<String>("VmRSS", &path), "");
        assert_eq!(
            source.read_keyed_value::<u64>("Uid", &dir.path().join("missing")),
            0
        );
    }

    #[test]
    fn test_keyed_value_unparsable_value_is_default() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "status", "VmRSS: lots kB\n");
        let source = StatSource::default();

        assert_eq!(source.read_keyed_value::<u64>("VmRSS", &path), 0);
    }

    #[test]
    fn test_keyed_value_normalizes_assignment_and_quotes() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "os-release", "NAME=\"Debian\"\nID=debian\n");
        let source = StatSource::default();

        assert_eq!(source.read_keyed_value::<String>("NAME", &path), "Debian");
        assert_eq!(source.read_keyed_value::<String>("ID", &path), "debian");
    }

    #[test]
    fn test_keyed_value_several_pairs_per_line() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "pairs", "alpha 1 beta 2 gamma 3\n");
        let source = StatSource::default();

        assert_eq!(source.read_keyed_value::<i32>("gamma", &path), 3);
    }

    #[test]
    fn test_keyed_value_survives_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status");
        fs::write(
            &path,
            b"Name:\tw\xffrk\nUid:\t1000\t1000\t1000\t1000\nVmRSS:\t204800 kB\n",
        )
        .unwrap();
        let source = StatSource::default();

        assert_eq!(source.read_keyed_value::<u32>("Uid", &path), 1000);
        assert_eq!(source.read_keyed_value::<u64>("VmRSS", &path), 204800);
        assert_eq!(
            source.read_keyed_value::<String>("Name", &path),
            "w\u{fffd}rk"
        );
    }

    #[test]
    fn test_first_value() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "uptime", "35612.48 140021.11\n");
        let source = StatSource::default();

        assert!((source.read_first_value::<f64>(&path) - 35612.48).abs() < 1e-9);
        // an integer parse of a float token fails and falls back to zero
        assert_eq!(source.read_first_value::<u64>(&path), 0);
        assert_eq!(source.read_first_value::<f64>(&dir.path().join("nope")), 0.0);
    }

    #[test]
    fn test_token_sequence_skips_prefix() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "stat",
            "cpu  100 0 50 200 10 0 0 0 0 0\ncpu0 50 0 25 100 5 0 0 0 0 0\n",
        );
        let source = StatSource::default();

        let tokens = source.read_token_sequence(&path, 3);
        assert_eq!(tokens.len(), 10);
        assert_eq!(tokens[0], "100");
        assert_eq!(tokens[3], "200");

        assert!(source.read_token_sequence(&path, 500).is_empty());
        assert!(source
            .read_token_sequence(&dir.path().join("missing"), 3)
            .is_empty());
    }

    #[test]
    fn test_first_line_keeps_nul_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cmdline");
        fs::write(&path, b"/usr/bin/sleep\x00100\x00").unwrap();
        let source = StatSource::default();

        assert_eq!(source.read_first_line(&path), "/usr/bin/sleep\u{0}100\u{0}");
    }

    #[test]
    fn test_enumerate_numeric_entries() {
        let dir = tempdir().unwrap();
        for name in ["1", "42", "abc", "7f"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        // numeric name but a plain file, not a process directory
        write(dir.path(), "99", "");
        let source = StatSource::default();

        assert_eq!(source.enumerate_numeric_entries(dir.path()), vec![1, 42]);
        assert!(source
            .enumerate_numeric_entries(&dir.path().join("missing"))
            .is_empty());
    }

    #[test]
    fn test_rooted_layout_paths() {
        let layout = SourceLayout::rooted_at(Path::new("/tmp/fixture")).with_ticks_per_second(0);
        assert_eq!(layout.proc_root, PathBuf::from("/tmp/fixture/proc"));
        assert_eq!(layout.passwd, PathBuf::from("/tmp/fixture/etc/passwd"));
        assert_eq!(layout.ticks_per_second, 1);

        let source = StatSource::new(layout);
        assert_eq!(
            source.pid_file(7, "stat"),
            PathBuf::from("/tmp/fixture/proc/7/stat")
        );
    }
}
