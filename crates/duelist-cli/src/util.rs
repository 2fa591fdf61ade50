use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Serialize;

/// Where a subcommand writes a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JsonTarget {
    Stdout,
    File(PathBuf),
}

impl JsonTarget {
    /// `-` selects stdout; anything else is a file path.
    pub(crate) fn from_arg(path: &Path) -> Self {
        if path.as_os_str() == "-" {
            Self::Stdout
        } else {
            Self::File(path.to_owned())
        }
    }

    /// Writes `value` pretty-printed with a trailing newline.
    ///
    /// Files are written to a sibling `.tmp` file first and renamed into place, so readers
    /// never see a partial document.
    pub(crate) fn write<T>(&self, value: &T) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        match self {
            Self::Stdout => {
                write_pretty(io::stdout().lock(), value).context("Failed to write JSON to stdout")
            }
            Self::File(path) => {
                let mut tmp = OsString::from(path.as_os_str());
                tmp.push(".tmp");
                let tmp = PathBuf::from(tmp);
                let file = File::create(&tmp)
                    .with_context(|| format!("Failed to create output file: {}", tmp.display()))?;
                let mut writer = BufWriter::new(file);
                write_pretty(&mut writer, value)
                    .with_context(|| format!("Failed to write JSON to {}", tmp.display()))?;
                writer
                    .into_inner()
                    .map_err(io::IntoInnerError::into_error)
                    .and_then(|file| file.sync_all())
                    .with_context(|| format!("Failed to sync {}", tmp.display()))?;
                fs::rename(&tmp, path)
                    .with_context(|| format!("Failed to move output into {}", path.display()))
            }
        }
    }
}

fn write_pretty<W, T>(mut writer: W, value: &T) -> io::Result<()>
where
    W: Write,
    T: Serialize,
{
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dash_selects_stdout() {
        assert_eq!(JsonTarget::from_arg(Path::new("-")), JsonTarget::Stdout);
        assert_eq!(
            JsonTarget::from_arg(Path::new("out/-.json")),
            JsonTarget::File(PathBuf::from("out/-.json"))
        );
    }

    #[test]
    fn test_file_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "stale").unwrap();
        let target = JsonTarget::File(path.clone());
        target.write(&serde_json::json!({"fitness": 1.5})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["fitness"], 1.5);
        assert!(!dir.path().join("out.json.tmp").exists());
    }

    #[test]
    fn test_missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/out.json");
        let err = JsonTarget::File(path).write(&1).unwrap_err();
        assert!(err.to_string().contains("out.json.tmp"));
    }
}
