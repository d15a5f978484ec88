//! Atomic JSON file writes.
//!
//! The document is written to a `.tmp-*.json` file beside its destination,
//! synced, and renamed into place. A reader of the final path sees either the
//! previous file or the complete new one.

use crate::Result;
use camino::Utf8Path;
use ohno::IntoAppError;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use tempfile::{Builder, NamedTempFile};

const LOG_TARGET: &str = "    writer";

/// Write `data` as two-space indented JSON.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Utf8Path, data: &T) -> Result<()> {
    write_atomic(path, |out| serde_json::to_writer_pretty(out, data))
}

/// Write `data` as compact JSON.
pub fn write_json_compact<T: Serialize + ?Sized>(path: &Utf8Path, data: &T) -> Result<()> {
    write_atomic(path, |out| serde_json::to_writer(out, data))
}

fn write_atomic<F>(path: &Utf8Path, encode: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> serde_json::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(dir).into_app_err_with(|| format!("mkdir {dir}"))?;

    let mut tmp = Builder::new()
        .prefix(".tmp-")
        .suffix(".json")
        .tempfile_in(dir)
        .into_app_err_with(|| format!("create temp for {path}"))?;

    {
        let mut out = BufWriter::new(&mut tmp);
        encode(&mut out).into_app_err_with(|| format!("encode json {path}"))?;
        out.write_all(b"\n").into_app_err_with(|| format!("encode json {path}"))?;
        out.flush().into_app_err_with(|| format!("encode json {path}"))?;
    }

    tmp.as_file()
        .sync_all()
        .into_app_err_with(|| format!("sync temp {}", tmp.path().display()))?;

    if let Err(first) = tmp.persist(path) {
        // the directory may have been removed underneath us; recreate it once
        log::debug!(target: LOG_TARGET, "rename to '{path}' failed ({}), retrying", first.error);
        fs::create_dir_all(dir).into_app_err_with(|| format!("mkdir {dir}"))?;
        let _ = first.file.persist(path).map_err(|e| e.error).into_app_err_with(|| format!("rename {path}"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use serde_json::{Value, json};

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    fn leftovers(dir: &Utf8Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".tmp-"))
            .collect()
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_pretty_creates_parents_and_indents() {
        let (_guard, root) = temp_root();
        let path = root.join("api/leaderboard/season/index.json");

        write_json_pretty(&path, &json!({"data": [1], "href": "<a>&"})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"data\": [\n    1\n  ]"), "{text}");
        // no HTML escaping
        assert!(text.contains("\"<a>&\""));
        assert!(text.ends_with('\n'));
        assert!(leftovers(path.parent().unwrap()).is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_compact_overwrites() {
        let (_guard, root) = temp_root();
        let path = root.join("player/us/pagle/ook.json");

        write_json_compact(&path, &json!({"v": 1})).unwrap();
        write_json_compact(&path, &json!({"v": 2, "name": "Ook"})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\"name\":\"Ook\",\"v\":2}\n");
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["v"], 2);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_failed_encode_leaves_nothing_behind() {
        struct Broken;

        impl Serialize for Broken {
            fn serialize<S: serde::Serializer>(&self, _: S) -> core::result::Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("broken"))
            }
        }

        let (_guard, root) = temp_root();
        let path = root.join("broken.json");

        let err = write_json_pretty(&path, &Broken).unwrap_err();
        assert!(err.to_string().contains("encode json"), "{err}");
        assert!(!path.exists());
        assert!(leftovers(&root).is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_parent_is_a_file() {
        let (_guard, root) = temp_root();
        fs::write(root.join("blocker"), "x").unwrap();

        let err = write_json_pretty(&root.join("blocker/index.json"), &json!({})).unwrap_err();
        assert!(err.to_string().contains("mkdir"), "{err}");
    }
}
