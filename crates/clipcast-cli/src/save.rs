//! Output-path generation for finished recordings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Gif,
    Screenshot,
}

impl MediaKind {
    fn extension(&self) -> &'static str {
        match self {
            Self::Video => "mp4",
            Self::Gif => "gif",
            Self::Screenshot => "png",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Video | Self::Gif => "Clip",
            Self::Screenshot => "Screenshot",
        }
    }
}

/// Build a timestamped, collision-free path like
/// `Clip 2026-08-28 at 14.30.05.mp4` inside `dir` (created if missing).
pub fn output_path(dir: Option<&Path>, kind: MediaKind) -> Result<PathBuf> {
    let dir = dir.unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    let stamp = chrono::Local::now().format("%Y-%m-%d at %H.%M.%S");
    let base = format!("{} {stamp}", kind.label());
    let ext = kind.extension();

    let mut candidate = dir.join(format!("{base}.{ext}"));
    let mut n = 2u32;
    while candidate.exists() {
        candidate = dir.join(format!("{base} ({n}).{ext}"));
        n += 1;
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_kind_extension() {
        let dir = std::env::temp_dir().join("clipcast_save_ext_test");
        let video = output_path(Some(&dir), MediaKind::Video).unwrap();
        let gif = output_path(Some(&dir), MediaKind::Gif).unwrap();
        let shot = output_path(Some(&dir), MediaKind::Screenshot).unwrap();
        assert_eq!(video.extension().unwrap(), "mp4");
        assert_eq!(gif.extension().unwrap(), "gif");
        assert_eq!(shot.extension().unwrap(), "png");
        assert!(shot.file_name().unwrap().to_string_lossy().starts_with("Screenshot "));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn avoids_existing_files() {
        let dir = std::env::temp_dir().join("clipcast_save_collision_test");
        let first = output_path(Some(&dir), MediaKind::Gif).unwrap();
        std::fs::write(&first, b"x").unwrap();
        let second = output_path(Some(&dir), MediaKind::Gif).unwrap();
        assert_ne!(first, second);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
