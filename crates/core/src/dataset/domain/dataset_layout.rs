use std::path::{Path, PathBuf};

/// Where one clip's artifacts live under the dataset root.
///
/// ```text
/// <root>/<clip>/faces/speaker{k}.mp4
/// <root>/<clip>/video_tracked{k}.mp4
/// <root>/<clip>/landmark/speaker{k}.json
/// <root>/<clip>/filename_input/<clip>.csv
/// ```
///
/// `k` is the 1-based speaker number; slot 0 is `speaker1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetLayout {
    clip_dir: PathBuf,
    clip: String,
}

impl DatasetLayout {
    pub fn new(root: &Path, clip: &str) -> Self {
        Self {
            clip_dir: root.join(clip),
            clip: clip.to_string(),
        }
    }

    pub fn clip_dir(&self) -> &Path {
        &self.clip_dir
    }

    pub fn clip(&self) -> &str {
        &self.clip
    }

    pub fn faces_dir(&self) -> PathBuf {
        self.clip_dir.join("faces")
    }

    pub fn landmark_dir(&self) -> PathBuf {
        self.clip_dir.join("landmark")
    }

    pub fn manifest_dir(&self) -> PathBuf {
        self.clip_dir.join("filename_input")
    }

    pub fn face_video(&self, slot: usize) -> PathBuf {
        self.faces_dir().join(format!("{}.mp4", speaker_label(slot)))
    }

    pub fn tracked_video(&self, slot: usize) -> PathBuf {
        self.clip_dir.join(format!("video_tracked{}.mp4", slot + 1))
    }

    pub fn landmark_file(&self, slot: usize) -> PathBuf {
        self.landmark_dir()
            .join(format!("{}.json", speaker_label(slot)))
    }

    pub fn manifest(&self) -> PathBuf {
        self.manifest_dir().join(format!("{}.csv", self.clip))
    }
}

pub fn speaker_label(slot: usize) -> String {
    format!("speaker{}", slot + 1)
}

/// One `speaker{k},0` line per slot.
pub fn manifest_contents(speakers: usize) -> String {
    (0..speakers)
        .map(|slot| format!("{},0\n", speaker_label(slot)))
        .collect()
}
