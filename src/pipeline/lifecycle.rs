//! Screenshot locations and the moves between them.
//!
//! A screenshot starts in the pending directory and is renamed exactly once,
//! into either the processed or the failed directory. Files are never copied
//! or deleted.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::ScreenshotState;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to list pending screenshots in {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move {file} to {target}: {source}")]
    Move {
        file: String,
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Screenshot {file} cannot move to {to:?}")]
    InvalidTransition { file: String, to: ScreenshotState },

    #[error("Screenshot {file} already exists at {target}")]
    TargetExists { file: String, target: PathBuf },
}

impl LifecycleError {
    /// Errors that concern one screenshot rather than the directories.
    pub fn is_file_level(&self) -> bool {
        matches!(self, Self::TargetExists { .. })
    }
}

/// The three sibling directories a screenshot moves through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotLayout {
    pending: PathBuf,
    processed: PathBuf,
    failed: PathBuf,
}

impl ScreenshotLayout {
    pub fn new(pending: PathBuf, processed: PathBuf, failed: PathBuf) -> Self {
        Self {
            pending,
            processed,
            failed,
        }
    }

    /// `<root>/landing_area`, `<root>/processed`, `<root>/failed`.
    pub fn under(root: &Path) -> Self {
        Self::new(
            root.join("landing_area"),
            root.join("processed"),
            root.join("failed"),
        )
    }

    pub fn dir(&self, state: ScreenshotState) -> &Path {
        match state {
            ScreenshotState::Pending => &self.pending,
            ScreenshotState::Processed => &self.processed,
            ScreenshotState::Failed => &self.failed,
        }
    }

    pub fn path_of(&self, file_name: &str, state: ScreenshotState) -> PathBuf {
        self.dir(state).join(file_name)
    }

    pub fn ensure_dirs(&self) -> Result<(), LifecycleError> {
        for dir in [&self.pending, &self.processed, &self.failed] {
            std::fs::create_dir_all(dir).map_err(|source| LifecycleError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Snapshot of the pending directory: regular, non-hidden files sorted by
    /// name. Files arriving later are left for the next run.
    pub fn pending_files(&self) -> Result<Vec<String>, LifecycleError> {
        let list_err = |source: io::Error| LifecycleError::List {
            path: self.pending.clone(),
            source,
        };

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.pending).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            if !entry.file_type().map_err(list_err)?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Which directory currently holds `file_name`, if any.
    pub fn locate(&self, file_name: &str) -> Option<ScreenshotState> {
        [
            ScreenshotState::Pending,
            ScreenshotState::Processed,
            ScreenshotState::Failed,
        ]
        .into_iter()
        .find(|state| self.path_of(file_name, *state).is_file())
    }

    /// Fails when a screenshot of the same name already sits in a terminal
    /// directory, so processing it could not end in a move.
    pub fn ensure_unclaimed(&self, file_name: &str) -> Result<(), LifecycleError> {
        for state in [ScreenshotState::Processed, ScreenshotState::Failed] {
            let target = self.path_of(file_name, state);
            if target.exists() {
                return Err(LifecycleError::TargetExists {
                    file: file_name.to_string(),
                    target,
                });
            }
        }
        Ok(())
    }

    /// Move a pending screenshot to a terminal directory. Never replaces an
    /// existing file.
    pub fn transition(&self, file_name: &str, to: ScreenshotState) -> Result<PathBuf, LifecycleError> {
        if !to.is_terminal() {
            return Err(LifecycleError::InvalidTransition {
                file: file_name.to_string(),
                to,
            });
        }

        let source = self.path_of(file_name, ScreenshotState::Pending);
        let target = self.path_of(file_name, to);
        if target.exists() {
            return Err(LifecycleError::TargetExists {
                file: file_name.to_string(),
                target,
            });
        }
        std::fs::rename(&source, &target).map_err(|source| LifecycleError::Move {
            file: file_name.to_string(),
            target: target.clone(),
            source,
        })?;

        tracing::debug!(file = file_name, to = ?to, "Screenshot moved");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, ScreenshotLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = ScreenshotLayout::under(dir.path());
        layout.ensure_dirs().unwrap();
        (dir, layout)
    }

    fn touch(layout: &ScreenshotLayout, name: &str) {
        std::fs::write(layout.path_of(name, ScreenshotState::Pending), b"png").unwrap();
    }

    #[test]
    fn ensure_dirs_creates_all_three() {
        let (_dir, layout) = setup();
        for state in [
            ScreenshotState::Pending,
            ScreenshotState::Processed,
            ScreenshotState::Failed,
        ] {
            assert!(layout.dir(state).is_dir());
        }
    }

    #[test]
    fn pending_files_are_sorted_and_filtered() {
        let (_dir, layout) = setup();
        touch(&layout, "20240115-100000.png");
        touch(&layout, "20240115-090000.png");
        touch(&layout, ".DS_Store");
        std::fs::create_dir(layout.dir(ScreenshotState::Pending).join("nested")).unwrap();

        assert_eq!(
            layout.pending_files().unwrap(),
            vec!["20240115-090000.png", "20240115-100000.png"]
        );
    }

    #[test]
    fn listing_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ScreenshotLayout::under(&dir.path().join("nowhere"));
        assert!(matches!(
            layout.pending_files(),
            Err(LifecycleError::List { .. })
        ));
    }

    #[test]
    fn transition_moves_file() {
        let (_dir, layout) = setup();
        touch(&layout, "a.png");

        let target = layout.transition("a.png", ScreenshotState::Processed).unwrap();
        assert!(target.is_file());
        assert_eq!(layout.locate("a.png"), Some(ScreenshotState::Processed));
        assert!(layout.pending_files().unwrap().is_empty());
    }

    #[test]
    fn transition_back_to_pending_is_invalid() {
        let (_dir, layout) = setup();
        touch(&layout, "a.png");
        assert!(matches!(
            layout.transition("a.png", ScreenshotState::Pending),
            Err(LifecycleError::InvalidTransition { .. })
        ));
        assert_eq!(layout.locate("a.png"), Some(ScreenshotState::Pending));
    }

    #[test]
    fn transition_of_missing_file_fails() {
        let (_dir, layout) = setup();
        assert!(matches!(
            layout.transition("ghost.png", ScreenshotState::Failed),
            Err(LifecycleError::Move { .. })
        ));
    }

    #[test]
    fn transition_never_replaces_existing_file() {
        let (_dir, layout) = setup();
        std::fs::write(layout.path_of("a.png", ScreenshotState::Processed), b"OLD").unwrap();
        std::fs::write(layout.path_of("a.png", ScreenshotState::Pending), b"NEW").unwrap();

        let err = layout.transition("a.png", ScreenshotState::Processed).unwrap_err();

        assert!(matches!(err, LifecycleError::TargetExists { .. }));
        assert!(err.is_file_level());
        assert_eq!(
            std::fs::read(layout.path_of("a.png", ScreenshotState::Processed)).unwrap(),
            b"OLD"
        );
        assert_eq!(
            std::fs::read(layout.path_of("a.png", ScreenshotState::Pending)).unwrap(),
            b"NEW"
        );
    }

    #[test]
    fn ensure_unclaimed_checks_both_terminal_dirs() {
        let (_dir, layout) = setup();
        touch(&layout, "a.png");
        assert!(layout.ensure_unclaimed("a.png").is_ok());

        std::fs::write(layout.path_of("a.png", ScreenshotState::Failed), b"old").unwrap();
        assert!(matches!(
            layout.ensure_unclaimed("a.png"),
            Err(LifecycleError::TargetExists { .. })
        ));
    }

    #[test]
    fn locate_unknown_file_is_none() {
        let (_dir, layout) = setup();
        assert_eq!(layout.locate("ghost.png"), None);
    }
}
