//! Per-game question files.

use crate::error::TriviaResult;
use crate::types::Question;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

/// Directory of `<game>.json` files, each an array of questions.
#[derive(Debug, Clone)]
pub struct QuestionStore {
    dir: PathBuf,
}

impl QuestionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load every question file, in file name order.
    ///
    /// Unreadable files are renamed to `<file>.bak` and skipped.
    pub async fn load(&self) -> TriviaResult<Vec<Question>> {
        fs::create_dir_all(&self.dir).await?;

        let mut files = self.question_files().await?;
        files.sort();

        let mut questions = Vec::new();
        for path in files {
            let raw = fs::read(&path).await?;
            match serde_json::from_slice::<Vec<Question>>(&raw) {
                Ok(mut loaded) => {
                    debug!("Loaded {} questions from {:?}", loaded.len(), path);
                    questions.append(&mut loaded);
                }
                Err(e) => {
                    let backup = path.with_extension("json.bak");
                    match fs::rename(&path, &backup).await {
                        Ok(()) => error!(
                            "Question file {:?} is corrupt ({}); moved to {:?}",
                            path, e, backup
                        ),
                        Err(rename_err) => error!(
                            "Question file {:?} is corrupt ({}) and could not be moved to {:?} ({})",
                            path, e, backup, rename_err
                        ),
                    }
                }
            }
        }

        if questions.is_empty() {
            warn!("No trivia questions found in {:?}", self.dir);
        } else {
            info!("Loaded {} trivia questions", questions.len());
        }
        Ok(questions)
    }

    /// Write questions grouped by game, removing files for games that no
    /// longer have any questions.
    pub async fn save(&self, questions: &[Question]) -> TriviaResult<()> {
        fs::create_dir_all(&self.dir).await?;

        let mut by_game: BTreeMap<String, Vec<&Question>> = BTreeMap::new();
        for question in questions {
            by_game
                .entry(file_stem_for(&question.game))
                .or_default()
                .push(question);
        }

        for (stem, group) in &by_game {
            let path = self.dir.join(format!("{}.json", stem));
            let data = serde_json::to_vec_pretty(group)?;

            // Atomic write
            let temp_path = path.with_extension("tmp");
            fs::write(&temp_path, &data).await?;
            fs::rename(&temp_path, &path).await?;
        }

        for path in self.question_files().await? {
            let stale = path
                .file_stem()
                .map(|s| !by_game.contains_key(s.to_string_lossy().as_ref()))
                .unwrap_or(false);
            if stale {
                debug!("Removing empty question file {:?}", path);
                fs::remove_file(&path).await?;
            }
        }

        debug!(
            "Saved {} questions across {} games",
            questions.len(),
            by_game.len()
        );
        Ok(())
    }

    async fn question_files(&self) -> TriviaResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) && path.is_file() {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn file_stem_for(game: &str) -> String {
    let stem: String = game
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    if stem.is_empty() {
        "none".into()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<Question> {
        vec![
            Question::new("Celeste", 50, "Who climbs?", vec!["Madeline".into()]),
            Question::new("none", 10, "2+2?", vec!["4".into(), "four".into()]),
            Question::new("celeste", 20, "Who is Badeline?", vec!["part of her".into()]),
        ]
    }

    fn sorted(mut questions: Vec<Question>) -> Vec<Question> {
        questions.sort_by(|a, b| (&a.game, &a.text).cmp(&(&b.game, &b.text)));
        questions
    }

    #[tokio::test]
    async fn test_save_and_reload_is_equal() {
        let temp_dir = TempDir::new().unwrap();
        let store = QuestionStore::new(temp_dir.path());

        tokio_test::assert_ok!(store.save(&sample()).await);
        let loaded = store.load().await.unwrap();

        assert_eq!(sorted(loaded), sorted(sample()));
    }

    #[tokio::test]
    async fn test_grouped_by_lowercased_game() {
        let temp_dir = TempDir::new().unwrap();
        let store = QuestionStore::new(temp_dir.path());

        store.save(&sample()).await.unwrap();

        let celeste: Vec<Question> = serde_json::from_slice(
            &std::fs::read(temp_dir.path().join("celeste.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(celeste.len(), 2);
        assert!(temp_dir.path().join("none.json").exists());
    }

    #[tokio::test]
    async fn test_stale_game_file_removed() {
        let temp_dir = TempDir::new().unwrap();
        let store = QuestionStore::new(temp_dir.path());

        store.save(&sample()).await.unwrap();
        let remaining: Vec<Question> = sample()
            .into_iter()
            .filter(|q| q.game == "none")
            .collect();
        store.save(&remaining).await.unwrap();

        assert!(!temp_dir.path().join("celeste.json").exists());
        assert_eq!(store.load().await.unwrap(), remaining);
    }

    #[tokio::test]
    async fn test_corrupt_file_moved_aside() {
        let temp_dir = TempDir::new().unwrap();
        let store = QuestionStore::new(temp_dir.path());
        store.save(&sample()[1..2]).await.unwrap();
        std::fs::write(temp_dir.path().join("broken.json"), b"[{").unwrap();

        let loaded = store.load().await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert!(temp_dir.path().join("broken.json.bak").exists());
        assert!(!temp_dir.path().join("broken.json").exists());
    }

    #[tokio::test]
    async fn test_missing_dir_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let store = QuestionStore::new(temp_dir.path().join("questions"));

        assert!(store.load().await.unwrap().is_empty());
        assert!(store.dir().exists());
    }

    #[test]
    fn test_file_stem_sanitised() {
        assert_eq!(file_stem_for("Half-Life 2: Episode One"), "half-life 2_ episode one");
        assert_eq!(file_stem_for("  "), "none");
        assert_eq!(file_stem_for("a/b"), "a_b");
    }
}
