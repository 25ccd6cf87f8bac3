// --- JSON document persistence ---

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufReader, Write},
    path::Path,
};

use fs4::fs_std::FileExt;
use serde::Serialize;
use tempfile::NamedTempFile; // For atomic writes
use tracing::{debug, warn};

use crate::{error::TodoError, model::Task};

/// How the document looked when it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// No document yet; start empty.
    Missing,
    Loaded,
    /// Some records could not be read and were dropped; the rest loaded.
    Partial { skipped: usize },
    /// Unreadable or not a task list. Treated as empty; the next save replaces it.
    Corrupt,
}

#[derive(Debug)]
pub struct Loaded {
    pub tasks: Vec<Task>,
    pub status: LoadStatus,
}

impl Loaded {
    fn empty(status: LoadStatus) -> Self {
        Self {
            tasks: Vec::new(),
            status,
        }
    }
}

/// Read the task list at `path`. Never fails: a missing or broken document
/// yields an empty list, and `status` tells the caller which case it was.
pub fn load(path: impl AsRef<Path>) -> Loaded {
    let path = path.as_ref();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no todo file yet");
            return Loaded::empty(LoadStatus::Missing);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot open todo file, starting empty");
            return Loaded::empty(LoadStatus::Corrupt);
        }
    };

    match read_locked(&file) {
        Ok(records) => {
            let total = records.len();
            let tasks: Vec<Task> = records
                .into_iter()
                .enumerate()
                .filter_map(|(index, record)| match serde_json::from_value::<Task>(record) {
                    Ok(task) => Some(task),
                    Err(e) => {
                        warn!(path = %path.display(), index, error = %e, "skipping unreadable task");
                        None
                    }
                })
                .collect();
            debug!(path = %path.display(), count = tasks.len(), "loaded tasks");

            let skipped = total - tasks.len();
            let status = if skipped == 0 {
                LoadStatus::Loaded
            } else {
                LoadStatus::Partial { skipped }
            };
            Loaded { tasks, status }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "todo file is corrupt, starting empty");
            Loaded::empty(LoadStatus::Corrupt)
        }
    }
}

/// Replace the document at `path` with the full task list.
pub fn save(path: impl AsRef<Path>, tasks: &[Task]) -> Result<(), TodoError> {
    let path = path.as_ref();
    atomic_write(path, tasks).map_err(|e| TodoError::persistence(path, e))?;
    debug!(path = %path.display(), count = tasks.len(), "saved tasks");
    Ok(())
}

/// Parse the top-level array while holding a shared lock; released when
/// `file` drops. Records are decoded one by one by the caller.
fn read_locked(file: &File) -> io::Result<Vec<serde_json::Value>> {
    file.lock_shared()?;
    let records = serde_json::from_reader(BufReader::new(file))?;
    Ok(records)
}

/// Write `value` as pretty JSON next to `path`, then rename it into place, so
/// the document is either the old or the new content.
fn atomic_write<T>(path: &Path, value: &T) -> io::Result<()>
where
    T: Serialize + ?Sized,
{
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    // Readers of the old document finish before it is replaced.
    let _guard = lock_existing(path)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    tmp.persist(path)?;
    Ok(())
}

fn lock_existing(path: &Path) -> io::Result<Option<File>> {
    match OpenOptions::new().read(true).open(path) {
        Ok(file) => {
            file.lock_exclusive()?;
            Ok(Some(file))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, TaskEdit};

    fn sample() -> Vec<Task> {
        let mut done = Task::builder()
            .text("Pay rent")
            .priority(Priority::High)
            .category("work")
            .build(2);
        done.mark_done();
        vec![Task::builder().text("Buy milk").build(1), done]
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load(dir.path().join("todos.json"));
        assert_eq!(loaded.status, LoadStatus::Missing);
        assert!(loaded.tasks.is_empty());
    }

    #[test]
    fn corrupt_file_is_empty_and_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        fs::write(&path, "{ not json").unwrap();
        let loaded = load(&path);
        assert_eq!(loaded.status, LoadStatus::Corrupt);
        assert!(loaded.tasks.is_empty());
    }

    #[test]
    fn wrong_shape_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        fs::write(&path, r#"{"tasks": []}"#).unwrap();
        assert_eq!(load(&path).status, LoadStatus::Corrupt);
    }

    #[test]
    fn null_fields_do_not_lose_other_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        fs::write(
            &path,
            r#"[
  {"id": 1, "task": "Buy milk", "priority": "medium", "category": "general",
   "created_at": "2024-01-15T09:30:00", "completed": false, "completed_at": null},
  {"id": 2, "task": "Pay rent", "priority": "urgent", "category": null,
   "created_at": "2024-01-16T09:30:00", "completed": null, "completed_at": null}
]"#,
        )
        .unwrap();

        let loaded = load(&path);
        assert_eq!(loaded.status, LoadStatus::Loaded);
        let texts: Vec<&str> = loaded.tasks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Buy milk", "Pay rent"]);
        assert_eq!(loaded.tasks[1].category, "general");
        assert_eq!(loaded.tasks[1].priority, Priority::Medium);
    }

    #[test]
    fn bad_record_is_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        fs::write(
            &path,
            r#"[
  {"id": 1, "task": "Buy milk", "created_at": "2024-01-15T09:30:00"},
  {"id": 2, "task": "Pay rent", "created_at": "yesterday"},
  "not a task",
  {"id": 4, "task": "Call mum", "created_at": "2024-01-17T09:30:00"}
]"#,
        )
        .unwrap();

        let loaded = load(&path);
        assert_eq!(loaded.status, LoadStatus::Partial { skipped: 2 });
        let ids: Vec<u64> = loaded.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        let mut tasks = sample();
        // stale completion time survives a round trip too
        tasks[1].apply(TaskEdit {
            completed: Some(false),
            ..Default::default()
        });

        save(&path, &tasks).unwrap();
        let loaded = load(&path);
        assert_eq!(loaded.status, LoadStatus::Loaded);
        assert_eq!(loaded.tasks, tasks);
    }

    #[test]
    fn saving_empty_list_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        save(&path, &sample()).unwrap();
        save(&path, &[]).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!([]));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("todos.json");
        save(&path, &sample()).unwrap();
        assert_eq!(load(&path).tasks.len(), 2);
    }

    #[test]
    fn unwritable_location_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let err = save(blocker.join("todos.json"), &sample()).unwrap_err();
        assert!(matches!(err, TodoError::Persistence { .. }));
    }

    #[test]
    fn loads_documents_written_by_older_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        fs::write(
            &path,
            r#"[
  {
    "id": 1,
    "task": "Buy milk",
    "priority": "medium",
    "category": "general",
    "created_at": "2024-01-15T09:30:00.000001",
    "completed": false,
    "completed_at": null
  }
]"#,
        )
        .unwrap();
        let loaded = load(&path);
        assert_eq!(loaded.status, LoadStatus::Loaded);
        assert_eq!(loaded.tasks[0].text, "Buy milk");
    }
}
