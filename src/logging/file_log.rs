use std::{fs::File, io::Write, path::Path, sync::Mutex};

use log::{LevelFilter, Log, Metadata, Record};

use osutils::files;

use super::LogEntry;

/// Writes log records to a file as JSON lines. Logging is disabled if the file cannot be
/// created.
pub struct FileLog {
    target: Option<Mutex<File>>,
}

/// The file always records debug details, whatever the console verbosity.
const FILE_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

impl FileLog {
    pub fn new(target: impl AsRef<Path>) -> Self {
        let file = match files::create_file_mode(target.as_ref(), 0o600) {
            Ok(f) => Some(Mutex::new(f)),
            Err(err) => {
                eprintln!(
                    "Logging setup error: failed to create log file '{}': {err:?}",
                    target.as_ref().display()
                );
                None
            }
        };

        Self { target: file }
    }

    pub fn into_logger(self) -> Box<dyn Log> {
        Box::new(self)
    }

    /// Best effort attempt to write the log entry to the file
    fn write_entry(&self, record: &Record) -> Result<(), Box<dyn std::error::Error + '_>> {
        if let Some(file) = self.target.as_ref() {
            let mut serialized = serde_json::to_string(&LogEntry::from(record))?;
            serialized.push('\n');

            let mut file_lock = file.lock()?;
            file_lock.write_all(serialized.as_bytes())?;
        }

        Ok(())
    }
}

impl Log for FileLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.target.is_some() && metadata.level() <= FILE_LOG_LEVEL
    }

    fn log(&self, record: &Record) {
        let _ = self.write_entry(record);
    }

    fn flush(&self) {
        if let Some(Ok(mut file)) = self.target.as_ref().map(|f| f.lock()) {
            let _ = file.flush();
        }
    }
}
