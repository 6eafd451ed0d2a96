//! Device appending one line per message to a file.

use std::{
    any::Any,
    fs::{File, OpenOptions},
    io::{self, LineWriter, Write},
    path::{Path, PathBuf},
};

use log::warn;
use parking_lot::Mutex;

use crate::message::FemtoMessage;

use super::FemtoDeviceTrait;

/// Writes each message as a line to a file opened in append mode.
///
/// Write failures are logged and the message is lost. After `close` further
/// writes are ignored.
pub struct FemtoFileDevice {
    path: PathBuf,
    writer: Mutex<Option<LineWriter<File>>>,
}

impl FemtoFileDevice {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(Some(LineWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.writer.lock().is_none()
    }

    fn write_line(writer: &mut LineWriter<File>, message: &FemtoMessage) -> io::Result<()> {
        let text = message.to_text();
        writer.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl FemtoDeviceTrait for FemtoFileDevice {
    fn write(&self, message: FemtoMessage) {
        let mut guard = self.writer.lock();
        let Some(writer) = guard.as_mut() else {
            return;
        };
        if let Err(err) = Self::write_line(writer, &message) {
            warn!("FemtoFileDevice write to {} failed: {err}", self.path.display());
        }
    }

    fn close(&self) {
        if let Some(mut writer) = self.writer.lock().take()
            && let Err(err) = writer.flush()
        {
            warn!("FemtoFileDevice flush of {} failed: {err}", self.path.display());
        }
    }

    fn flush(&self) -> bool {
        match self.writer.lock().as_mut() {
            Some(writer) => writer.flush().is_ok(),
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for FemtoFileDevice {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for FemtoFileDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FemtoFileDevice")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}
