use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};

use super::Sink;

/// Buffers everything in an anonymous temp file and copies it to the
/// destination on finish. The destination sees no bytes before that.
pub(super) struct Spool<W: Write> {
    file: File,
    dest: W,
}

impl<W: Write> Spool<W> {
    pub fn new(dest: W) -> io::Result<Self> {
        Ok(Self {
            file: tempfile::tempfile()?,
            dest,
        })
    }
}

impl<W: Write> Write for Spool<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl<W: Write> Sink for Spool<W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let Spool { mut file, mut dest } = *self;
        file.seek(SeekFrom::Start(0))?;
        let copied = io::copy(&mut file, &mut dest)?;
        log::trace!("copied {copied} spooled bytes");
        dest.flush()
    }
}
