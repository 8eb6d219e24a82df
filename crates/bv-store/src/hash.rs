//! Streaming SHA-256 content digests.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

const CHUNK_SIZE: usize = 64 * 1024;

/// Hex SHA-256 of everything `reader` yields, read in 64 KiB chunks.
pub fn digest<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn digest_file(path: &Path) -> io::Result<String> {
    digest(File::open(path)?)
}

#[must_use]
pub fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Writer adapter that hashes and counts bytes as they pass through.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Copy `reader` through in 64 KiB chunks.
    pub fn copy_from<R: Read>(&mut self, mut reader: R) -> io::Result<u64> {
        let mut buf = [0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let read = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            self.write_all(&buf[..read])?;
            total += read as u64;
        }
        Ok(total)
    }

    /// Returns the inner writer, the hex digest and the byte count.
    pub fn finish(self) -> (W, String, u64) {
        (self.inner, hex::encode(self.hasher.finalize()), self.written)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn digests_known_values() -> io::Result<()> {
        assert_eq!(digest(Cursor::new(Vec::new()))?, EMPTY_SHA256);
        assert_eq!(
            digest(Cursor::new(b"abc".to_vec()))?,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        Ok(())
    }

    #[test]
    fn streaming_matches_one_shot_across_chunk_boundaries() -> io::Result<()> {
        let payload: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        assert_eq!(digest(Cursor::new(payload.clone()))?, digest_bytes(&payload));
        Ok(())
    }

    #[test]
    fn hashing_writer_tracks_size_and_digest() -> io::Result<()> {
        let payload = vec![7u8; CHUNK_SIZE + 5];
        let mut writer = HashingWriter::new(Vec::new());
        let copied = writer.copy_from(Cursor::new(payload.clone()))?;
        let (inner, hash, written) = writer.finish();
        assert_eq!(copied, payload.len() as u64);
        assert_eq!(written, payload.len() as u64);
        assert_eq!(inner, payload);
        assert_eq!(hash, digest_bytes(&payload));
        Ok(())
    }

    #[test]
    fn digest_file_reads_from_disk() -> io::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("blob.bin");
        std::fs::write(&path, b"PK\x03\x04 fake jar")?;
        assert_eq!(digest_file(&path)?, digest_bytes(b"PK\x03\x04 fake jar"));
        Ok(())
    }
}
