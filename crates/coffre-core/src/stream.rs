//! Stream encryption and decryption for data of unbounded length.
//!
//! A worker thread owns the caller-supplied source reader: it pulls one
//! chunk at a time (never two reads in flight), seals or opens it, and
//! hands the bytes to the consumer over a bounded channel. The consumer
//! pulls from the returned [`OutputStream`] through plain `std::io::Read`;
//! bytes arrive in exactly the order they were read from the source. A
//! dropped `OutputStream` unblocks and terminates the worker at its next
//! send.
//!
//! Every stream ends with a chunk shorter than [`STREAM_CHUNK_SIZE`],
//! empty when the plaintext length is a multiple of the chunk size. That
//! final short chunk is the authenticated end-of-stream marker: a
//! ciphertext that ends on a full-size chunk lost frames to truncation,
//! and decryption reports it instead of returning the shortened
//! plaintext.

use std::{
    io::{self, Read},
    thread,
};

use coffre_crypto::{
    ResourceId, ResourceKey, STREAM_SALT_SIZE, TAG_SIZE, derive_chunk_key, open_chunk,
    parse_stream_header, seal_chunk, stream_header,
};
use tokio::sync::mpsc;

use crate::{error::Error, rng, session::Session};

/// Plaintext bytes sealed per stream chunk.
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Bounded handoff between the worker and the consumer; keeps a slow
/// consumer from buffering the whole source in memory.
const CHANNEL_DEPTH: usize = 4;

/// Pull side of a stream encryption or decryption pipeline.
///
/// Returned by [`Session::stream_encrypt`], [`Session::stream_decrypt`],
/// and
/// [`EncryptionSession::stream_encrypt`](crate::EncryptionSession::stream_encrypt).
/// Reads return the next processed bytes and `Ok(0)` once the source is
/// exhausted.
pub struct OutputStream {
    rx: mpsc::Receiver<Result<Vec<u8>, Error>>,
    pending: Vec<u8>,
    pos: usize,
    finished: bool,
    resource_id: ResourceId,
}

impl OutputStream {
    /// The resource ID of the stream being produced or consumed.
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    pub(crate) fn spawn_encrypt<R>(key: ResourceKey, id: ResourceId, mut source: R) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let salt: [u8; STREAM_SALT_SIZE] = rng::random_array();
        let chunk_key = derive_chunk_key(&key, &salt);
        let header = stream_header(id, &salt);

        thread::spawn(move || {
            if tx.blocking_send(Ok(header.to_vec())).is_err() {
                return;
            }
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            let mut index = 0u64;
            loop {
                let filled = match read_full(&mut source, &mut buf) {
                    Ok(filled) => filled,
                    Err(err) => {
                        let _ = tx.blocking_send(Err(Error::from(err)));
                        return;
                    },
                };
                // A short (possibly empty) chunk marks the end of the
                // stream; every earlier chunk is exactly full-size
                let framed = seal_chunk(&chunk_key, &salt, index, &buf[..filled]);
                if tx.blocking_send(Ok(framed)).is_err() {
                    return;
                }
                if filled < STREAM_CHUNK_SIZE {
                    return;
                }
                index += 1;
            }
        });

        Self { rx, pending: Vec::new(), pos: 0, finished: false, resource_id: id }
    }

    pub(crate) fn spawn_decrypt<R>(
        key: &ResourceKey,
        id: ResourceId,
        salt: [u8; STREAM_SALT_SIZE],
        mut source: R,
    ) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let chunk_key = derive_chunk_key(key, &salt);

        thread::spawn(move || {
            let mut index = 0u64;
            let mut terminated = false;
            loop {
                let mut len_bytes = [0u8; 4];
                match read_exact_or_eof(&mut source, &mut len_bytes) {
                    Ok(false) => {
                        // End of input is only legal right after the final
                        // short chunk; anything else lost whole frames
                        if !terminated {
                            let _ = tx.blocking_send(Err(Error::DecryptionFailed(
                                "stream ended before its final chunk".to_string(),
                            )));
                        }
                        return;
                    },
                    Ok(true) => {
                        if terminated {
                            let _ = tx.blocking_send(Err(Error::DecryptionFailed(
                                "data found past the final chunk".to_string(),
                            )));
                            return;
                        }
                    },
                    Err(err) => {
                        let _ = tx.blocking_send(Err(Error::from(err)));
                        return;
                    },
                }
                let len = u32::from_be_bytes(len_bytes) as usize;
                if len < TAG_SIZE || len > STREAM_CHUNK_SIZE + TAG_SIZE {
                    let _ = tx.blocking_send(Err(Error::DecryptionFailed(format!(
                        "stream chunk length {len} out of range"
                    ))));
                    return;
                }
                let mut body = vec![0u8; len];
                if let Err(err) = source.read_exact(&mut body) {
                    let _ = tx.blocking_send(Err(Error::from(err)));
                    return;
                }
                match open_chunk(&chunk_key, &salt, index, &body) {
                    Ok(clear) => {
                        terminated = clear.len() < STREAM_CHUNK_SIZE;
                        if tx.blocking_send(Ok(clear)).is_err() {
                            return;
                        }
                    },
                    Err(err) => {
                        let _ = tx.blocking_send(Err(Error::from(err)));
                        return;
                    },
                }
                index += 1;
            }
        });

        Self { rx, pending: Vec::new(), pos: 0, finished: false, resource_id: id }
    }
}

impl Read for OutputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.pos < self.pending.len() {
                let take = buf.len().min(self.pending.len() - self.pos);
                buf[..take].copy_from_slice(&self.pending[self.pos..self.pos + take]);
                self.pos += take;
                return Ok(take);
            }
            if self.finished {
                return Ok(0);
            }
            match self.rx.blocking_recv() {
                Some(Ok(bytes)) => {
                    self.pending = bytes;
                    self.pos = 0;
                },
                Some(Err(err)) => {
                    self.finished = true;
                    return Err(err.into());
                },
                None => {
                    self.finished = true;
                    return Ok(0);
                },
            }
        }
    }
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("resource_id", &self.resource_id)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Encrypt a stream of unknown length without buffering it in memory.
    ///
    /// The sharing policy is registered once, up front, exactly as in
    /// [`Session::encrypt`]; the returned [`OutputStream`] then yields the
    /// stream-format ciphertext.
    ///
    /// # Errors
    ///
    /// Same contract as [`Session::encrypt`].
    pub fn stream_encrypt<R>(
        &self,
        clear_source: R,
        options: Option<&crate::EncryptionOptions>,
    ) -> Result<OutputStream, Error>
    where
        R: Read + Send + 'static,
    {
        let token = self.ready_token("stream_encrypt")?;

        let key = ResourceKey::from_bytes(rng::random_array());
        let resource_id = ResourceId::from_bytes(rng::random_array());
        let policy = options.map(crate::EncryptionOptions::to_policy).unwrap_or_default();

        self.backend()
            .publish_resource_key(
                token,
                crate::backend::ResourceGrant { resource_id, key: key.clone() },
                policy,
            )
            .wait()?;

        Ok(OutputStream::spawn_encrypt(key, resource_id, clear_source))
    }

    /// Decrypt a stream-format ciphertext without buffering it in memory.
    ///
    /// The stream header is read from `encrypted_source` on the calling
    /// thread to resolve the key grant; chunk decryption then proceeds on a
    /// worker.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] when the source is too short to carry a
    ///   stream header or is not stream-format
    /// - [`Error::DecryptionFailed`], [`Error::DeviceRevoked`] as for
    ///   [`Session::decrypt`]
    pub fn stream_decrypt<R>(&self, mut encrypted_source: R) -> Result<OutputStream, Error>
    where
        R: Read + Send + 'static,
    {
        let token = self.ready_token("stream_decrypt")?;

        let mut header = [0u8; coffre_crypto::STREAM_HEADER_SIZE];
        encrypted_source.read_exact(&mut header).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                Error::InvalidArgument("input too short for a stream header".to_string())
            } else {
                Error::from(err)
            }
        })?;
        let (resource_id, salt) = parse_stream_header(&header)?;

        let key = self.backend().fetch_resource_key(token, resource_id).wait()?;
        Ok(OutputStream::spawn_decrypt(&key, resource_id, salt, encrypted_source))
    }
}

/// Fill `buf` from `source`, looping over short reads; returns the number
/// of bytes read, short only at end of stream.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {},
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Like `read_exact`, but a clean end-of-stream before the first byte
/// returns `Ok(false)` instead of an error.
fn read_exact_or_eof<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a chunk frame",
                ));
            },
            Ok(read) => filled += read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {},
            Err(err) => return Err(err),
        }
    }
    Ok(true)
}
