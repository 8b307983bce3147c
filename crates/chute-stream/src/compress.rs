//! CompressingFile — transparent codec layer over a [`PacketFile`].
//!
//! Compression applies to the logical byte stream, not per chunk: the
//! encoder's output is chunked by the underlying file like any other
//! payload. The codec is negotiated through the stream-options side
//! channel — the first outgoing packet advertises it, and a reader that
//! expects compressed input refuses to guess: no advertised codec means
//! a hard `CodecUnavailable` error, never silent passthrough. A stream
//! that terminates before the codec's end marker fails the read the
//! same way — decoded bytes are never passed off as a complete payload.
//!
//! The raw `flate2::Compress`/`Decompress` state machines are driven
//! directly so one owner can serve both duplex directions without
//! handing the file to a wrapper type.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use std::io;

use chute_core::config::CompressionSettings;
use chute_core::{Codec, PayloadMetadata, StreamError, StreamOptions};

use crate::packet_file::PacketFile;
use crate::transport::Transport;

/// Scratch sizing for one codec pass. Output may exceed input for
/// incompressible data, so both sides get the same roomy bound.
const CODEC_BUF_BYTES: usize = 16 * 1024;

pub struct CompressingFile<T: Transport> {
    file: PacketFile<T>,

    // Encode side.
    encoder: Option<Compress>,
    enc_scratch: Vec<u8>,

    // Decode side. The decoder is created lazily on first read, once
    // the peer's stream options are known.
    decode_incoming: bool,
    decoder: Option<Decompress>,
    pending: Vec<u8>,
    decoded: Vec<u8>,
    in_buf: Vec<u8>,
    decode_done: bool,
    decode_failed: Option<String>,
}

impl<T: Transport> CompressingFile<T> {
    /// Wrap `file`. `outgoing` selects the codec for written data
    /// (`Codec::None` disables outgoing compression); `expect_compressed`
    /// declares that incoming data must arrive with a negotiated codec.
    pub fn new(file: PacketFile<T>, outgoing: Codec, expect_compressed: bool) -> Self {
        Self::with_level(file, outgoing, expect_compressed, Compression::default())
    }

    pub fn with_level(
        mut file: PacketFile<T>,
        outgoing: Codec,
        expect_compressed: bool,
        level: Compression,
    ) -> Self {
        let encoder = match outgoing {
            Codec::None => None,
            Codec::Zlib => {
                // Advertise before any byte moves so the first packet
                // carries the negotiation.
                file.set_stream_options(StreamOptions::with_codec(Codec::Zlib));
                Some(Compress::new(level, true))
            }
        };

        Self {
            file,
            encoder,
            enc_scratch: Vec::with_capacity(CODEC_BUF_BYTES),
            decode_incoming: expect_compressed,
            decoder: None,
            pending: Vec::new(),
            decoded: Vec::new(),
            in_buf: vec![0u8; CODEC_BUF_BYTES],
            decode_done: false,
            decode_failed: None,
        }
    }

    /// Construct from configuration: codec name and level come from the
    /// `[compression]` block.
    pub fn from_settings(
        file: PacketFile<T>,
        settings: &CompressionSettings,
        expect_compressed: bool,
    ) -> Result<Self, StreamError> {
        let codec = Codec::from_name(&settings.codec)
            .ok_or_else(|| StreamError::Codec(format!("unknown codec {:?}", settings.codec)))?;
        Ok(Self::with_level(
            file,
            codec,
            expect_compressed,
            Compression::new(settings.level),
        ))
    }

    // ── Writing ──────────────────────────────────────────────────────────────

    /// Write `buf` through the encoder (or straight through when no
    /// outgoing codec was selected).
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, StreamError> {
        let Some(enc) = self.encoder.as_mut() else {
            return self.file.write(buf);
        };
        let mut consumed = 0;
        while consumed < buf.len() {
            let before = enc.total_in();
            self.enc_scratch.clear();
            enc.compress_vec(&buf[consumed..], &mut self.enc_scratch, FlushCompress::None)
                .map_err(|e| StreamError::Codec(e.to_string()))?;
            let took = (enc.total_in() - before) as usize;
            consumed += took;

            if !self.enc_scratch.is_empty() {
                self.file.write(&self.enc_scratch)?;
            } else if took == 0 {
                // Neither input consumed nor output produced: the state
                // machine is wedged and looping would never terminate.
                return Err(StreamError::Codec("compressor made no progress".into()));
            }
        }
        Ok(buf.len())
    }

    // ── Reading ──────────────────────────────────────────────────────────────

    /// Read decompressed bytes (or raw bytes when incoming data was not
    /// declared compressed). The first read performs codec negotiation.
    /// A stream that terminates before the codec's own end marker is a
    /// hard error, never a short read that looks complete.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        if !self.decode_incoming {
            return self.file.read(buf);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(msg) = &self.decode_failed {
            return Err(StreamError::Broken(msg.clone()));
        }
        self.init_decoder()?;
        let Some(dec) = self.decoder.as_mut() else {
            return Err(StreamError::CodecUnavailable);
        };

        loop {
            if !self.decoded.is_empty() {
                let n = buf.len().min(self.decoded.len());
                buf[..n].copy_from_slice(&self.decoded[..n]);
                self.decoded.drain(..n);
                return Ok(n);
            }
            if self.decode_done {
                return Ok(0);
            }

            if !self.pending.is_empty() {
                let before = dec.total_in();
                let mut out = Vec::with_capacity(CODEC_BUF_BYTES);
                let status = dec
                    .decompress_vec(&self.pending, &mut out, FlushDecompress::None)
                    .map_err(|e| StreamError::Codec(e.to_string()))?;
                let took = (dec.total_in() - before) as usize;
                self.pending.drain(..took);
                self.decoded.extend_from_slice(&out);
                if status == Status::StreamEnd {
                    self.decode_done = true;
                }
                if took > 0 || !out.is_empty() || self.decode_done {
                    continue;
                }
                // No progress: the decoder wants more input.
            }

            let n = self.file.read(&mut self.in_buf)?;
            if n == 0 {
                if self.file.is_terminated() {
                    // The decoder never saw its end marker: the peer sent
                    // a truncated frame. Delivering what decoded so far as
                    // a clean end would hide the loss.
                    tracing::warn!(
                        pending = self.pending.len(),
                        "compressed stream ended before the codec end marker"
                    );
                    let msg = "compressed stream truncated".to_string();
                    self.decode_failed = Some(msg.clone());
                    return Err(StreamError::Codec(msg));
                }
                continue;
            }
            self.pending.extend_from_slice(&self.in_buf[..n]);
        }
    }

    fn init_decoder(&mut self) -> Result<(), StreamError> {
        if self.decoder.is_some() {
            return Ok(());
        }
        // One receive cycle if the peer's options have not arrived yet.
        let codec = self
            .file
            .ensure_stream_options()?
            .map(|options| options.codec);
        match codec {
            Some(Codec::Zlib) => {
                tracing::debug!(codec = Codec::Zlib.name(), "negotiated incoming codec");
                self.decoder = Some(Decompress::new(true));
                Ok(())
            }
            // An explicit "none", or no options at all: the peer is not
            // compressing, and decompression was demanded.
            Some(Codec::None) | None => Err(StreamError::CodecUnavailable),
        }
    }

    // ── Copying ──────────────────────────────────────────────────────────────

    pub fn copy_to<W: io::Write>(&mut self, dst: &mut W) -> Result<u64, StreamError> {
        crate::copy::pump(self, dst, CODEC_BUF_BYTES).map_err(StreamError::from)
    }

    pub fn copy_from<R: io::Read>(&mut self, src: &mut R) -> Result<u64, StreamError> {
        crate::copy::pump(src, self, CODEC_BUF_BYTES).map_err(StreamError::from)
    }

    // ── Closing ──────────────────────────────────────────────────────────────

    /// Flush the compressed trailer (when the encoder consumed any input
    /// at all — an idle close must stay silent on the wire), then close
    /// the underlying file. Closing the codec alone never finalizes the
    /// transport-facing stream.
    pub fn close(&mut self) -> Result<(), StreamError> {
        let flushed = self.finish_encoder();
        let closed = self.file.close();
        flushed.and(closed)
    }

    fn finish_encoder(&mut self) -> Result<(), StreamError> {
        let Some(enc) = self.encoder.as_mut() else {
            return Ok(());
        };
        if enc.total_in() == 0 {
            self.encoder = None;
            return Ok(());
        }
        loop {
            self.enc_scratch.clear();
            let status = enc
                .compress_vec(&[], &mut self.enc_scratch, FlushCompress::Finish)
                .map_err(|e| StreamError::Codec(e.to_string()))?;
            if !self.enc_scratch.is_empty() {
                self.file.write(&self.enc_scratch)?;
            }
            if status == Status::StreamEnd {
                break;
            }
        }
        self.encoder = None;
        Ok(())
    }

    // ── Envelope passthrough ─────────────────────────────────────────────────

    pub fn set_metadata(&mut self, metadata: PayloadMetadata) {
        self.file.set_metadata(metadata);
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.file.set_filename(filename);
    }

    pub fn filename(&self) -> Option<&str> {
        self.file.filename()
    }

    pub fn received_stream_options(&self) -> Option<&StreamOptions> {
        self.file.received_stream_options()
    }

    pub fn received_metadata(&self) -> Option<&PayloadMetadata> {
        self.file.received_metadata()
    }

    pub fn is_terminated(&self) -> bool {
        self.decode_done || self.decode_failed.is_some() || self.file.is_terminated()
    }

    pub fn into_inner(self) -> PacketFile<T> {
        self.file
    }
}

// ── std::io adapters ──────────────────────────────────────────────────────────

impl<T: Transport> io::Read for CompressingFile<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = CompressingFile::read(self, buf).map_err(io::Error::from)?;
            if n > 0 || buf.is_empty() || self.is_terminated() {
                return Ok(n);
            }
        }
    }
}

impl<T: Transport> io::Write for CompressingFile<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        CompressingFile::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
