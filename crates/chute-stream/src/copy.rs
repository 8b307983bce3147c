//! The bounded relay loop shared by `copy_to` and `copy_from`.

use std::io;

/// Pump bytes from `src` to `dst` through a relay buffer of `buf_len`
/// bytes until `src` reports end-of-stream. Returns bytes relayed.
///
/// The buffer is sized to the file's chunk bound so a copy through a
/// chunked file never produces a slice the write side would reject.
pub(crate) fn pump<R, W>(src: &mut R, dst: &mut W, buf_len: usize) -> io::Result<u64>
where
    R: io::Read + ?Sized,
    W: io::Write + ?Sized,
{
    let mut buf = vec![0u8; buf_len.max(1)];
    let mut relayed = 0u64;
    loop {
        let n = src.read(&mut buf)?;
        if n == 0 {
            return Ok(relayed);
        }
        dst.write_all(&buf[..n])?;
        relayed += n as u64;
    }
}
