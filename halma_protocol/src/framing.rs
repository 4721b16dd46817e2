// Newline-delimited message framing over TCP.
//
// One message is one line of text terminated by `\n` (a preceding `\r` is
// tolerated and stripped). `read_line` and `write_line` operate on raw
// `String`s; the caller handles encoding and decoding (see `codec.rs`),
// keeping this module format-agnostic.
//
// A length cap protects against unbounded buffering from a peer that never
// sends a newline. Invalid UTF-8 is replaced rather than rejected, so a
// garbled line decodes as an unknown command instead of dropping the
// connection.

use std::io::{self, BufRead, Read, Write};

/// Default maximum line length in bytes, excluding the terminator. Chat text
/// is the largest expected payload.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Write one line followed by `\n` and flush.
///
/// Returns `InvalidInput` if `line` itself contains a newline, since that
/// would split it into two messages on the receiving side.
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    if line.contains('\n') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "line contains an embedded newline",
        ));
    }
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read one line, without its terminator.
///
/// Returns `Ok(None)` on a clean EOF before any bytes. A final line with no
/// trailing newline is returned as-is. Returns `InvalidData` if the line
/// exceeds `max_len` bytes.
pub fn read_line<R: BufRead>(reader: &mut R, max_len: usize) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    let limit = max_len as u64 + 1;
    let n = reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > max_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line too long (max {max_len} bytes)"),
        ));
    }

    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
