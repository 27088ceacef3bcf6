use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A reader of server-sent events over a chunk stream.
///
/// Only the `data` field is surfaced; `event`, `id`, `retry` and comment
/// lines are skipped. Lines end with LF or CRLF. Multiple `data` lines of
/// one event are joined with LF. An event left unterminated at the end of
/// the stream is discarded.
pub struct Sse {
    buf: Vec<u8>,
    data: Option<String>,
    chunks: Chunks,
    eof: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            data: None,
            chunks,
            eof: false,
        }
    }

    /// Returns the data of the next event, or `None` at the end of the
    /// stream.
    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            while let Some(line) = self.take_line()? {
                if let Some(event) = self.process_line(&line) {
                    return Ok(Some(event));
                }
            }
            if self.eof {
                return Ok(None);
            }
            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.eof = true,
            }
        }
    }

    /// Takes one complete line out of the buffer, without its terminator.
    ///
    /// Lines are split on bytes rather than characters, since a chunk may
    /// end in the middle of a multi-byte character.
    fn take_line(&mut self) -> Result<Option<String>, Error> {
        let Some(lf_idx) = self.buf.iter().position(|b| *b == b'\n') else {
            return Ok(None);
        };
        let mut line: Vec<u8> = self.buf.drain(..=lf_idx).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line)
            .map(Some)
            .map_err(|_| Error::InvalidPayload)
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.data.take();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => {
                (field, value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };
        if field != "data" {
            trace!("skipping sse field: {field}");
            return None;
        }
        match &mut self.data {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => self.data = Some(value.to_owned()),
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn reader(chunks: &[&'static [u8]]) -> Sse {
        let chunks = chunks.iter().map(|c| Bytes::from_static(*c)).collect();
        Sse::new(Chunks::from_vec_deque(chunks))
    }

    #[tokio::test]
    async fn test_normal_events() {
        let mut sse = reader(&[b"data: hello\n\n", b"data: bye\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_across_chunks() {
        let mut sse = reader(&[b"da", b"ta:", b" hel", b"lo\n", b"\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap(), None);

        // "é" is two bytes, split between chunks.
        let mut sse = reader(&[b"data: caf\xc3", b"\xa9\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "café");
    }

    #[tokio::test]
    async fn test_line_endings_and_spacing() {
        let mut sse = reader(&[b"data:{\"a\":1}\r\n\r\ndata:  two spaces\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), " two spaces");
    }

    #[tokio::test]
    async fn test_comments_and_other_fields() {
        let mut sse = reader(&[
            b": keep-alive\n\n",
            b"event: chunk\nid: 7\nretry: 1000\ndata: payload\n\n",
            b"data: [DONE]\n\n",
        ]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "payload");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "[DONE]");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multi_line_data() {
        let mut sse = reader(&[b"data: first\ndata: second\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "first\nsecond");
    }

    #[tokio::test]
    async fn test_unterminated_and_invalid_data() {
        let mut sse = reader(&[b"data: hello\n", b"data: bye\n"]);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let mut sse = reader(&[b"xxxxxx\n"]);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let mut sse = reader(&[b"data: \xff\xfe\n\n"]);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);
    }
}
