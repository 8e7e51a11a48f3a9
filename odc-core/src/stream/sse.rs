//! Incremental `text/event-stream` decoding.
//!
//! Transport chunks arrive at arbitrary boundaries, so the decoder
//! buffers until it has complete lines. Only the `data` field matters to
//! this client; `event`, `id` and `retry` fields are skipped, comment
//! lines (leading `:`) are the server's keep-alives. Multiple `data:`
//! lines in one message are joined with newlines per the wire format.
//! Messages with an empty payload are dropped.

/// Streaming decoder for one connection. Not reusable across
/// connections: any partial message is discarded with the decoder.
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    data: String,
}

impl SseDecoder {
    pub(crate) fn new() -> Self {
        Self {
            buf: Vec::new(),
            data: String::new(),
        }
    }

    /// Feed one transport chunk; returns every message payload the chunk
    /// completed, in arrival order.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut completed = Vec::new();
        while let Some(end) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            self.take_line(line.trim_end_matches(['\r', '\n']), &mut completed);
        }
        completed
    }

    fn take_line(&mut self, line: &str, completed: &mut Vec<String>) {
        if line.is_empty() {
            // A blank line terminates the current message.
            if !self.data.is_empty() {
                completed.push(std::mem::take(&mut self.data));
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(value);
        }
    }
}
