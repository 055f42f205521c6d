/// Incremental Server-Sent Events parser for the command server's stream.
///
/// Events are separated by a blank line; each carries an optional `event:`
/// name (defaulting to `message`) and one or more `data:` lines.

/// A single parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Buffers partial events across network chunk boundaries.
///
/// Bytes are held raw until a whole event block has arrived, so a UTF-8
/// character split between two chunks decodes intact.
#[derive(Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns every event completed by this chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.contains(&b'\r') {
            self.buffer = normalize_crlf(&self.buffer);
        }

        let mut events = Vec::new();
        while let Some(boundary) = find_boundary(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..boundary + 2).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        events
    }
}

fn find_boundary(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

/// `\r\n` becomes `\n`. A trailing lone `\r` waits for the next chunk.
fn normalize_crlf(buf: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buf.len());
    let mut iter = buf.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut name = None;
    let mut data: Vec<&str> = Vec::new();

    for line in block.lines() {
        if let Some(val) = line.strip_prefix("event:") {
            name = Some(val.trim().to_string());
        } else if let Some(val) = line.strip_prefix("data:") {
            data.push(val.strip_prefix(' ').unwrap_or(val));
        }
        // id:, retry: and ":" comments carry nothing we use
    }

    if data.is_empty() {
        return None;
    }
    Some(SseEvent {
        event: name.unwrap_or_else(|| "message".to_string()),
        data: data.join("\n"),
    })
}
