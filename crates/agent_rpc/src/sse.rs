use crate::error::AgentRpcError;
use crate::events::WireEvent;

/// Incremental decoder for the server's `data: <json>` event framing.
///
/// Records are separated by a blank line. One malformed record fails only
/// that record; decoding continues with the next one.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: String,
}

impl SseFrameDecoder {
    /// Feed arbitrary bytes into the decoder and drain complete records.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<WireEvent, AgentRpcError>> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut records = Vec::new();

        while let Some(split) = self.buffer.find("\n\n") {
            let frame = self.buffer[..split].to_string();
            self.buffer.drain(0..split + 2);

            let Some(payload) = extract_data_payload(&frame) else {
                continue;
            };

            match serde_json::from_str::<WireEvent>(&payload) {
                Ok(event) => records.push(Ok(event)),
                Err(error) => records.push(Err(AgentRpcError::MalformedRecord(format!(
                    "{error}: {payload}"
                )))),
            }
        }

        records
    }

    /// Decode a complete payload string in one shot.
    pub fn decode_all(input: &str) -> Vec<Result<WireEvent, AgentRpcError>> {
        let mut decoder = Self::default();
        decoder.feed(input.as_bytes())
    }

    /// True when no partial record bytes are pending.
    #[must_use]
    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty()
    }
}

fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::SseFrameDecoder;
    use crate::events::WireEvent;

    #[test]
    fn decodes_records_incrementally_across_chunk_splits() {
        let mut decoder = SseFrameDecoder::default();
        assert!(decoder
            .feed(b"data: {\"type\":\"chunk\",\"content\":\"Hel")
            .is_empty());

        let records = decoder.feed(b"lo\"}\n\n");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].as_ref().expect("chunk record"),
            &WireEvent::Chunk {
                content: "Hello".to_string(),
            }
        );
        assert!(decoder.is_empty_buffer());
    }

    #[test]
    fn blank_frames_are_skipped_without_records() {
        let records = SseFrameDecoder::decode_all("data: \n\n\n\n");
        assert!(records.is_empty());
    }
}
