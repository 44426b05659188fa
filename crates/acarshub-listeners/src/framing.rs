//! JSON object framing shared by the TCP and UDP listener variants.
//!
//! Decoders emit newline-delimited JSON but sometimes write two objects
//! back-to-back with no separator (`}{`); every read substitutes that for
//! `}\n{` before splitting on newlines.

use serde_json::Value;
use tracing::warn;

/// Substitute every `}{` with `}\n{`.
fn fixup_adjacent_objects(data: &str) -> String {
    data.replace("}{", "}\n{")
}

/// Parse every complete line in one UDP datagram independently; invalid
/// lines are dropped (logged, not propagated) since datagrams never
/// reassemble across packets.
pub fn parse_datagram(data: &str) -> Vec<Value> {
    fixup_adjacent_objects(data)
    .lines()
    .filter(|line| !line.trim().is_empty())
    .filter_map(|line| match serde_json::from_str(line) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "dropping unparsable datagram line");
                None
            }
    })
    .collect()
}

/// Stateful line reassembler for the TCP variant: a read whose last line
/// fails to parse is buffered and prepended to the next read's first line.
/// If the reassembled line still fails to parse, it is discarded.
#[derive(Default)]
pub struct StreamReassembler {
    pending: Option<String>,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes (already UTF-8 decoded); returns every
    /// successfully parsed object.
    pub fn feed(&mut self, data: &str) -> Vec<Value> {
        let fixed = fixup_adjacent_objects(data);
        let mut lines: Vec<&str> = fixed.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let mut first = lines.remove(0).to_owned();
        let first_is_reassembled = self
            .pending
            .take()
            .map(|pending| first = format!("{pending}{first}"))
            .is_some();
        lines.insert(0, &first);

        let last_idx = lines.len() - 1;
        let mut out = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(v) => out.push(v),
                Err(e) => {
                    let already_retried = i == 0 && first_is_reassembled;
                    if i == last_idx && !already_retried {
                        // Might just be a read cut mid-object; wait for more.
                        self.pending = Some((*line).to_owned());
                    } else {
                        warn!(error = %e, "discarding unparsable reassembled line");
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn udp_splits_back_to_back_objects_in_one_datagram() {
        let values = parse_datagram(r#"{"a":1}{"b":2}"#);
        assert_eq!(values, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn udp_drops_invalid_lines() {
        let values = parse_datagram("{\"a\":1}\nnot json\n{\"b\":2}");
        assert_eq!(values, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn tcp_reassembles_object_split_across_two_reads() {
        let mut r = StreamReassembler::new();
        assert!(r.feed("{\"a\":").is_empty());
        let values = r.feed("1}\n");
        assert_eq!(values, vec![json!({"a": 1})]);
    }

    #[test]
    fn tcp_handles_back_to_back_objects_in_one_read() {
        let mut r = StreamReassembler::new();
        let values = r.feed("{\"a\":1}{\"b\":2}\n");
        assert_eq!(values, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn tcp_discards_reassembled_line_that_still_fails_to_parse() {
        let mut r = StreamReassembler::new();
        assert!(r.feed("garbage-start").is_empty());
        let values = r.feed("-still-garbage\n{\"ok\":true}\n");
        assert_eq!(values, vec![json!({"ok": true})]);
    }

    #[test]
    fn tcp_discards_single_line_reassembled_read_that_still_fails_to_parse() {
        let mut r = StreamReassembler::new();
        assert!(r.feed("garbage-start").is_empty());
        // Reassembled line is also the only (and therefore last) line in this
        // read; it must still be discarded rather than buffered for another retry.
        assert!(r.feed("-still-garbage").is_empty());
        let values = r.feed("{\"ok\":true}\n");
        assert_eq!(values, vec![json!({"ok": true})]);
    }
}
