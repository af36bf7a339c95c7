use agent_rpc::{AgentRpcError, SseFrameDecoder, WireEvent};

#[test]
fn decodes_chunk_then_complete_scenario() {
    let payload = concat!(
        "data: {\"type\":\"chunk\",\"content\":\"Hi\"}\n\n",
        "data: {\"type\":\"complete\",\"content\":\"[]\"}\n\n",
    );

    let records = SseFrameDecoder::decode_all(payload);
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].as_ref().expect("chunk record"),
        &WireEvent::Chunk {
            content: "Hi".to_string(),
        }
    );
    assert_eq!(
        records[1].as_ref().expect("complete record"),
        &WireEvent::Complete {
            content: "[]".to_string(),
        }
    );
}

#[test]
fn malformed_record_fails_alone_and_decoding_continues() {
    let payload = concat!(
        "data: {broken-json\n\n",
        "data: {\"type\":\"chunk\",\"content\":\"ok\"}\n\n",
    );

    let records = SseFrameDecoder::decode_all(payload);
    assert_eq!(records.len(), 2);
    assert!(matches!(
        records[0],
        Err(AgentRpcError::MalformedRecord(_))
    ));
    assert!(records[1].is_ok());
}

#[test]
fn unknown_event_type_is_a_malformed_record() {
    let payload = "data: {\"type\":\"mystery\",\"content\":\"x\"}\n\n";
    let records = SseFrameDecoder::decode_all(payload);
    assert_eq!(records.len(), 1);
    assert!(matches!(
        records[0],
        Err(AgentRpcError::MalformedRecord(_))
    ));
}

#[test]
fn blank_separator_lines_are_skipped() {
    let payload = concat!(
        "\n\n",
        "data: \n\n",
        "data: {\"type\":\"tool_call\",\"content\":\"read_file\"}\n\n",
    );

    let records = SseFrameDecoder::decode_all(payload);
    assert_eq!(records.len(), 1);
    assert!(matches!(
        records[0],
        Ok(WireEvent::ToolCall { .. })
    ));
}

#[test]
fn partial_trailing_record_stays_buffered() {
    let mut decoder = SseFrameDecoder::default();
    assert!(decoder
        .feed(b"data: {\"type\":\"chunk\",\"content\":\"pending\"}")
        .is_empty());
    assert!(!decoder.is_empty_buffer());

    let records = decoder.feed(b"\n\n");
    assert_eq!(records.len(), 1);
    assert!(decoder.is_empty_buffer());
}

#[test]
fn records_are_yielded_in_receipt_order() {
    let payload = concat!(
        "data: {\"type\":\"tool_call\",\"content\":\"a\"}\n\n",
        "data: {\"type\":\"tool_result\",\"content\":\"b\"}\n\n",
        "data: {\"type\":\"chunk\",\"content\":\"c\"}\n\n",
    );

    let kinds: Vec<_> = SseFrameDecoder::decode_all(payload)
        .into_iter()
        .map(|record| record.expect("valid record"))
        .collect();

    assert_eq!(
        kinds,
        vec![
            WireEvent::ToolCall {
                content: "a".to_string(),
            },
            WireEvent::ToolResult {
                content: "b".to_string(),
            },
            WireEvent::Chunk {
                content: "c".to_string(),
            },
        ]
    );
}
