use crate::events::{ClientEvent, WireEvent};

/// Reconstructs tool-phase boundaries from the raw event sequence.
///
/// The wire protocol interleaves free-form text and tool activity without
/// explicit bracketing. This two-state machine injects synthetic
/// `ToolPhaseStart`/`ToolPhaseEnd` markers so consumers can group tool
/// output away from response text without understanding the protocol.
#[derive(Debug, Default)]
pub struct PhaseTracker {
    in_tool_phase: bool,
}

impl PhaseTracker {
    /// Annotate one wire event, emitting phase markers around it as needed.
    ///
    /// Returns one or two events: the original event preceded by a
    /// synthetic marker when the phase state changes.
    pub fn annotate(&mut self, event: WireEvent) -> Vec<ClientEvent> {
        let mut out = Vec::with_capacity(2);

        match &event {
            WireEvent::ToolCall { .. } => {
                if !self.in_tool_phase {
                    self.in_tool_phase = true;
                    out.push(ClientEvent::ToolPhaseStart);
                }
            }
            // Phase-neutral: a result arriving without a preceding call
            // (retry paths) must not open a phase.
            WireEvent::ToolResult { .. } => {}
            WireEvent::Chunk { .. } | WireEvent::Complete { .. } | WireEvent::Error { .. } => {
                if self.in_tool_phase {
                    self.in_tool_phase = false;
                    out.push(ClientEvent::ToolPhaseEnd);
                }
            }
        }

        out.push(event.into());
        out
    }

    /// True while the tracker is inside an open tool phase.
    #[must_use]
    pub fn in_tool_phase(&self) -> bool {
        self.in_tool_phase
    }
}
