//! Command handlers for the helpdesk CLI.
//!
//! This module organizes all CLI commands into separate submodules, plus
//! the reply rendering shared by `ask` and `chat`.

pub mod ask;
pub mod build;
pub mod chat;
pub mod clean;
pub mod prepare;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use build::BuildCommand;
pub use chat::ChatCommand;
pub use clean::CleanCommand;
pub use prepare::PrepareCommand;
pub use stats::StatsCommand;

use helpdesk_knowledge::answer::{format_support_answer, low_confidence_message};
use helpdesk_knowledge::{AskResponse, AskStatus};

/// Number of candidates shown by `--debug`.
const DEBUG_CANDIDATES: usize = 5;

/// Text shown to the user for one response.
pub fn render_reply(response: &AskResponse, refusal: &str) -> String {
    match (&response.status, &response.answer) {
        (AskStatus::Rejected, _) => refusal.to_string(),
        (AskStatus::Accepted, Some(answer)) if !response.low_confidence => {
            format_support_answer(answer)
        }
        (AskStatus::Accepted, _) => low_confidence_message(),
    }
}

/// Ranked dump of the top candidates with their scoring signals.
pub fn render_debug(response: &AskResponse) -> String {
    let mut lines = vec![format!(
        "Top {} candidates:",
        response.candidates.len().min(DEBUG_CANDIDATES)
    )];

    for (rank, candidate) in response.candidates.iter().take(DEBUG_CANDIDATES).enumerate() {
        let total = candidate.rerank_score.unwrap_or_default();
        let header = match candidate.signals {
            Some(signals) => format!(
                "#{} total={:.3} sim={:.3} quality={:.3} overlap={:.3}",
                rank + 1,
                total,
                signals.similarity,
                signals.quality,
                signals.overlap
            ),
            None => format!("#{} distance={:.3}", rank + 1, candidate.distance),
        };
        lines.push(header);
        lines.push(format!("   Q: {}", candidate.pair.query));
        lines.push(format!("   A: {}", candidate.pair.answer));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_knowledge::rerank::RerankSignals;
    use helpdesk_knowledge::{Candidate, QaPair};

    fn accepted(low_confidence: bool) -> AskResponse {
        let mut candidate = Candidate::new(
            3,
            QaPair::new("wifi gone after upgrade", "run sudo modprobe iwlwifi"),
            0.2,
        );
        candidate.rerank_score = Some(1.4);
        candidate.signals = Some(RerankSignals {
            similarity: 0.8,
            quality: 0.4,
            overlap: 0.4,
        });

        AskResponse {
            status: AskStatus::Accepted,
            answer: (!low_confidence).then(|| candidate.pair.answer.clone()),
            candidates: vec![candidate],
            low_confidence,
        }
    }

    #[test]
    fn test_render_rejected_uses_refusal() {
        let reply = render_reply(&AskResponse::rejected(), "Ubuntu questions only.");
        assert_eq!(reply, "Ubuntu questions only.");
    }

    #[test]
    fn test_render_confident_answer() {
        let reply = render_reply(&accepted(false), "unused");
        assert!(reply.contains("run sudo modprobe iwlwifi"));
        assert!(reply.contains("```bash"));
    }

    #[test]
    fn test_render_low_confidence() {
        let reply = render_reply(&accepted(true), "unused");
        assert_eq!(reply, low_confidence_message());
    }

    #[test]
    fn test_render_debug_lists_signals() {
        let dump = render_debug(&accepted(false));
        assert!(dump.starts_with("Top 1 candidates:"));
        assert!(dump.contains("#1 total=1.400 sim=0.800 quality=0.400"));
        assert!(dump.contains("Q: wifi gone after upgrade"));
    }
}
