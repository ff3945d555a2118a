use std::fmt::Write as _;

use tracing::info;

use crate::clients::ChatProvider;
use crate::error::UpstreamError;
use crate::model::{ChatTurn, Citation, SearchHit};

pub const NO_EVIDENCE_ANSWER: &str = "Not found in retrieved contract text.";

const SYSTEM_DIRECTIVE: &str = "\
You are a contract analyst answering questions about commercial lease \
agreements. Answer ONLY from the numbered context chunks provided. If the \
context does not contain the answer, say that the information is not in the \
retrieved contract text. Cite the chunk ids and page numbers you relied on. \
Never invent tenant names, owners, amounts, dates, or clause text that the \
context does not state.";

#[derive(Debug)]
pub struct GroundedAnswer {
    pub answer_text: String,
    pub citations: Vec<Citation>,
}

pub struct GroundedAnswerer<'a> {
    chat: &'a dyn ChatProvider,
}

impl<'a> GroundedAnswerer<'a> {
    pub fn new(chat: &'a dyn ChatProvider) -> Self {
        Self { chat }
    }

    pub fn answer(
        &self,
        question: &str,
        hits: &[SearchHit],
        history: &[ChatTurn],
    ) -> Result<GroundedAnswer, UpstreamError> {
        if hits.is_empty() {
            info!("no hits, returning fixed no-evidence answer");
            return Ok(GroundedAnswer {
                answer_text: NO_EVIDENCE_ANSWER.to_string(),
                citations: Vec::new(),
            });
        }

        let citations = citations_for(hits);
        let payload = user_payload(question, hits, history);
        let generated = self.chat.complete(SYSTEM_DIRECTIVE, &payload)?;

        let mut answer_text = generated;
        answer_text.push_str("\n\nSOURCES:\n");
        answer_text.push_str(&render_citation_lines(&citations));

        Ok(GroundedAnswer { answer_text, citations })
    }
}

pub fn citations_for(hits: &[SearchHit]) -> Vec<Citation> {
    hits.iter()
        .enumerate()
        .map(|(index, hit)| Citation {
            ordinal: index + 1,
            filename: hit.filename.clone(),
            page_number: hit.page_number,
            chunk_id: hit.id.clone(),
            score: hit.score,
        })
        .collect()
}

pub fn render_citation_lines(citations: &[Citation]) -> String {
    let mut out = String::new();
    for citation in citations {
        let _ = writeln!(
            out,
            "[{}] {} — Page {} — Chunk {} — Score {:.3}",
            citation.ordinal,
            citation.filename,
            page_label(citation.page_number),
            citation.chunk_id,
            citation.score,
        );
    }
    out
}

fn user_payload(question: &str, hits: &[SearchHit], history: &[ChatTurn]) -> String {
    let mut payload = String::new();

    if !history.is_empty() {
        payload.push_str("Conversation so far:\n");
        for turn in history {
            let _ = writeln!(payload, "{}: {}", turn.role, turn.content);
        }
        payload.push('\n');
    }

    payload.push_str("Context:\n");
    for (index, hit) in hits.iter().enumerate() {
        let _ = writeln!(
            payload,
            "[Chunk {}] (page={}) (score={:.3})\n{}",
            index + 1,
            page_label(hit.page_number),
            hit.score,
            hit.content,
        );
        payload.push('\n');
    }

    let _ = write!(payload, "Question: {question}");
    payload
}

fn page_label(page: Option<u32>) -> String {
    match page {
        Some(page) => page.to_string(),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct RecordingChat {
        reply: String,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl RecordingChat {
        fn replying(reply: &str) -> Self {
            Self { reply: reply.to_string(), calls: RefCell::new(Vec::new()) }
        }
    }

    impl ChatProvider for RecordingChat {
        fn complete(&self, system: &str, user: &str) -> Result<String, UpstreamError> {
            self.calls.borrow_mut().push((system.to_string(), user.to_string()));
            Ok(self.reply.clone())
        }
    }

    fn hit(id: &str, page: Option<u32>, score: f64) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            content: format!("content of {id}"),
            page_number: page,
            filename: "lease.pdf".to_string(),
            score,
        }
    }

    #[test]
    fn zero_hits_short_circuits_without_generation() {
        let chat = RecordingChat::replying("should never be used");
        let answerer = GroundedAnswerer::new(&chat);

        let answer = answerer.answer("What is the rent?", &[], &[]).unwrap();

        assert_eq!(answer.answer_text, NO_EVIDENCE_ANSWER);
        assert!(answer.citations.is_empty());
        assert!(chat.calls.borrow().is_empty());
    }

    #[test]
    fn one_citation_per_hit_with_aligned_ordinals() {
        let chat = RecordingChat::replying("The rent is 120000 per year.");
        let answerer = GroundedAnswerer::new(&chat);
        let hits = vec![
            hit("doc-1-p2-c0", Some(2), 12.25),
            hit("doc-1-p5-c1", Some(5), 4.5),
            hit("doc-1-p0-c0", None, 1.0),
        ];

        let answer = answerer.answer("What is the rent?", &hits, &[]).unwrap();

        assert_eq!(answer.citations.len(), 3);
        for (index, citation) in answer.citations.iter().enumerate() {
            assert_eq!(citation.ordinal, index + 1);
            assert_eq!(citation.chunk_id, hits[index].id);
        }

        let calls = chat.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (_, payload) = &calls[0];
        assert!(payload.contains("[Chunk 1] (page=2) (score=12.250)"));
        assert!(payload.contains("[Chunk 3] (page=n/a) (score=1.000)"));
        assert!(payload.ends_with("Question: What is the rent?"));
    }

    #[test]
    fn sources_block_is_appended_after_generated_text() {
        let chat = RecordingChat::replying("Answer body.");
        let answerer = GroundedAnswerer::new(&chat);
        let hits = vec![hit("doc-1-p2-c0", Some(2), 12.25)];

        let answer = answerer.answer("q", &hits, &[]).unwrap();

        assert!(answer.answer_text.starts_with("Answer body.\n\nSOURCES:\n"));
        assert!(
            answer
                .answer_text
                .contains("[1] lease.pdf — Page 2 — Chunk doc-1-p2-c0 — Score 12.250")
        );
    }

    #[test]
    fn history_is_role_tagged_and_omitted_when_empty() {
        let chat = RecordingChat::replying("ok");
        let answerer = GroundedAnswerer::new(&chat);
        let hits = vec![hit("doc-1-p1-c0", Some(1), 2.0)];
        let history = vec![
            ChatTurn { role: "user".to_string(), content: "Who is the tenant?".to_string() },
            ChatTurn { role: "assistant".to_string(), content: "Acme LLC.".to_string() },
        ];

        answerer.answer("And the owner?", &hits, &history).unwrap();
        answerer.answer("And the owner?", &hits, &[]).unwrap();

        let calls = chat.calls.borrow();
        assert!(calls[0].1.contains("user: Who is the tenant?"));
        assert!(calls[0].1.contains("assistant: Acme LLC."));
        assert!(!calls[1].1.contains("Conversation so far:"));
    }

    struct FailingChat;

    impl ChatProvider for FailingChat {
        fn complete(&self, _system: &str, _user: &str) -> Result<String, UpstreamError> {
            Err(UpstreamError::chat("completion unavailable"))
        }
    }

    #[test]
    fn generation_failure_propagates_to_the_caller() {
        let answerer = GroundedAnswerer::new(&FailingChat);
        let result = answerer.answer("q", &[hit("doc-1-p1-c0", Some(1), 1.0)], &[]);
        assert!(matches!(result, Err(UpstreamError::Chat { .. })));
    }

    #[test]
    fn system_directive_forbids_invented_entities() {
        let chat = RecordingChat::replying("ok");
        let answerer = GroundedAnswerer::new(&chat);
        answerer.answer("q", &[hit("a", Some(1), 1.0)], &[]).unwrap();

        let calls = chat.calls.borrow();
        assert!(calls[0].0.contains("Never invent"));
        assert!(calls[0].0.contains("ONLY from the numbered context chunks"));
    }
}
