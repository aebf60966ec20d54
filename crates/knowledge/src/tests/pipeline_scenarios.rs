//! End-to-end behavior of the query pipeline over an in-memory corpus.

use super::{counted_context, support_pairs};
use crate::pipeline::Pipeline;
use crate::types::{AskStatus, QaPair};
use helpdesk_core::AppError;
use std::sync::Arc;

#[tokio::test]
async fn test_wifi_question_surfaces_driver_pair() {
    let (context, counters) = counted_context(support_pairs(), 5, f32::MIN).await;

    let response = context
        .ask("how do I fix WiFi not connecting after update")
        .await
        .unwrap();

    assert_eq!(response.status, AskStatus::Accepted);
    assert!(response.candidates.len() <= 5);
    assert!(response
        .candidates
        .iter()
        .any(|c| c.pair.query == "wifi driver not detected after kernel update"));
    assert_eq!(counters.encodes(), 1);
    assert_eq!(counters.searches(), 1);
}

#[tokio::test]
async fn test_off_topic_question_never_reaches_index() {
    let (context, counters) = counted_context(support_pairs(), 5, 1.10).await;

    let response = context.ask("what's the capital of France").await.unwrap();

    assert_eq!(response.status, AskStatus::Rejected);
    assert!(response.answer.is_none());
    assert!(response.candidates.is_empty());
    assert_eq!(counters.searches(), 0);
    assert_eq!(counters.encodes(), 0);
}

#[tokio::test]
async fn test_empty_question_fails_before_encoder() {
    let (context, counters) = counted_context(support_pairs(), 5, 1.10).await;

    for question in ["", "   \t\n"] {
        assert!(matches!(
            context.ask(question).await,
            Err(AppError::InvalidQuery(_))
        ));
        assert!(matches!(
            context.retriever().retrieve(question, 5).await,
            Err(AppError::InvalidQuery(_))
        ));
    }

    assert_eq!(counters.encodes(), 0);
    assert_eq!(counters.searches(), 0);
}

#[tokio::test]
async fn test_single_pair_corpus_returns_one_candidate() {
    let pairs = vec![QaPair::new(
        "ubuntu freezes on boot with nvidia card",
        "add nomodeset to the kernel line in grub",
    )];
    let (context, _) = counted_context(pairs, 5, f32::MIN).await;

    let candidates = context
        .retriever()
        .retrieve("ubuntu hangs while booting", 5)
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, 0);

    let response = context.ask("ubuntu hangs while booting").await.unwrap();
    assert_eq!(response.candidates.len(), 1);
    assert_eq!(
        response.answer.as_deref(),
        Some("add nomodeset to the kernel line in grub")
    );
}

#[tokio::test]
async fn test_retrieve_orders_by_distance() {
    let (context, _) = counted_context(support_pairs(), 5, 1.10).await;

    let candidates = context
        .retriever()
        .retrieve("sound stopped working in ubuntu", 4)
        .await
        .unwrap();

    assert_eq!(candidates.len(), 4);
    for pair in candidates.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
    assert_eq!(candidates[0].pair.query, "sound not working on ubuntu");
}

#[tokio::test]
async fn test_low_confidence_withholds_answer() {
    let (context, _) = counted_context(support_pairs(), 5, 100.0).await;

    let response = context
        .ask("apt-get update fails with hash sum mismatch")
        .await
        .unwrap();

    assert_eq!(response.status, AskStatus::Accepted);
    assert!(response.low_confidence);
    assert!(response.answer.is_none());
    assert!(!response.candidates.is_empty());
}

#[tokio::test]
async fn test_confident_answer_is_best_reranked_candidate() {
    let (context, _) = counted_context(support_pairs(), 5, 1.10).await;

    let response = context
        .ask("apt-get update fails with hash sum mismatch")
        .await
        .unwrap();

    assert!(!response.low_confidence);
    let best = response.best().unwrap();
    assert_eq!(response.answer.as_deref(), Some(best.pair.answer.as_str()));
    assert!(best.rerank_score.unwrap() >= 1.10);
    for pair in response.candidates.windows(2) {
        assert!(pair[0].rerank_score >= pair[1].rerank_score);
    }
}

#[tokio::test]
async fn test_swap_context_keeps_inflight_snapshot() {
    let (old, _) = counted_context(support_pairs(), 5, f32::MIN).await;
    let pipeline = Pipeline::new(old);
    let held = pipeline.context();

    let replacement = vec![QaPair::new(
        "ubuntu upgrade broke the network manager",
        "sudo systemctl restart NetworkManager and check nmcli dev status",
    )];
    let (new, _) = counted_context(replacement, 5, f32::MIN).await;
    let previous = pipeline.swap_context(new);

    assert!(Arc::ptr_eq(&previous, &held));
    assert_eq!(held.retriever().corpus().len(), 6);
    assert_eq!(pipeline.context().retriever().corpus().len(), 1);

    let response = pipeline.ask("network down after ubuntu upgrade").await.unwrap();
    assert_eq!(response.candidates.len(), 1);
    assert!(response.candidates[0].pair.answer.contains("NetworkManager"));
}

#[tokio::test]
async fn test_concurrent_asks_share_context() {
    let (context, counters) = counted_context(support_pairs(), 3, f32::MIN).await;
    let pipeline = Arc::new(Pipeline::new(context));

    let questions = [
        "wifi not working after kernel update",
        "no sound in ubuntu",
        "grub rescue after windows install",
        "nvidia driver resolution problem",
    ];

    let mut handles = Vec::new();
    for i in 0..16 {
        let pipeline = Arc::clone(&pipeline);
        let question = questions[i % questions.len()];
        handles.push(tokio::spawn(async move { pipeline.ask(question).await }));
    }

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.status, AskStatus::Accepted);
        assert!(response.candidates.len() <= 3);
    }
    assert_eq!(counters.searches(), 16);
}

#[tokio::test]
async fn test_ask_is_deterministic() {
    let (context, _) = counted_context(support_pairs(), 5, 1.10).await;
    let question = "bluetooth headset has no audio";

    let first = context.ask(question).await.unwrap();
    for _ in 0..5 {
        let again = context.ask(question).await.unwrap();
        let ids: Vec<usize> = again.candidates.iter().map(|c| c.id).collect();
        let expected: Vec<usize> = first.candidates.iter().map(|c| c.id).collect();
        assert_eq!(ids, expected);
        assert_eq!(again.answer, first.answer);
    }
}
