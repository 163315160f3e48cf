mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{group, private, Harness, Step, STRANGER, WHITELISTED};
use relay_agent::admission::DenyReason;
use relay_agent::pipeline::{run_turn, TurnFailure, TurnOutcome, TurnState};
use relay_core::{translate, Key, Locale};
use relay_store::KvStore;
use tokio::time::Instant;

#[tokio::test]
async fn hello_without_context_builds_two_entry_prompt_and_stores_one_record() {
    let h = Harness::new();
    h.client.push(Step::Answer("Hi there!"));

    let outcome = run_turn(&h, &private(WHITELISTED, "hello")).await;
    assert_eq!(outcome, TurnOutcome::Delivered);
    assert_eq!(outcome.state(), TurnState::Delivered);

    let prompt = h.client.last_prompt();
    assert_eq!(prompt.len(), 2);
    assert_eq!(prompt[0].role, "system");
    assert_eq!(prompt[1].role, "user");
    assert_eq!(prompt[1].content, "hello");
    assert_eq!(h.client.last_model().as_deref(), Some("m1"));

    let context = h.store.get_context(WHITELISTED).await.unwrap().unwrap();
    assert_eq!(context, "Q: hello\nA: Hi there!");
    assert_eq!(context.matches("Q: ").count(), 1);
}

#[tokio::test]
async fn prior_context_is_the_middle_entry() {
    let h = Harness::new();
    h.store.append_turn(WHITELISTED, "first", "one").await.unwrap();

    run_turn(&h, &private(WHITELISTED, "second")).await;

    let prompt = h.client.last_prompt();
    let contents: Vec<_> = prompt.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["You are a helpful assistant.", "Q: first\nA: one", "second"]
    );
}

#[tokio::test]
async fn reply_is_rich_with_model_prefix_and_replies_to_the_question() {
    let h = Harness::new();
    h.client.push(Step::Answer("**Bold** answer"));

    run_turn(&h, &private(WHITELISTED, "q")).await;

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].options.rich);
    assert_eq!(sent[0].options.reply_to, Some(7));
    assert!(sent[0].text.starts_with("🤖 m1\n<b>Bold</b> answer"));
    assert_eq!(h.transport.typing.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn two_overloads_then_success_adds_three_seconds() {
    let h = Harness::new();
    h.client.push(Step::Overloaded);
    h.client.push(Step::Overloaded);
    h.client.push(Step::Answer("finally"));

    let start = Instant::now();
    let outcome = run_turn(&h, &private(WHITELISTED, "q")).await;
    let waited = start.elapsed();

    assert_eq!(outcome, TurnOutcome::Delivered);
    assert_eq!(h.client.calls(), 3);
    assert!(waited >= Duration::from_millis(3000), "{waited:?}");
    assert!(waited < Duration::from_millis(3500), "{waited:?}");
}

#[tokio::test(start_paused = true)]
async fn always_overloaded_fails_after_four_attempts_without_persisting() {
    let h = Harness::new();
    for _ in 0..10 {
        h.client.push(Step::Overloaded);
    }

    let outcome = run_turn(&h, &private(WHITELISTED, "q")).await;

    assert_eq!(outcome, TurnOutcome::Failed(TurnFailure::Generation));
    assert_eq!(h.client.calls(), 4);
    assert_eq!(h.store.get_context(WHITELISTED).await.unwrap(), None);
    assert_eq!(h.transport.texts(), vec![translate(Key::Error, Locale::En)]);
}

#[tokio::test]
async fn terminal_backend_error_is_not_retried() {
    let h = Harness::new();
    h.client.push(Step::Fail);

    let outcome = run_turn(&h, &private(WHITELISTED, "q")).await;

    assert_eq!(outcome, TurnOutcome::Failed(TurnFailure::Generation));
    assert_eq!(h.client.calls(), 1);
    assert_eq!(h.store.get_context(WHITELISTED).await.unwrap(), None);
}

#[tokio::test]
async fn rejected_markup_falls_back_to_plain_text() {
    let h = Harness::new();
    h.transport.reject_rich.store(true, Ordering::SeqCst);
    h.client.push(Step::Answer("**Bold** and [link](https://x.dev)"));

    let outcome = run_turn(&h, &private(WHITELISTED, "q")).await;
    assert_eq!(outcome, TurnOutcome::Delivered);

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].options.rich);
    assert_eq!(sent[0].options.reply_to, Some(7));
    assert!(sent[0].text.starts_with("🤖 m1\nBold and link (https://x.dev)"));
    assert!(!sent[0].text.contains('*'));
    assert!(h.store.get_context(WHITELISTED).await.unwrap().is_some());
}

#[tokio::test]
async fn failed_delivery_still_persists_the_turn() {
    let h = Harness::new();
    h.transport.fail_all.store(true, Ordering::SeqCst);
    h.client.push(Step::Answer("lost in transit"));

    let outcome = run_turn(&h, &private(WHITELISTED, "q")).await;

    assert_eq!(outcome, TurnOutcome::Failed(TurnFailure::Delivery));
    assert_eq!(
        h.store.get_context(WHITELISTED).await.unwrap().as_deref(),
        Some("Q: q\nA: lost in transit")
    );
}

#[tokio::test]
async fn stored_context_is_sanitized_but_keeps_code() {
    let h = Harness::new();
    h.client
        .push(Step::Answer("A: Use **this**:\n```rust\nlet x = a*b*c;\n```"));

    run_turn(&h, &private(WHITELISTED, "*how*?")).await;

    let context = h.store.get_context(WHITELISTED).await.unwrap().unwrap();
    assert_eq!(
        context,
        "Q: how?\nA: Use this:\n```rust\nlet x = a*b*c;\n```"
    );
}

#[tokio::test]
async fn group_burst_from_stranger_is_cooled_down() {
    let h = Harness::new();

    let first = run_turn(&h, &group(STRANGER, "one")).await;
    assert_eq!(first, TurnOutcome::Delivered);

    let second = run_turn(&h, &group(STRANGER, "two")).await;
    let TurnOutcome::Denied(DenyReason::Cooldown { wait_ms }) = second else {
        panic!("expected cooldown, got {second:?}");
    };
    assert!(wait_ms > 0 && wait_ms <= 180_000);
    assert_eq!(h.client.calls(), 1);

    let notice = h.transport.sent().pop().unwrap();
    assert_eq!(notice.options.reply_to, Some(9));
    assert!(!notice.options.rich);
    assert!(notice.text.starts_with(translate(Key::GroupCooldown, Locale::En)));
    let seconds: u64 = notice
        .text
        .split_whitespace()
        .find_map(|w| w.parse().ok())
        .unwrap();
    assert!(seconds > 0);
}

#[tokio::test]
async fn whitelisted_sender_skips_group_cooldown() {
    let h = Harness::new();
    for text in ["a", "b", "c"] {
        assert_eq!(
            run_turn(&h, &group(WHITELISTED, text)).await,
            TurnOutcome::Delivered
        );
    }
    assert_eq!(h.kv.get("last_request:-1001").await.unwrap(), None);
}

#[tokio::test]
async fn zero_cooldown_admits_every_group_request() {
    let h = Harness::with_cooldown(Duration::ZERO);
    for text in ["a", "b"] {
        assert_eq!(
            run_turn(&h, &group(STRANGER, text)).await,
            TurnOutcome::Delivered
        );
    }
}

#[tokio::test]
async fn private_stranger_is_denied_silently() {
    let h = Harness::new();
    let outcome = run_turn(&h, &private(STRANGER, "hello")).await;
    assert_eq!(outcome, TurnOutcome::Denied(DenyReason::Unauthorized));
    assert!(h.transport.sent().is_empty());
    assert_eq!(h.client.calls(), 0);
}

#[tokio::test]
async fn clearing_missing_context_is_fine() {
    let h = Harness::new();
    h.store.clear_context("nobody").await.unwrap();
    assert_eq!(h.store.get_context("nobody").await.unwrap(), None);
}

#[tokio::test]
async fn long_answer_is_split_into_chunks() {
    let h = Harness::new();
    let long: &'static str = Box::leak("paragraph line\n".repeat(600).into_boxed_str());
    h.client.push(Step::Answer(long));

    run_turn(&h, &private(WHITELISTED, "q")).await;

    let sent = h.transport.sent();
    assert!(sent.len() > 1);
    assert!(sent.iter().all(|s| s.text.chars().count() <= 4096));
    assert_eq!(sent[0].options.reply_to, Some(7));
    assert!(sent[1..].iter().all(|s| s.options.reply_to.is_none()));
}

#[tokio::test]
async fn rejection_mid_reply_resends_only_the_remaining_chunks() {
    let h = Harness::new();
    *h.transport.rich_budget.lock().unwrap() = Some(1);
    let long: &'static str = Box::leak(
        (0..600)
            .map(|i| format!("**line {i:03}** of the answer\n"))
            .collect::<String>()
            .into_boxed_str(),
    );
    h.client.push(Step::Answer(long));

    let outcome = run_turn(&h, &private(WHITELISTED, "q")).await;
    assert_eq!(outcome, TurnOutcome::Delivered);

    let sent = h.transport.sent();
    assert!(sent.len() > 2);
    assert!(sent[0].options.rich);
    assert_eq!(sent[0].options.reply_to, Some(7));
    assert!(sent[1..].iter().all(|s| !s.options.rich));
    assert!(sent[1..].iter().all(|s| s.options.reply_to.is_none()));

    let delivered: Vec<String> = sent
        .iter()
        .flat_map(|s| s.text.lines().map(str::to_string).collect::<Vec<_>>())
        .filter(|l| l.contains("of the answer"))
        .collect();
    assert_eq!(delivered.len(), 600, "every line exactly once");
    assert!(delivered[0].contains("<b>line 000</b>"));
    assert!(delivered.last().is_some_and(|l| l.starts_with("line 599 ")));
}
