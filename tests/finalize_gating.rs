// tests/finalize_gating.rs
//
// A session is reported exactly once, and only after enough turns with
// high-value evidence. Uses a recording notifier behind the real queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use honeypot_intel::notify::{FinalReport, Notifier, NotifyQueue};
use honeypot_intel::reply::ScriptedReplies;
use honeypot_intel::session::store::update;
use honeypot_intel::{
    EngagementPolicy, HoneypotEngine, InMemorySessionStore, InboundMessage, PatternTables,
};

struct Recording(mpsc::UnboundedSender<FinalReport>);

#[async_trait::async_trait]
impl Notifier for Recording {
    async fn send(&self, report: &FinalReport) -> anyhow::Result<()> {
        self.0.send(report.clone())?;
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

fn engine_with_recorder() -> (HoneypotEngine, mpsc::UnboundedReceiver<FinalReport>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (queue, _workers) =
        NotifyQueue::spawn(Arc::new(Recording(tx)), 2, 16, Duration::from_secs(2));
    let engine = HoneypotEngine::new(
        &PatternTables::embedded(),
        EngagementPolicy::default(),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(ScriptedReplies),
    )
    .expect("engine")
    .with_notifier(queue);
    (engine, rx)
}

async fn say(engine: &HoneypotEngine, session: &str, text: &str) -> bool {
    engine
        .process(InboundMessage::new(session, text))
        .await
        .expect("process")
        .engagement_metrics
        .finalized
}

#[tokio::test]
async fn third_turn_finalizes_once() {
    let (e, mut rx) = engine_with_recorder();

    assert!(!say(&e, "gate", "URGENT: Your SBI account 1234567890 will be blocked.").await);
    assert!(!say(&e, "gate", "Call 9876543210 to stop it").await);
    assert!(say(&e, "gate", "Why are you not responding?").await);

    let report = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("report delivered in time")
        .expect("channel open");
    assert_eq!(report.session_id, "gate");
    assert_eq!(report.status, "finalized");
    assert!(report.scam_detected);
    assert_eq!(report.total_messages_exchanged, 3);
    assert!(report.extracted_intelligence.bank_accounts.contains("1234567890"));
    assert!(report.extracted_intelligence.phone_numbers.contains("9876543210"));
    assert!(!report.agent_notes.is_empty());

    // further turns keep the flag but never report again
    assert!(say(&e, "gate", "Hello??").await);
    assert!(say(&e, "gate", "Send 500 to fix.it@ybl").await);
    let again = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(again.is_err(), "second report for the same session");
}

#[tokio::test]
async fn no_high_value_evidence_no_report() {
    let (e, mut rx) = engine_with_recorder();
    for text in [
        "Your OTP is needed urgently",
        "Call 9876543210 now",
        "Share the OTP please",
        "Last chance",
    ] {
        assert!(!say(&e, "phone-only", text).await);
    }
    let got = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(got.is_err());
}

#[tokio::test]
async fn benign_sessions_are_never_reported() {
    let (e, mut rx) = engine_with_recorder();
    for text in [
        "hi, is this the bakery?",
        "I wanted to order a cake",
        "my account number with you is 1234567890",
    ] {
        assert!(!say(&e, "bakery", text).await);
    }
    let got = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(got.is_err());
}

#[tokio::test]
async fn parallel_sessions_report_independently() {
    let (e, mut rx) = engine_with_recorder();
    let e = Arc::new(e);
    let mut handles = Vec::new();
    for n in 0..4 {
        let e = e.clone();
        handles.push(tokio::spawn(async move {
            let id = format!("par-{n}");
            say(&e, &id, "Pay the penalty to penalty.desk@paytm or your account will be blocked").await;
            say(&e, &id, "Do it fast").await;
            say(&e, &id, "Waiting").await
        }));
    }
    for h in handles {
        assert!(h.await.unwrap());
    }
    let mut ids = Vec::new();
    for _ in 0..4 {
        let r = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        ids.push(r.session_id);
    }
    ids.sort();
    assert_eq!(ids, vec!["par-0", "par-1", "par-2", "par-3"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_turns_on_one_session_report_once() {
    const TURNS: u32 = 8;
    let (e, mut rx) = engine_with_recorder();
    let e = Arc::new(e);

    let handles: Vec<_> = (0..TURNS)
        .map(|_| {
            let e = e.clone();
            tokio::spawn(async move {
                say(&e, "crowd", "Pay the penalty to penalty.desk@paytm or your account will be blocked")
                    .await
            })
        })
        .collect();
    let mut finalized = 0;
    for h in handles {
        if h.await.unwrap() {
            finalized += 1;
        }
    }
    // turns are serialized: the third one finalizes, later ones see the flag
    assert_eq!(finalized, TURNS - 2);

    let s = e.session("crowd").expect("session stored");
    assert_eq!(s.turns, TURNS);
    assert!(s.finalized);
    // every inbound message plus one reply per turn
    assert_eq!(s.transcript.len(), 2 * TURNS as usize);

    let report = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("report delivered in time")
        .expect("channel open");
    assert_eq!(report.session_id, "crowd");
    assert_eq!(report.total_messages_exchanged, 3);
    let again = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(again.is_err(), "second report for the same session");
}

#[tokio::test]
async fn evicted_finalized_session_does_not_report_again() {
    let (e, mut rx) = engine_with_recorder();
    say(&e, "swept", "Pay the penalty to penalty.desk@paytm or your account will be blocked").await;
    say(&e, "swept", "Do it fast").await;
    assert!(say(&e, "swept", "Waiting").await);
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("first report")
        .expect("channel open");

    update(e.store().as_ref(), "swept", |s| {
        s.last_activity = chrono::Utc::now() - chrono::Duration::hours(2)
    });
    assert_eq!(e.store().evict_idle(Duration::from_secs(60)), 1);
    assert!(e.session("swept").is_none());

    // the scammer comes back with fresh evidence
    say(&e, "swept", "Pay to second.desk@ybl now").await;
    say(&e, "swept", "Account no: 50100234567891").await;
    assert!(say(&e, "swept", "Hurry").await);
    let again = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(again.is_err(), "second report for the same session");
}
