//! Integration tests for the output capture protocol
//!
//! Drives the protocol through channel-backed sessions: a scripted responder
//! task stands in for the REPL subprocess, reading submitted lines and
//! feeding output back into the session buffer.

use std::time::Duration;

use regex::Regex;
use tokio::sync::mpsc;

use replbridge::capture::{capture_output, CaptureSpec};
use replbridge::error::Error;
use replbridge::session::Session;

const PROMPT: &str = r"\(visa\) ";

fn spec<'a>(marker: &'a str, prompt: &'a Regex) -> CaptureSpec<'a> {
    CaptureSpec {
        eoe_marker: marker,
        prompt,
        strip_echo: false,
        full_body: "",
        settle_delay: Duration::from_millis(5),
        timeout: Some(Duration::from_secs(5)),
    }
}

/// Respond to any submitted line containing `marker` by feeding `response`
/// into the session buffer; ignore everything else.
fn spawn_responder(
    mut input_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    feed: mpsc::UnboundedSender<Vec<u8>>,
    marker: &str,
    response: &str,
) {
    let marker = marker.to_string();
    let response = response.as_bytes().to_vec();
    tokio::spawn(async move {
        while let Some(bytes) = input_rx.recv().await {
            let line = String::from_utf8_lossy(&bytes);
            if line.contains(&marker) {
                let _ = feed.send(response.clone());
            }
        }
    });
}

/// Wait until the session's dangling text equals `expected`.
async fn wait_for_pending(session: &Session, expected: &str) {
    for _ in 0..200 {
        if session.pending_output() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!(
        "pending output never became {:?}, got {:?}",
        expected,
        session.pending_output()
    );
}

#[tokio::test]
async fn test_dangling_text_round_trips_losslessly() {
    let prompt = Regex::new(PROMPT).unwrap();
    let (session, feed, input_rx) = Session::from_channels("t");

    // Bytes that arrive before the capture belong to nobody; they must
    // survive the call unmodified, after the new output.
    feed.send(b"stale-bytes".to_vec()).unwrap();
    wait_for_pending(&session, "stale-bytes").await;

    spawn_responder(
        input_rx,
        feed.clone(),
        "capture-eoe",
        "ok\r\n(visa) *** Unknown syntax: capture-eoe\r\n(visa) ",
    );

    let segments = capture_output(&session, spec("capture-eoe", &prompt), |s| {
        s.send("do-something")?;
        s.send("capture-eoe")
    })
    .await
    .unwrap();

    let captured = segments.join("|");
    assert!(captured.contains("ok"), "captured: {:?}", captured);
    assert!(
        !captured.contains("stale-bytes"),
        "dangling text leaked into capture: {:?}",
        captured
    );
    assert_eq!(session.pending_output(), "stale-bytes");
}

#[tokio::test]
async fn test_completion_needs_marker_and_prompt_after_it() {
    let prompt = Regex::new(PROMPT).unwrap();
    let (session, feed, mut input_rx) = Session::from_channels("t");

    // Feed the marker echo without a trailing prompt first; the prompt
    // follows only after a delay. The capture must not complete early.
    let feed2 = feed.clone();
    tokio::spawn(async move {
        while let Some(bytes) = input_rx.recv().await {
            if String::from_utf8_lossy(&bytes).contains("capture-eoe") {
                let _ = feed2.send(b"*** Unknown syntax: capture-eoe".to_vec());
                tokio::time::sleep(Duration::from_millis(30)).await;
                let _ = feed2.send(b"\r\n(visa) ".to_vec());
                break;
            }
        }
    });

    let segments = capture_output(&session, spec("capture-eoe", &prompt), |s| {
        s.send("capture-eoe")
    })
    .await
    .unwrap();

    // Two segments around the single prompt occurrence.
    assert_eq!(segments.len(), 2);
    assert!(segments[0].contains("Unknown syntax"));
}

#[tokio::test]
async fn test_prompt_segmentation_two_prompts_three_segments() {
    let prompt = Regex::new(PROMPT).unwrap();
    let (session, feed, input_rx) = Session::from_channels("t");

    spawn_responder(
        input_rx,
        feed.clone(),
        "capture-eoe",
        "42\r\n(visa) *** Unknown syntax: capture-eoe\r\n(visa) ",
    );

    let segments = capture_output(&session, spec("capture-eoe", &prompt), |s| {
        s.send("capture-eoe")
    })
    .await
    .unwrap();

    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0], "42\r\n");
    assert_eq!(segments[2], "");
}

#[tokio::test]
async fn test_stream_closed_mid_capture_fails_instead_of_hanging() {
    let prompt = Regex::new(PROMPT).unwrap();
    let (session, feed, mut input_rx) = Session::from_channels("t");

    // Responder that dies instead of answering.
    tokio::spawn(async move {
        let _ = input_rx.recv().await;
        drop(feed);
    });

    let err = capture_output(&session, spec("capture-eoe", &prompt), |s| {
        s.send("capture-eoe")
    })
    .await
    .unwrap_err();

    assert!(matches!(err, Error::StreamClosed { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_capture_times_out_when_configured() {
    let prompt = Regex::new(PROMPT).unwrap();
    let (session, _feed, _input_rx) = Session::from_channels("t");

    let mut s = spec("capture-eoe", &prompt);
    s.timeout = Some(Duration::from_millis(40));

    let err = capture_output(&session, s, |s| s.send("capture-eoe"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CaptureTimeout { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_concurrent_capture_on_same_session_is_refused() {
    let prompt = Regex::new(PROMPT).unwrap();
    let (session, _feed, _input_rx) = Session::from_channels("t");

    let background = session.clone();
    let first = tokio::spawn(async move {
        let prompt = Regex::new(PROMPT).unwrap();
        let spec = CaptureSpec {
            eoe_marker: "eoe-one",
            prompt: &prompt,
            strip_echo: false,
            full_body: "",
            settle_delay: Duration::from_millis(5),
            timeout: Some(Duration::from_secs(2)),
        };
        capture_output(&background, spec, |s| s.send("eoe-one")).await
    });

    // Let the first capture take the window.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = capture_output(&session, spec("eoe-two", &prompt), |s| s.send("eoe-two"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CaptureBusy { .. }), "got {:?}", err);

    first.abort();
}

#[tokio::test]
async fn test_cancelled_capture_leaves_session_usable() {
    let prompt = Regex::new(PROMPT).unwrap();
    let (session, feed, mut input_rx) = Session::from_channels("t");

    // Phase 1: nobody answers; abandon the capture via timeout-drop.
    {
        let fut = capture_output(&session, spec("eoe-one", &prompt), |s| s.send("eoe-one"));
        let aborted = tokio::time::timeout(Duration::from_millis(40), fut).await;
        assert!(aborted.is_err(), "capture should not have completed");
    }

    // Phase 2: a well-behaved responder answers only the second sentinel;
    // the same session must work normally.
    let feed2 = feed.clone();
    tokio::spawn(async move {
        while let Some(bytes) = input_rx.recv().await {
            if String::from_utf8_lossy(&bytes).contains("eoe-two") {
                let _ = feed2.send(
                    b"recovered\r\n(visa) *** Unknown syntax: eoe-two\r\n(visa) ".to_vec(),
                );
            }
        }
    });

    let segments = capture_output(&session, spec("eoe-two", &prompt), |s| s.send("eoe-two"))
        .await
        .unwrap();
    assert!(segments.join("|").contains("recovered"));
}

#[tokio::test]
async fn test_echo_stripping_through_capture() {
    let prompt = Regex::new(PROMPT).unwrap();
    let (session, feed, mut input_rx) = Session::from_channels("t");

    // Echo every submitted line back before answering the sentinel, the way
    // a pipe-connected REPL echoes typed input.
    let feed2 = feed.clone();
    tokio::spawn(async move {
        while let Some(bytes) = input_rx.recv().await {
            let line = String::from_utf8_lossy(&bytes).into_owned();
            let _ = feed2.send(line.replace('\n', "\r\n").into_bytes());
            if line.contains("capture-eoe") {
                let _ = feed2.send(b"result\r\n(visa) ".to_vec());
            }
        }
    });

    let mut s = spec("capture-eoe", &prompt);
    s.strip_echo = true;
    s.full_body = "the-body";

    let segments = capture_output(&session, s, |s| {
        s.send("the-body")?;
        s.send("capture-eoe")
    })
    .await
    .unwrap();

    let captured = segments.join("|");
    assert!(
        !captured.contains("the-body"),
        "echo not stripped: {:?}",
        captured
    );
    assert!(captured.contains("result"));
}
