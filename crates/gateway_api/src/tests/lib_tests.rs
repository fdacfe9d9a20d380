use super::*;
use async_trait::async_trait;
use device_link::{LinkConfig, SerialConnector, SerialSession, DEFAULT_BAUD_RATE};
use serde_json::json;
use std::{io, sync::Mutex, time::Duration};

#[derive(Default)]
struct Recorder {
    attempts: Vec<String>,
    written: Vec<String>,
}

struct ScriptedConnector {
    reachable: Vec<&'static str>,
    recorder: Arc<Mutex<Recorder>>,
}

struct ScriptedSession {
    recorder: Arc<Mutex<Recorder>>,
}

#[async_trait]
impl SerialConnector for ScriptedConnector {
    async fn open(&self, address: &str, _baud_rate: u32) -> io::Result<Box<dyn SerialSession>> {
        self.recorder
            .lock()
            .expect("lock")
            .attempts
            .push(address.to_string());
        if !self.reachable.iter().any(|port| *port == address) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "busy"));
        }
        Ok(Box::new(ScriptedSession {
            recorder: self.recorder.clone(),
        }))
    }
}

#[async_trait]
impl SerialSession for ScriptedSession {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.recorder
            .lock()
            .expect("lock")
            .written
            .push(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn read_lines(&mut self, _window: Duration) -> io::Result<Vec<String>> {
        Ok(vec!["OK".to_string()])
    }

    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn setup(reachable: Vec<&'static str>) -> (ApiContext, Arc<Mutex<Recorder>>) {
    let recorder = Arc::new(Mutex::new(Recorder::default()));
    let connector = ScriptedConnector {
        reachable,
        recorder: recorder.clone(),
    };
    let link = DeviceLink::new(
        Arc::new(connector),
        LinkConfig {
            settle_delay: Duration::ZERO,
            ack_window: Duration::ZERO,
        },
    );
    (
        ApiContext {
            link: Arc::new(link),
            candidates: vec!["/dev/ttyUSB0".into(), "/dev/ttyACM0".into()],
            default_baud_rate: DEFAULT_BAUD_RATE,
        },
        recorder,
    )
}

fn written(recorder: &Arc<Mutex<Recorder>>) -> Vec<String> {
    recorder.lock().expect("lock").written.clone()
}

fn five_fingers_up() -> Value {
    json!({
        "thumbTip": {"x": 0.5, "y": 0.2, "confidence": 0.9},
        "indexTip": {"x": 0.5, "y": 0.2, "confidence": 0.9},
        "middleTip": {"x": 0.5, "y": 0.2, "confidence": 0.9},
        "ringTip": {"x": 0.5, "y": 0.2, "confidence": 0.9},
        "pinkyTip": {"x": 0.5, "y": 0.2, "confidence": 0.9}
    })
}

#[tokio::test]
async fn connect_without_port_walks_candidates() {
    let (ctx, recorder) = setup(vec!["/dev/ttyACM0"]);
    let response = connect(&ctx, ConnectRequest::default())
        .await
        .expect("connect");
    assert!(response.success);
    assert_eq!(
        recorder.lock().expect("lock").attempts,
        vec!["/dev/ttyUSB0".to_string(), "/dev/ttyACM0".to_string()]
    );

    let status = status(&ctx).await;
    assert!(status.device_connected);
    assert_eq!(status.port.as_deref(), Some("/dev/ttyACM0"));
}

#[tokio::test]
async fn connect_to_unreachable_port_reports_connect_failed() {
    let (ctx, _recorder) = setup(vec![]);
    let err = connect(
        &ctx,
        ConnectRequest {
            port: Some("/dev/ttyUSB9".into()),
            baud_rate: None,
        },
    )
    .await
    .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::ConnectFailed);
    assert!(!status(&ctx).await.device_connected);
}

#[tokio::test]
async fn commands_fail_with_link_unavailable_before_connect() {
    let (ctx, recorder) = setup(vec!["/dev/ttyUSB0"]);
    let err = send_gesture(&ctx, "石头").await.expect_err("should fail");
    assert_eq!(err.code, ErrorCode::LinkUnavailable);
    assert!(written(&recorder).is_empty());
}

#[tokio::test]
async fn invalid_digit_is_never_forwarded() {
    let (ctx, recorder) = setup(vec!["/dev/ttyUSB0"]);
    connect(&ctx, ConnectRequest::default())
        .await
        .expect("connect");

    for bad in ["12", "x", ""] {
        let err = send_number(&ctx, bad).await.expect_err("should fail");
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }
    assert!(written(&recorder).is_empty());

    send_number(&ctx, "7").await.expect("digit");
    assert_eq!(written(&recorder), vec!["7\n".to_string()]);
}

#[tokio::test]
async fn every_route_family_reaches_the_wire() {
    let (ctx, recorder) = setup(vec!["/dev/ttyUSB0"]);
    connect(&ctx, ConnectRequest::default())
        .await
        .expect("connect");

    let sent = send_gesture(&ctx, "剪刀").await.expect("gesture");
    assert_eq!(sent.command.as_deref(), Some("SCISSORS"));
    assert_eq!(sent.acknowledgements, vec!["OK".to_string()]);
    send_rps(&ctx, "paper").await.expect("rps");
    send_raw(&ctx, "WAVE").await.expect("raw");
    send_structural(&ctx, StructuralCommand::FullOpen)
        .await
        .expect("open");
    send_structural(&ctx, StructuralCommand::Reset)
        .await
        .expect("reset");
    send_servo(&ctx, 4, 90).await.expect("servo");

    assert_eq!(
        written(&recorder),
        vec![
            "SCISSORS\n".to_string(),
            "PAPER\n".to_string(),
            "WAVE\n".to_string(),
            "OPENMAX\n".to_string(),
            "RESET\n".to_string(),
            "SERVO:4:90\n".to_string(),
        ]
    );
}

#[tokio::test]
async fn rps_rejects_non_rps_gesture() {
    let (ctx, _recorder) = setup(vec!["/dev/ttyUSB0"]);
    let err = send_rps(&ctx, "WAVE").await.expect_err("should fail");
    assert_eq!(err.code, ErrorCode::InvalidArgument);
}

#[tokio::test]
async fn analyze_without_actuation_leaves_device_alone() {
    let (ctx, recorder) = setup(vec!["/dev/ttyUSB0"]);
    connect(&ctx, ConnectRequest::default())
        .await
        .expect("connect");

    let response = analyze_hand(&ctx, &five_fingers_up(), false).await;
    assert_eq!(response.gesture, shared::domain::GestureLabel::Paper);
    assert_eq!(response.confidence, 0.9);
    assert_eq!(response.fingers.len(), 5);
    assert!(response.command.is_none());
    assert!(written(&recorder).is_empty());
}

#[tokio::test]
async fn analyze_with_actuation_reports_send_failure_separately() {
    let (ctx, _recorder) = setup(vec![]);
    let response = analyze_hand(&ctx, &five_fingers_up(), true).await;
    assert!(response.success);
    let command = response.command.expect("command outcome");
    assert!(!command.success);
}

#[test]
fn incomplete_payload_classifies_as_unknown() {
    let response = classify_payload(&json!({ "indexTip": {"x": 0.5, "y": 0.2, "confidence": 0.9} }));
    assert_eq!(response.gesture, shared::domain::GestureLabel::Unknown);
    assert_eq!(response.confidence, 0.0);
    assert!(response.success);
    assert!(response.fingers.is_empty());
}
