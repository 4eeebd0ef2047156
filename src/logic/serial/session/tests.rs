use super::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::logic::board::RiskBoard;
use crate::logic::risk::{MemoryRiskStore, RiskMapper, RiskStore, Topology, UpdateMode};

enum Step {
    Data(&'static [u8]),
    Fail,
    Hang,
}

struct ScriptedTransport {
    steps: VecDeque<Step>,
    fail_open: bool,
    closed: Arc<AtomicBool>,
}

impl ScriptedTransport {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            fail_open: false,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Transport for ScriptedTransport {
    async fn open(&mut self) -> io::Result<()> {
        if self.fail_open {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "port busy"));
        }
        Ok(())
    }

    async fn read_chunk(&mut self) -> io::Result<ReadChunk> {
        match self.steps.pop_front() {
            Some(Step::Data(bytes)) => Ok(ReadChunk::Data(bytes.to_vec())),
            Some(Step::Fail) => Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged")),
            Some(Step::Hang) => std::future::pending().await,
            None => Ok(ReadChunk::Eof),
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn pipeline(store: Arc<MemoryRiskStore>) -> RiskPipeline {
    let mapper = RiskMapper::new(Topology::builtin(), UpdateMode::Overwrite).unwrap();
    let store: Arc<dyn RiskStore> = store;
    RiskPipeline::new(mapper, store, RiskBoard::new()).unwrap()
}

#[tokio::test]
async fn test_split_chunks_reach_pipeline_until_eof() {
    let store = Arc::new(MemoryRiskStore::new());
    let mut pipeline = pipeline(store.clone());
    let transport = ScriptedTransport::new(vec![
        Step::Data(b"{\"wat"),
        Step::Data(b""),
        Step::Data(b"er1\": 1801}\r\n{\"smo"),
        Step::Data(b"ke2\": 3001}\n{\"tilt1\""),
    ]);

    let mut session = SerialSession::connect(transport, FrameDecoder::default())
        .await
        .unwrap();
    let summary = session.run(&mut pipeline, &StopSignal::new()).await.unwrap();

    assert_eq!(summary.reason, StopReason::EndOfStream);
    assert_eq!(summary.chunks_read, 4);
    assert_eq!(summary.lines_decoded, 2);
    assert_eq!(summary.fragment_dropped, b"{\"tilt1\"".len());

    // Overwrite semantics: the second record zeroed the first edge
    assert!(pipeline.state()["Dehradun-Haridwar"].is_clear());
    assert_eq!(pipeline.state()["Mussoorie-Chamba"].fire, 4);
    assert_eq!(pipeline.state()["Haridwar-Rishikesh"].landslide, 0);
    assert_eq!(store.writes(), 2);
}

#[tokio::test]
async fn test_stop_signal_ends_idle_loop_without_fragment() {
    let store = Arc::new(MemoryRiskStore::new());
    let mut pipeline = pipeline(store.clone());
    let transport = ScriptedTransport::new(vec![
        Step::Data(b"{\"vibration\": 1}\n{\"water1\": 2000"),
        Step::Hang,
    ]);
    let closed = transport.closed.clone();

    let mut session = SerialSession::connect(transport, FrameDecoder::default())
        .await
        .unwrap();
    let stop = StopSignal::new();
    let stopper = {
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stop.stop();
        })
    };

    let summary = tokio::time::timeout(Duration::from_secs(2), session.run(&mut pipeline, &stop))
        .await
        .expect("loop should observe stop")
        .unwrap();
    stopper.await.unwrap();

    assert_eq!(summary.reason, StopReason::Stopped);
    assert_eq!(summary.lines_decoded, 1);
    assert!(summary.fragment_dropped > 0);
    assert_eq!(pipeline.state()["Dehradun-Mussoorie"].earthquake, 1);
    assert!(pipeline.state()["Dehradun-Haridwar"].is_clear());
    assert_eq!(store.writes(), 1);

    session.disconnect().await.unwrap();
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_stop_before_run_reads_nothing() {
    let store = Arc::new(MemoryRiskStore::new());
    let mut pipeline = pipeline(store.clone());
    let transport = ScriptedTransport::new(vec![Step::Data(b"{\"tilt2\": 1}\n")]);

    let mut session = SerialSession::connect(transport, FrameDecoder::default())
        .await
        .unwrap();
    let stop = StopSignal::new();
    stop.stop();

    let summary = session.run(&mut pipeline, &stop).await.unwrap();
    assert_eq!(summary.reason, StopReason::Stopped);
    assert_eq!(summary.chunks_read, 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_transport_error_terminates_loop() {
    let store = Arc::new(MemoryRiskStore::new());
    let mut pipeline = pipeline(store.clone());
    let transport = ScriptedTransport::new(vec![
        Step::Data(b"{\"smoke1\": 1600}\n"),
        Step::Fail,
        Step::Data(b"{\"smoke1\": 0}\n"),
    ]);

    let mut session = SerialSession::connect(transport, FrameDecoder::default())
        .await
        .unwrap();
    let result = session.run(&mut pipeline, &StopSignal::new()).await;

    assert!(matches!(result, Err(SessionError::Transport(e)) if e.kind() == io::ErrorKind::BrokenPipe));
    assert_eq!(pipeline.state()["Dehradun-Rishikesh"].fire, 4);
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_bad_lines_do_not_abort_stream() {
    let store = Arc::new(MemoryRiskStore::new());
    let mut pipeline = pipeline(store.clone());
    let transport = ScriptedTransport::new(vec![Step::Data(
        b"ESP32 ready\n{\"water1\": }\n\n{\"water2\": 1801}\n",
    )]);

    let mut session = SerialSession::connect(transport, FrameDecoder::default())
        .await
        .unwrap();
    let summary = session.run(&mut pipeline, &StopSignal::new()).await.unwrap();

    assert_eq!(summary.lines_decoded, 4);
    assert_eq!(pipeline.state()["Mussoorie-Rishikesh"].flood, 3);
    let stats = pipeline.stats();
    assert_eq!(stats.rejected_non_json, 1);
    assert_eq!(stats.rejected_malformed, 1);
    assert_eq!(stats.empty_skipped, 1);
    assert_eq!(stats.records_applied, 1);
}

#[tokio::test]
async fn test_persistence_failure_terminates_loop() {
    let store = Arc::new(MemoryRiskStore::new());
    let mut pipeline = pipeline(store.clone());
    store.set_fail_writes(true);
    let transport = ScriptedTransport::new(vec![Step::Data(
        b"{\"tilt1\": 1}\n{\"tilt2\": 1}\n{\"smoke1\": 1}\n{\"tilt",
    )]);

    let mut session = SerialSession::connect(transport, FrameDecoder::default())
        .await
        .unwrap();
    let result = session.run(&mut pipeline, &StopSignal::new()).await;

    assert!(matches!(result, Err(SessionError::Persistence(_))));
    assert_eq!(pipeline.stats().lines_seen, 1);

    // Complete lines left in the buffer are dropped, not treated as a fragment
    let decoder = session.decoder();
    assert_eq!(decoder.lines_emitted(), 1);
    assert_eq!(decoder.pending_len(), 0);
    let dropped = b"{\"tilt2\": 1}\n{\"smoke1\": 1}\n{\"tilt".len();
    assert_eq!(decoder.bytes_dropped(), dropped as u64);
}

#[tokio::test]
async fn test_open_failure() {
    let mut transport = ScriptedTransport::new(vec![]);
    transport.fail_open = true;

    let result = SerialSession::connect(transport, FrameDecoder::default()).await;
    assert!(matches!(result, Err(SessionError::Open(_))));
}
