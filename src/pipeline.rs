//! Amplifier pipelines.
//!
//! Several processors run in parallel, one OS thread each, communicating
//! exclusively through bounded blocking channels. Two topologies are built
//! from the same wiring:
//!
//! - **Linear chain**: stage *i* reads channel *i* and writes channel *i*+1;
//!   the orchestrator reads the final channel once for the result.
//! - **Feedback ring**: the last stage's output channel is the first stage's
//!   input channel. The ring has no natural "last" stage, so completion is
//!   detected by counting an explicit done signal from every stage rather
//!   than by channel closure; the result is the last value left on
//!   channel 0.
//!
//! Each stage's input channel is pre-seeded with its phase setting, and
//! channel 0 additionally with the initial signal, so the first value every
//! stage consumes is deterministically its own phase.

use crate::vm::{Device, DeviceFault, Processor, VmError, Word};
use itertools::Itertools;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use thiserror::Error;

/// Phase alphabet for the linear chain search.
pub const CHAIN_PHASES: [Word; 5] = [0, 1, 2, 3, 4];

/// Phase alphabet for the feedback ring search.
pub const RING_PHASES: [Word; 5] = [5, 6, 7, 8, 9];

/// Chain channel capacity: a phase setting plus one in-flight signal.
const CHAIN_CAPACITY: usize = 2;

/// Ring channel capacity. Generously oversized so that no stage's output
/// ever blocks on a consumer that is still draining upstream work; an exact
/// flow-control bound is not worth proving here.
const RING_CAPACITY: usize = 1 << 16;

/// Device wiring one stage into a pipeline: input from one channel, output
/// to the next, with an optional completion signal fired on halt.
pub struct ChannelDevice {
    rx: Receiver<Word>,
    tx: SyncSender<Word>,
    done: Option<SyncSender<()>>,
}

impl ChannelDevice {
    fn new(rx: Receiver<Word>, tx: SyncSender<Word>, done: Option<SyncSender<()>>) -> Self {
        Self { rx, tx, done }
    }

    /// Recover the input endpoint once the stage has finished, so the
    /// orchestrator can read what is left on it.
    fn into_receiver(self) -> Receiver<Word> {
        self.rx
    }
}

impl Device for ChannelDevice {
    fn read_word(&mut self) -> Result<Word, DeviceFault> {
        self.rx.recv().map_err(|_| DeviceFault::Disconnected)
    }

    fn write_word(&mut self, word: Word) -> Result<(), DeviceFault> {
        self.tx.send(word).map_err(|_| DeviceFault::Disconnected)
    }

    fn notify_halt(&mut self) {
        if let Some(done) = &self.done {
            // The orchestrator may already have stopped listening after a
            // fault elsewhere; that is not this stage's problem.
            let _ = done.send(());
        }
    }
}

/// Errors surfaced by pipeline orchestration.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("at least one phase setting is required")]
    Empty,

    #[error("stage {stage} faulted: {source}")]
    Stage { stage: usize, source: VmError },

    #[error("stage {stage} panicked")]
    Panicked { stage: usize },

    #[error("pipeline finished without producing a result")]
    NoResult,
}

/// Run a linear chain of one processor per phase setting.
///
/// Every stage loads its own copy of `image`. Stage 0 is seeded with its
/// phase followed by `signal`; every other stage with its phase only.
/// Returns the first word the last stage emits.
pub fn run_chain(image: &[Word], phases: &[Word], signal: Word) -> Result<Word, PipelineError> {
    if phases.is_empty() {
        return Err(PipelineError::Empty);
    }
    let stage_count = phases.len();

    let (txs, mut rxs): (Vec<SyncSender<Word>>, Vec<Receiver<Word>>) = (0..=stage_count)
        .map(|_| mpsc::sync_channel(CHAIN_CAPACITY))
        .unzip();

    for (tx, &phase) in txs.iter().zip(phases) {
        tx.send(phase).expect("receiver is still held here");
    }
    txs[0].send(signal).expect("receiver is still held here");

    let result_rx = rxs.pop().expect("one channel per stage plus the result channel");

    let handles: Vec<_> = rxs
        .into_iter()
        .zip(txs.into_iter().skip(1))
        .map(|(rx, tx)| {
            let mut stage = Processor::with_program(image, ChannelDevice::new(rx, tx, None));
            thread::spawn(move || stage.run().map(|_| stage))
        })
        .collect();

    // Blocks until the last stage outputs. If any stage faults instead, the
    // disconnection cascades down the chain and this read fails; the joins
    // below then surface the original fault.
    let result = result_rx.recv();

    join_stages(handles)?;

    result.map_err(|_| PipelineError::NoResult)
}

/// Run a feedback ring of one processor per phase setting.
///
/// Identical per-stage construction to [`run_chain`], except the last
/// stage's output channel *is* channel 0. Stages keep trading signal values
/// around the cycle until every one of them reaches its halt instruction;
/// the loaded program, not the orchestrator, decides when that happens.
/// Returns the last value left on channel 0 after all stages have signalled
/// completion.
pub fn run_ring(image: &[Word], phases: &[Word], signal: Word) -> Result<Word, PipelineError> {
    if phases.is_empty() {
        return Err(PipelineError::Empty);
    }
    let stage_count = phases.len();

    let (mut txs, rxs): (Vec<SyncSender<Word>>, Vec<Receiver<Word>>) = (0..stage_count)
        .map(|_| mpsc::sync_channel(RING_CAPACITY))
        .unzip();

    for (tx, &phase) in txs.iter().zip(phases) {
        tx.send(phase).expect("receiver is still held here");
    }
    txs[0].send(signal).expect("receiver is still held here");

    // Stage i writes to channel (i + 1) mod N.
    txs.rotate_left(1);

    let (done_tx, done_rx) = mpsc::sync_channel(stage_count);

    let handles: Vec<_> = rxs
        .into_iter()
        .zip(txs)
        .map(|(rx, tx)| {
            let device = ChannelDevice::new(rx, tx, Some(done_tx.clone()));
            let mut stage = Processor::with_program(image, device);
            thread::spawn(move || stage.run().map(|_| stage))
        })
        .collect();
    drop(done_tx);

    // Completion order across stages is unspecified; only completeness
    // matters. A fault anywhere drops that stage's done sender, the recv
    // fails, and the joins below report the cause.
    for _ in 0..stage_count {
        if done_rx.recv().is_err() {
            break;
        }
    }

    let stages = join_stages(handles)?;

    let result_rx = stages
        .into_iter()
        .next()
        .ok_or(PipelineError::Empty)?
        .into_device()
        .into_receiver();

    let mut result = None;
    while let Ok(word) = result_rx.try_recv() {
        result = Some(word);
    }
    result.ok_or(PipelineError::NoResult)
}

/// Highest chain signal over every permutation of [`CHAIN_PHASES`].
pub fn best_chain_signal(image: &[Word]) -> Result<Word, PipelineError> {
    best_signal(image, &CHAIN_PHASES, run_chain)
}

/// Highest ring signal over every permutation of [`RING_PHASES`].
pub fn best_ring_signal(image: &[Word]) -> Result<Word, PipelineError> {
    best_signal(image, &RING_PHASES, run_ring)
}

fn best_signal(
    image: &[Word],
    alphabet: &[Word],
    run: fn(&[Word], &[Word], Word) -> Result<Word, PipelineError>,
) -> Result<Word, PipelineError> {
    let mut best = None;
    for phases in alphabet.iter().copied().permutations(alphabet.len()) {
        let signal = run(image, &phases, 0)?;
        best = Some(best.map_or(signal, |b: Word| b.max(signal)));
    }
    best.ok_or(PipelineError::Empty)
}

fn join_stages(
    handles: Vec<thread::JoinHandle<Result<Processor<ChannelDevice>, VmError>>>,
) -> Result<Vec<Processor<ChannelDevice>>, PipelineError> {
    let mut stages = Vec::with_capacity(handles.len());
    for (stage, handle) in handles.into_iter().enumerate() {
        let joined = handle
            .join()
            .map_err(|_| PipelineError::Panicked { stage })?;
        stages.push(joined.map_err(|source| PipelineError::Stage { stage, source })?);
    }
    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reads its phase setting, then echoes the signal through
    const ECHO: [Word; 9] = [3, 7, 3, 8, 4, 8, 99, 0, 0];

    const CHAIN_SAMPLE_1: [Word; 17] = [
        3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0,
    ];
    const CHAIN_SAMPLE_2: [Word; 25] = [
        3, 23, 3, 24, 1002, 24, 10, 24, 1002, 23, -1, 23, 101, 5, 23, 23, 1, 24, 23, 23, 4, 23,
        99, 0, 0,
    ];
    const CHAIN_SAMPLE_3: [Word; 34] = [
        3, 31, 3, 32, 1002, 32, 10, 32, 1001, 31, -2, 31, 1007, 31, 0, 33, 1002, 33, 7, 33, 1,
        33, 31, 31, 1, 32, 31, 31, 4, 31, 99, 0, 0, 0,
    ];

    const RING_SAMPLE_1: [Word; 29] = [
        3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
        1005, 28, 6, 99, 0, 0, 5,
    ];
    const RING_SAMPLE_2: [Word; 57] = [
        3, 52, 1001, 52, -5, 52, 3, 53, 1, 52, 56, 54, 1007, 54, 5, 55, 1005, 55, 26, 1001, 54,
        -5, 54, 1105, 1, 12, 1, 53, 54, 53, 1008, 54, 0, 55, 1001, 55, 1, 55, 2, 53, 55, 53, 4,
        53, 1001, 56, -1, 56, 1005, 56, 6, 99, 0, 0, 0, 0, 10,
    ];

    #[test]
    fn test_single_stage_chain_echoes_signal() {
        assert_eq!(run_chain(&ECHO, &[7], 42).unwrap(), 42);
    }

    #[test]
    fn test_chain_sample_outputs() {
        assert_eq!(run_chain(&CHAIN_SAMPLE_1, &[4, 3, 2, 1, 0], 0).unwrap(), 43210);
        assert_eq!(run_chain(&CHAIN_SAMPLE_2, &[0, 1, 2, 3, 4], 0).unwrap(), 54321);
        assert_eq!(run_chain(&CHAIN_SAMPLE_3, &[1, 0, 4, 3, 2], 0).unwrap(), 65210);
    }

    #[test]
    fn test_chain_search_finds_maximum() {
        assert_eq!(best_chain_signal(&CHAIN_SAMPLE_1).unwrap(), 43210);
        assert_eq!(best_chain_signal(&CHAIN_SAMPLE_2).unwrap(), 54321);
        assert_eq!(best_chain_signal(&CHAIN_SAMPLE_3).unwrap(), 65210);
    }

    #[test]
    fn test_ring_sample_outputs() {
        assert_eq!(
            run_ring(&RING_SAMPLE_1, &[9, 8, 7, 6, 5], 0).unwrap(),
            139629729
        );
        assert_eq!(run_ring(&RING_SAMPLE_2, &[9, 7, 8, 5, 6], 0).unwrap(), 18216);
    }

    #[test]
    fn test_ring_search_finds_maximum() {
        assert_eq!(best_ring_signal(&RING_SAMPLE_1).unwrap(), 139629729);
        assert_eq!(best_ring_signal(&RING_SAMPLE_2).unwrap(), 18216);
    }

    #[test]
    fn test_chain_is_deterministic() {
        let first = run_chain(&CHAIN_SAMPLE_1, &[4, 3, 2, 1, 0], 0).unwrap();
        let second = run_chain(&CHAIN_SAMPLE_1, &[4, 3, 2, 1, 0], 0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_phases_is_an_error() {
        assert!(matches!(run_chain(&ECHO, &[], 0), Err(PipelineError::Empty)));
        assert!(matches!(run_ring(&ECHO, &[], 0), Err(PipelineError::Empty)));
    }

    #[test]
    fn test_stage_fault_is_reported_with_its_index() {
        // Invalid opcode faults every stage; the chain must not hang and the
        // error must name a stage.
        let bad = [98, 0, 0, 0];
        match run_chain(&bad, &[0, 1], 0) {
            Err(PipelineError::Stage { source, .. }) => {
                assert!(matches!(source, VmError::Decode { .. }));
            }
            other => panic!("expected a stage fault, got {other:?}"),
        }
    }

    #[test]
    fn test_ring_fault_does_not_hang() {
        let bad = [98, 0, 0, 0];
        assert!(matches!(
            run_ring(&bad, &[5, 6, 7], 0),
            Err(PipelineError::Stage { .. })
        ));
    }
}
