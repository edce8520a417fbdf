use crate::pipeline::batch::{CancelToken, NoisePipeline, PipelineOutcome, Progress};
use crate::types::{NoiseError, NoiseResult};
use crossbeam_channel::{unbounded, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

/// Messages sent from a background run to its owner
#[derive(Debug)]
pub enum PipelineEvent {
    Progress(Progress),
    /// Last event of every run
    Finished(NoiseResult<PipelineOutcome>),
}

/// Owner's side of a pipeline running on a worker thread
pub struct PipelineHandle {
    events: Receiver<PipelineEvent>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

/// Run `pipeline` on a dedicated thread, streaming progress back over a channel
pub fn spawn_pipeline(mut pipeline: NoisePipeline) -> NoiseResult<PipelineHandle> {
    let (sender, events) = unbounded();
    let cancel = pipeline.cancel_token();

    let worker = thread::Builder::new()
        .name("bandnoise-pipeline".to_string())
        .spawn(move || {
            let progress_sender = sender.clone();
            let result = pipeline.run_with_progress(|progress| {
                // the owner may have dropped the handle; keep running regardless
                let _ = progress_sender.send(PipelineEvent::Progress(progress.clone()));
            });
            if let Err(e) = &result {
                log::error!("Pipeline run failed: {}", e);
            }
            let _ = sender.send(PipelineEvent::Finished(result));
        })?;

    Ok(PipelineHandle {
        events,
        cancel,
        worker: Some(worker),
    })
}

impl PipelineHandle {
    /// Ask the run to stop before its next unit of work
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }

    /// Events that arrived since the last call, without blocking
    pub fn try_events(&self) -> Vec<PipelineEvent> {
        let mut drained = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => drained.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }

    /// Block until the run ends, passing every progress event to `on_progress`
    pub fn wait_with_progress<F>(mut self, mut on_progress: F) -> NoiseResult<PipelineOutcome>
    where
        F: FnMut(&Progress),
    {
        let mut finished = None;
        while let Ok(event) = self.events.recv() {
            match event {
                PipelineEvent::Progress(progress) => on_progress(&progress),
                PipelineEvent::Finished(result) => {
                    finished = Some(result);
                    break;
                }
            }
        }

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                return Err(NoiseError::Worker("panicked".to_string()));
            }
        }

        finished.unwrap_or_else(|| Err(NoiseError::Worker("exited without a result".to_string())))
    }

    pub fn wait(self) -> NoiseResult<PipelineOutcome> {
        self.wait_with_progress(|_| {})
    }
}
