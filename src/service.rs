//! Single-writer service around a [Session].
//!
//! One tokio task owns the session and the persistence adapter. Callers talk to it through a
//! cloneable [ServiceHandle]; every request is handled to completion before the next, so
//! operations never interleave. Remote snapshots from [PersistenceAdapter::subscribe] are merged
//! in the same loop, and queued records are flushed once no new operation has arrived for
//! [crate::config::Config::sync_debounce_ms].

use std::time::Duration;
use tokio::{
    sync::{
        mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
        oneshot,
    },
    time::{sleep_until, Instant},
};

use crate::{
    commands::Op,
    event::ThoughtEvent,
    persist::{PersistenceAdapter, SyncQueue, SyncReport},
    properties::Thought,
    session::Session,
    ThoughtError,
};

type ReadFn = Box<dyn FnOnce(&Session) + Send>;

enum Request {
    Apply(Op, oneshot::Sender<Result<Vec<ThoughtEvent>, ThoughtError>>),
    Read(ReadFn),
    Flush(oneshot::Sender<SyncReport>),
    Shutdown(oneshot::Sender<SyncReport>),
}

#[derive(Debug, Clone)]
pub struct ServiceHandle {
    tx: UnboundedSender<Request>,
}

fn stopped() -> ThoughtError {
    ThoughtError::Service("thought service has stopped".to_string())
}

impl ServiceHandle {
    pub async fn apply(&self, op: Op) -> Result<Vec<ThoughtEvent>, ThoughtError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Apply(op, reply))
            .map_err(|_| stopped())?;
        rx.await?
    }

    /// Run `f` against the current session state.
    pub async fn read<F, R>(&self, f: F) -> Result<R, ThoughtError>
    where
        F: FnOnce(&Session) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let read: ReadFn = Box::new(move |session| {
            let _ = reply.send(f(session));
        });
        self.tx.send(Request::Read(read)).map_err(|_| stopped())?;
        Ok(rx.await?)
    }

    /// Write everything queued so far without waiting for the debounce.
    pub async fn flush(&self) -> Result<SyncReport, ThoughtError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Request::Flush(reply)).map_err(|_| stopped())?;
        Ok(rx.await?)
    }

    /// Flush and stop the service task.
    pub async fn shutdown(self) -> Result<SyncReport, ThoughtError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Shutdown(reply))
            .map_err(|_| stopped())?;
        Ok(rx.await?)
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

pub struct ThoughtService;

impl ThoughtService {
    /// Subscribe to `adapter` and start the service task on the current tokio runtime. Every event
    /// the session produces is also forwarded to `events`, when given.
    pub fn spawn<A>(
        session: Session,
        adapter: A,
        events: Option<UnboundedSender<ThoughtEvent>>,
    ) -> Result<ServiceHandle, ThoughtError>
    where
        A: PersistenceAdapter + 'static,
    {
        let (tx, rx) = unbounded_channel();
        let (remote_tx, remote_rx) = unbounded_channel();
        adapter.subscribe(remote_tx)?;
        tokio::spawn(run(session, adapter, rx, remote_rx, events));
        Ok(ServiceHandle { tx })
    }
}

fn publish(events: &Option<UnboundedSender<ThoughtEvent>>, batch: &[ThoughtEvent]) {
    if let Some(tx) = events {
        for event in batch {
            if let Err(e) = tx.send(event.clone()) {
                tracing::debug!("[ThoughtService] event listener dropped: {}", ThoughtError::from(e));
                break;
            }
        }
    }
}

fn flush_queue(queue: &mut SyncQueue, session: &Session, adapter: &dyn PersistenceAdapter) -> SyncReport {
    let report = queue.flush(session.thoughts(), adapter);
    if !report.is_clean() {
        tracing::warn!(
            "[ThoughtService] {} records could not be persisted and stay queued",
            report.failed.len()
        );
    }
    report
}

/// Failed records stay queued; schedule another attempt after the quiet period.
fn retry_at(report: &SyncReport, debounce: Duration) -> Option<Instant> {
    (!report.is_clean()).then(|| Instant::now() + debounce)
}

async fn run<A: PersistenceAdapter>(
    mut session: Session,
    adapter: A,
    mut rx: UnboundedReceiver<Request>,
    mut remote_rx: UnboundedReceiver<Vec<Thought>>,
    events: Option<UnboundedSender<ThoughtEvent>>,
) {
    tracing::info!("[ThoughtService] starting with {}", session.thoughts());
    let debounce = Duration::from_millis(session.config().sync_debounce_ms);
    let mut queue = SyncQueue::default();
    let mut deadline: Option<Instant> = None;

    loop {
        let flush_at = deadline;
        tokio::select! {
            request = rx.recv() => match request {
                Some(Request::Apply(op, reply)) => {
                    let result = session.apply(op);
                    if let Ok(batch) = &result {
                        queue.enqueue(batch);
                        publish(&events, batch);
                        if !queue.is_empty() {
                            deadline = Some(Instant::now() + debounce);
                        }
                    }
                    let _ = reply.send(result);
                }
                Some(Request::Read(read)) => read(&session),
                Some(Request::Flush(reply)) => {
                    let report = flush_queue(&mut queue, &session, &adapter);
                    deadline = retry_at(&report, debounce);
                    let _ = reply.send(report);
                }
                Some(Request::Shutdown(reply)) => {
                    let _ = reply.send(flush_queue(&mut queue, &session, &adapter));
                    break;
                }
                None => {
                    flush_queue(&mut queue, &session, &adapter);
                    break;
                }
            },
            Some(snapshot) = remote_rx.recv() => {
                tracing::debug!("[ThoughtService] merging remote snapshot of {} records", snapshot.len());
                match session.apply(Op::Merge(snapshot)) {
                    Ok(batch) => {
                        queue.enqueue(&batch);
                        publish(&events, &batch);
                        if !queue.is_empty() && deadline.is_none() {
                            deadline = Some(Instant::now() + debounce);
                        }
                    }
                    Err(e) => tracing::warn!("[ThoughtService] rejected remote snapshot: {e}"),
                }
            }
            _ = sleep_until(flush_at.unwrap_or_else(Instant::now)), if flush_at.is_some() => {
                let report = flush_queue(&mut queue, &session, &adapter);
                deadline = retry_at(&report, debounce);
                tracing::debug!(
                    "[ThoughtService] debounced flush wrote {} and removed {} records",
                    report.written,
                    report.removed
                );
            }
        }
    }
    tracing::info!("[ThoughtService] stopped");
}
