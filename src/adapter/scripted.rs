//! Deterministic scan sampler for tests and offline demos.
//!
//! Plays back a fixed script of request outcomes, records every request it
//! receives, and can hold a scan "in flight" until the caller releases it,
//! which is how stale-result discarding is exercised.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::domain::ScanObservation;
use crate::error::SampleError;
use crate::port::{ScanOutcome, ScanSampler, ScanTicket};

/// One scripted response to a scan request.
#[derive(Clone, Debug)]
pub enum ScanScript {
    /// Refuse the request itself (`request_scan` returns `Err`).
    Refuse,
    /// Accept the request and deliver these observations.
    Deliver(Vec<ScanObservation>),
    /// Accept the request but deliver a scan failure.
    Fail,
    /// Accept the request and hold the result until
    /// [`ScriptedSampler::deliver_pending`] is called.
    Pending,
}

/// Sampler that replays a [`ScanScript`] sequence.
///
/// Once the script is exhausted every further request is refused, so a loop
/// that outlives its script settles into backoff instead of panicking.
pub struct ScriptedSampler {
    script: Mutex<VecDeque<ScanScript>>,
    requests: Mutex<Vec<Instant>>,
    pending: Mutex<Vec<oneshot::Sender<ScanOutcome>>>,
}

impl ScriptedSampler {
    /// Create a shared sampler that will play back `script` in order.
    pub fn new(script: Vec<ScanScript>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Number of scan requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// The (tokio) instants at which requests arrived.
    pub fn request_instants(&self) -> Vec<Instant> {
        self.requests.lock().clone()
    }

    /// Release the oldest held `Pending` scan with the given outcome.
    ///
    /// Delivery into an abandoned ticket is silently dropped, exactly like
    /// a platform broadcast arriving after the listener unregistered.
    pub fn deliver_pending(&self, outcome: ScanOutcome) {
        if let Some(tx) = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                None
            } else {
                Some(pending.remove(0))
            }
        } {
            let _ = tx.send(outcome);
        }
    }
}

impl ScanSampler for ScriptedSampler {
    fn request_scan(&self) -> Result<ScanTicket, SampleError> {
        self.requests.lock().push(Instant::now());

        let step = self.script.lock().pop_front();
        match step {
            Some(ScanScript::Refuse) | None => Err(SampleError::RequestFailed {
                reason: "scripted refusal".to_owned(),
            }),
            Some(ScanScript::Deliver(observations)) => {
                let (tx, ticket) = ScanTicket::new();
                let _ = tx.send(Ok(observations));
                Ok(ticket)
            }
            Some(ScanScript::Fail) => {
                let (tx, ticket) = ScanTicket::new();
                let _ = tx.send(Err(SampleError::ScanFailed {
                    reason: "scripted failure".to_owned(),
                }));
                Ok(ticket)
            }
            Some(ScanScript::Pending) => {
                let (tx, ticket) = ScanTicket::new();
                self.pending.lock().push(tx);
                Ok(ticket)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BssidId;

    fn obs(level: i32) -> ScanObservation {
        ScanObservation {
            bssid: BssidId([0, 1, 2, 3, 4, 5]),
            ssid: "net".to_owned(),
            level_dbm: level,
        }
    }

    #[tokio::test]
    async fn plays_script_in_order() {
        let sampler = ScriptedSampler::new(vec![
            ScanScript::Refuse,
            ScanScript::Deliver(vec![obs(-40)]),
        ]);

        assert!(sampler.request_scan().is_err());
        let ticket = sampler.request_scan().unwrap();
        let delivered = ticket.recv().await.unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(sampler.request_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_script_refuses() {
        let sampler = ScriptedSampler::new(Vec::new());
        assert!(sampler.request_scan().is_err());
    }

    #[tokio::test]
    async fn pending_delivers_on_release() {
        let sampler = ScriptedSampler::new(vec![ScanScript::Pending]);
        let ticket = sampler.request_scan().unwrap();
        sampler.deliver_pending(Ok(vec![obs(-50)]));
        assert_eq!(ticket.recv().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pending_into_dropped_ticket_is_silent() {
        let sampler = ScriptedSampler::new(vec![ScanScript::Pending]);
        let ticket = sampler.request_scan().unwrap();
        drop(ticket);
        sampler.deliver_pending(Ok(vec![obs(-50)]));
    }
}
