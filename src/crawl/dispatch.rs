//! Leaf job enumeration and the producer side of the bounded job queue.

use crate::area::{Level, StreetJob};
use crate::hierarchy::HierarchyIndex;
use crate::runtime::telemetry::Telemetry;
use anyhow::Result;
use std::sync::Arc;
use tokio::select;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

pub type JobSender = mpsc::Sender<StreetJob>;

/// Consumer handle shared by every worker. Cloning shares the same receiver.
#[derive(Debug, Clone)]
pub struct JobQueue {
    receiver: Arc<Mutex<mpsc::Receiver<StreetJob>>>,
}

impl JobQueue {
    /// Next job, or `None` once the sender is dropped and the queue drained.
    pub async fn next(&self) -> Option<StreetJob> {
        self.receiver.lock().await.recv().await
    }
}

pub fn job_queue(capacity: usize) -> (JobSender, JobQueue) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        sender,
        JobQueue {
            receiver: Arc::new(Mutex::new(receiver)),
        },
    )
}

/// Every (province, city, county) chain whose county can be enriched with
/// streets, in source order.
///
/// A city with no city-level children of its own is treated as its own
/// county.
pub fn leaf_jobs<'a>(index: &'a HierarchyIndex<'a>) -> impl Iterator<Item = StreetJob> + 'a {
    index
        .records()
        .iter()
        .filter(|area| area.level == Level::Province)
        .flat_map(move |province| {
            let province_id = province.id;
            index
                .children(province_id)
                .filter(|city| city.level == Level::City)
                .flat_map(move |city| {
                    let has_counties = index
                        .children(city.id)
                        .any(|county| county.level == Level::City);
                    let own = (!has_counties && city.subtype == 0)
                        .then(|| StreetJob::new(province_id, city.id, city.id));

                    index
                        .children(city.id)
                        .filter(|county| county.is_street_candidate())
                        .map(move |county| StreetJob::new(province_id, city.id, county.id))
                        .chain(own)
                })
        })
}

/// Feeds `jobs` into the queue, blocking while it is full. Returns the number
/// of jobs handed over. The sender is dropped on return, which closes the queue.
pub async fn dispatch_jobs<I>(
    jobs: I,
    sender: JobSender,
    shutdown: &CancellationToken,
    telemetry: &Telemetry,
) -> Result<usize>
where
    I: IntoIterator<Item = StreetJob>,
{
    let mut dispatched = 0usize;

    for job in jobs {
        select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!(dispatched, "shutdown requested; stopping dispatch");
                break;
            }
            sent = sender.send(job) => {
                if sent.is_err() {
                    tracing::warn!(dispatched, %job, "job queue closed before dispatch finished");
                    break;
                }
                dispatched += 1;
                telemetry.record_dispatched();
            }
        }
    }

    tracing::debug!(dispatched, "dispatch finished");
    Ok(dispatched)
}
