use itertools::iproduct;
use tokio_util::sync::CancellationToken;

use crate::service::olt::{
  DeviceRecord, DeviceSummary, ScrapeResult, Service, Status, Transport,
};
use crate::{config, service};

pub(crate) struct Process {
  config: config::Manager,
  services: service::Container,
}

impl Process {
  pub(crate) fn new(
    config: config::Manager,
    services: service::Container,
  ) -> Self {
    Self { config, services }
  }
}

impl super::Process for Process {}

#[async_trait::async_trait]
impl super::Recurring for Process {
  #[tracing::instrument(skip(self))]
  async fn execute(&self) -> anyhow::Result<()> {
    let config = self.config.reload().await;
    let cycle = Cycle {
      olt: self.services.olt().clone(),
      options: CycleOptions {
        board_min: config.scrape.board_min,
        board_max: config.scrape.board_max,
        pon_min: config.scrape.pon_min,
        pon_max: config.scrape.pon_max,
        workers: config.scrape.workers,
        deadline: config.scrape.deadline,
      },
    };

    let outcome = cycle.run().await;
    tracing::info!(
      records = outcome.records.len(),
      complete = outcome.complete,
      "Scrape cycle finished"
    );
    self.services.metrics().publish(&outcome.records);

    Ok(())
  }
}

#[derive(Debug, Clone)]
pub(crate) struct CycleOptions {
  pub(crate) board_min: u8,
  pub(crate) board_max: u8,
  pub(crate) pon_min: u8,
  pub(crate) pon_max: u8,
  pub(crate) workers: usize,
  pub(crate) deadline: chrono::Duration,
}

pub(crate) struct Outcome {
  pub(crate) records: ScrapeResult,
  pub(crate) complete: bool,
}

const JOB_CAPACITY: usize = 1_000;
const RECORD_CAPACITY: usize = 1_024;

/// One full collection pass. Discovery walks the configured cells in order
/// and feeds a bounded job queue; a pool of workers fetches device records
/// and hands them to a single merge task, so no two tasks ever write the
/// result at once. The deadline cancels everything still in flight and
/// whatever merged by then becomes the outcome.
pub(crate) struct Cycle<T> {
  pub(crate) olt: Service<T>,
  pub(crate) options: CycleOptions,
}

impl<T: Transport + 'static> Cycle<T> {
  #[tracing::instrument(skip(self), fields(workers = self.options.workers))]
  pub(crate) async fn run(self) -> Outcome {
    let token = CancellationToken::new();
    let (job_tx, job_rx) = flume::bounded::<DeviceSummary>(JOB_CAPACITY);
    let (record_tx, record_rx) =
      flume::bounded::<DeviceRecord>(RECORD_CAPACITY);

    let merge = tokio::spawn(async move {
      let mut records = ScrapeResult::new();
      while let Ok(record) = record_rx.recv_async().await {
        merge_record(&mut records, record);
      }
      records
    });

    let mut workers = Vec::new();
    for _ in 0..self.options.workers.max(1) {
      let olt = self.olt.clone();
      let job_rx = job_rx.clone();
      let record_tx = record_tx.clone();
      let token = token.clone();
      workers.push(tokio::spawn(async move {
        loop {
          let job = tokio::select! {
            _ = token.cancelled() => return,
            job = job_rx.recv_async() => match job {
              Ok(job) => job,
              Err(_) => return,
            },
          };

          let fetched = tokio::select! {
            _ = token.cancelled() => return,
            fetched = olt.fetch(job.board, job.pon, job.id) => fetched,
          };

          match fetched {
            Ok(record) if record.serial_number.is_empty() => {
              tracing::warn!(
                board = job.board,
                pon = job.pon,
                id = job.id,
                "Dropping record without a serial number"
              );
            }
            Ok(record) => {
              if record_tx.send_async(record).await.is_err() {
                return;
              }
            }
            Err(error) => {
              tracing::warn!(
                board = job.board,
                pon = job.pon,
                id = job.id,
                %error,
                "Failed fetching device record"
              );
            }
          }
        }
      }));
    }
    drop(job_rx);
    drop(record_tx);

    let producer = {
      let olt = self.olt.clone();
      let token = token.clone();
      let options = self.options.clone();
      tokio::spawn(async move {
        let cells = iproduct!(
          options.board_min..=options.board_max,
          options.pon_min..=options.pon_max
        );
        for (board, pon) in cells {
          if token.is_cancelled() {
            return;
          }

          let found = tokio::select! {
            _ = token.cancelled() => return,
            found = olt.discover(board, pon) => found,
          };

          match found {
            Ok(devices) => {
              for device in devices {
                if job_tx.send_async(device).await.is_err() {
                  return;
                }
              }
            }
            Err(error) => {
              tracing::warn!(board, pon, %error, "Failed discovering cell");
            }
          }
        }
      })
    };

    let work = async {
      let _ = producer.await;
      futures::future::join_all(workers).await;
    };

    let deadline = std::time::Duration::from_millis(
      self.options.deadline.num_milliseconds().max(0) as u64,
    );
    let complete = tokio::select! {
      _ = work => true,
      _ = tokio::time::sleep(deadline) => {
        tracing::warn!("Scrape deadline hit, publishing a partial cycle");
        token.cancel();
        false
      },
    };

    let records = merge.await.unwrap_or_default();
    Outcome { records, complete }
  }
}

/// Records are keyed by serial number, so one physical device seen through
/// several cells collapses to one record. A later record wins unless it
/// would replace a known status with an unknown one.
fn merge_record(records: &mut ScrapeResult, record: DeviceRecord) {
  if let Some(existing) = records.get(&record.serial_number) {
    if existing.status != Status::Unknown && record.status == Status::Unknown
    {
      return;
    }
  }
  records.insert(record.serial_number.clone(), record);
}
