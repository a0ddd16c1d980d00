//! Cancelable photo crop.
//!
//! Decoding, resampling and JPEG encoding are CPU-bound, so the crop runs on
//! the blocking pool. The editor can abandon it at any point; a cancelled
//! job resolves to `None` and its result, if it still arrives, is dropped.

use lineage_core::crop::{self, CropParams};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

pub struct CropJob {
    cancel: CancellationToken,
    handle: JoinHandle<Result<Vec<u8>, crop::CropError>>,
}

impl CropJob {
    /// Start cropping `source` (encoded PNG, JPEG or WebP bytes).
    pub fn spawn(source: Vec<u8>, params: CropParams) -> Self {
        let handle = tokio::task::spawn_blocking(move || crop::crop_to_square(&source, &params));
        Self {
            cancel: CancellationToken::new(),
            handle,
        }
    }

    /// Abandon the job.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this job when triggered, e.g. from a dialog's
    /// close handler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the crop. Returns the JPEG as a `data:` URI ready to store as
    /// `photoUrl`, or `None` if the job was cancelled first.
    pub async fn finish(self) -> Result<Option<String>, ClientError> {
        let CropJob { cancel, mut handle } = self;
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("Photo crop cancelled");
                Ok(None)
            }
            joined = &mut handle => {
                let jpeg = joined??;
                tracing::debug!(bytes = jpeg.len(), "Photo crop finished");
                Ok(Some(crop::to_data_uri(&jpeg)))
            }
        }
    }
}
