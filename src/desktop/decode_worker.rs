//! Image decode worker - runs in a separate thread

use std::path::Path;

use flume::{Receiver, Sender};
use image::RgbaImage;
use log::{debug, warn};

use crate::pages::PageSource;
use crate::platform::RequestId;

/// Request sent to the decode worker
#[derive(Debug)]
pub enum DecodeRequest {
    Decode {
        id: RequestId,
        index: usize,
        source: PageSource,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Errors from the decode worker
#[derive(Debug, thiserror::Error)]
pub enum DecodeFault {
    #[error("{path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("{0}: empty image")]
    Empty(String),
}

#[derive(Debug)]
pub enum DecodeResponse {
    Decoded {
        id: RequestId,
        index: usize,
        image: RgbaImage,
    },
    Failed {
        id: RequestId,
        index: usize,
        error: DecodeFault,
    },
}

impl DecodeResponse {
    pub fn id(&self) -> RequestId {
        match self {
            DecodeResponse::Decoded { id, .. } | DecodeResponse::Failed { id, .. } => *id,
        }
    }
}

pub fn decode_worker(requests: Receiver<DecodeRequest>, responses: Sender<DecodeResponse>) {
    for request in requests {
        match request {
            DecodeRequest::Decode { id, index, source } => {
                let response = match decode_file(Path::new(source.as_str())) {
                    Ok(image) => {
                        debug!(
                            "Decoded page {index} ({source}) at {}x{}",
                            image.width(),
                            image.height()
                        );
                        DecodeResponse::Decoded { id, index, image }
                    }
                    Err(error) => {
                        warn!("Decode of page {index} failed: {error}");
                        DecodeResponse::Failed { id, index, error }
                    }
                };
                if responses.send(response).is_err() {
                    break;
                }
            }

            DecodeRequest::Shutdown => break,
        }
    }
}

fn decode_file(path: &Path) -> Result<RgbaImage, DecodeFault> {
    let image = image::open(path).map_err(|source| DecodeFault::Image {
        path: path.display().to_string(),
        source,
    })?;
    if image.width() == 0 || image.height() == 0 {
        return Err(DecodeFault::Empty(path.display().to_string()));
    }
    Ok(image.to_rgba8())
}

/// Owns the worker thread and both ends of its channels
pub struct DecodeService {
    request_tx: Sender<DecodeRequest>,
    response_rx: Receiver<DecodeResponse>,
}

impl DecodeService {
    #[must_use]
    pub fn spawn() -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        std::thread::spawn(move || {
            decode_worker(request_rx, response_tx);
        });

        Self {
            request_tx,
            response_rx,
        }
    }

    pub fn submit(&self, id: RequestId, index: usize, source: PageSource) {
        if self
            .request_tx
            .send(DecodeRequest::Decode { id, index, source })
            .is_err()
        {
            warn!("Decode worker is gone, dropping request {id:?}");
        }
    }

    /// Poll for completed decodes without blocking
    pub fn poll_responses(&self) -> Vec<DecodeResponse> {
        self.response_rx.try_iter().collect()
    }

    /// Get the response receiver for blocking waits
    #[must_use]
    pub fn response_receiver(&self) -> &Receiver<DecodeResponse> {
        &self.response_rx
    }

    pub fn shutdown(&self) {
        let _ = self.request_tx.send(DecodeRequest::Shutdown);
    }
}

impl Drop for DecodeService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
