use crate::keyboard::{DecodedKey, EventDecoder};
use crate::KeyprobeResult;
use futures::future::select_all;
use futures::Stream;
use log::debug;
use std::future::Future;
use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 256;

/// The key presses of an [`EventDecoder`], decoded on the blocking thread pool.
///
/// The stream ends after yielding the decoder's first error.
pub struct KeyStream {
    rx: mpsc::Receiver<KeyprobeResult<DecodedKey>>,
}

impl KeyStream {
    /// Move `decoder` onto the blocking pool and start reading.
    ///
    /// Must be called from within a tokio runtime. Dropping the stream stops the decoder
    /// after its current read.
    pub fn spawn<R>(decoder: EventDecoder<R>) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::task::spawn_blocking(move || {
            for item in decoder {
                if tx.blocking_send(item).is_err() {
                    debug!("key stream dropped, stopping the decoder");
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Stream for KeyStream {
    type Item = KeyprobeResult<DecodedKey>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// The signals that end a capture, registered once for the life of the process.
pub struct Termination {
    signals: Vec<(&'static str, Signal)>,
}

impl Termination {
    pub fn register() -> io::Result<Self> {
        let kinds = [
            ("SIGINT", SignalKind::interrupt()),
            ("SIGTERM", SignalKind::terminate()),
            ("SIGHUP", SignalKind::hangup()),
            ("SIGQUIT", SignalKind::quit()),
        ];

        let signals = kinds
            .into_iter()
            .map(|(name, kind)| signal(kind).map(|signal| (name, signal)))
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self { signals })
    }

    /// Wait for any of the signals and return its name.
    pub async fn recv(&mut self) -> &'static str {
        let pending = self.signals.iter_mut().map(|(name, signal)| {
            Box::pin(async move {
                signal.recv().await;
                *name
            })
        });

        let (name, _, _) = select_all(pending).await;

        name
    }
}

/// How [`until_terminated`] ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The work completed with this output.
    Finished(T),
    /// A termination signal arrived first.
    Terminated(&'static str),
}

/// Drive `work` until it completes or `termination` fires.
///
/// `guard` is dropped exactly once before returning, whichever finished first.
pub async fn until_terminated<F, G>(
    termination: &mut Termination,
    guard: G,
    work: F,
) -> Outcome<F::Output>
where
    F: Future,
{
    let outcome = tokio::select! {
        biased;

        output = work => Outcome::Finished(output),
        signal = termination.recv() => Outcome::Terminated(signal),
    };

    drop(guard);

    outcome
}
