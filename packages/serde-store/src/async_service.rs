//! Async adapters over the callback-based service.
//!
//! Enable the `async` feature to use these:
//!
//! ```toml
//! [dependencies]
//! typedtree-serde = { version = "0.1", features = ["async"] }
//! ```
//!
//! One-shot reads become futures; continuous observations become a
//! [`DecodeStream`] that cancels its subscription when dropped.

use std::any::type_name;

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot};
use typedtree_core::{Path, Reference, SubscriptionHandle};

use crate::decode::DecodeResult;
use crate::error::DecodeError;
use crate::event_kind::EventKind;
use crate::service::Service;
use crate::typed_path::{CollectionPathType, PathType};

/// A continuous observation delivered through a channel.
///
/// `next().await` waits for the following delivery. The subscription is
/// removed on [`DecodeStream::cancel`] or when the stream is dropped; a
/// delivery already queued may still be returned afterwards.
pub struct DecodeStream<T, R: Reference> {
    rx: mpsc::UnboundedReceiver<DecodeResult<T>>,
    reference: R,
    handle: Option<SubscriptionHandle>,
}

impl<T, R: Reference> DecodeStream<T, R> {
    /// Wait for the next delivery.
    ///
    /// Returns `None` once the store has dropped the observation.
    pub async fn next(&mut self) -> Option<DecodeResult<T>> {
        self.rx.recv().await
    }

    /// A delivery that has already arrived, without waiting.
    pub fn try_next(&mut self) -> Option<DecodeResult<T>> {
        self.rx.try_recv().ok()
    }

    /// The subscription backing this stream.
    pub fn handle(&self) -> Option<SubscriptionHandle> {
        self.handle
    }

    /// Remove the subscription. Deliveries already queued stay readable.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.reference.remove_observer(handle);
        }
    }
}

impl<T, R: Reference> Drop for DecodeStream<T, R> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<R: Reference> Service<R> {
    /// Read the value at `path` once.
    ///
    /// If the store drops the request without delivering, the result is a
    /// `Failed` describing that.
    pub async fn value_once<P>(&self, path: &P) -> DecodeResult<P::Element>
    where
        P: PathType,
        P::Element: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.observe_once(path, move |result| {
            let _ = tx.send(result);
        });
        let rendered = path.rendered();
        rx.await
            .unwrap_or_else(|_| DecodeResult::Failed(closed::<P::Element>(&rendered)))
    }

    /// Read one child-level event of `kind` under `path`.
    pub async fn collection_once<C>(&self, kind: EventKind, path: &C) -> DecodeResult<C::Element>
    where
        C: CollectionPathType,
        C::Element: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.observe_collection_once(kind, path, move |result| {
            let _ = tx.send(result);
        });
        let rendered = path.rendered();
        rx.await
            .unwrap_or_else(|_| DecodeResult::Failed(closed::<C::Element>(&rendered)))
    }

    /// Observe the value at `path` as a stream.
    pub fn value_stream<P>(&self, path: &P) -> DecodeStream<P::Element, R>
    where
        P: PathType,
        P::Element: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.observe(path, move |result| {
            let _ = tx.send(result);
        });
        DecodeStream {
            rx,
            reference: self.root().clone(),
            handle: Some(handle),
        }
    }

    /// Observe child-level events of `kind` under `path` as a stream.
    pub fn collection_stream<C>(&self, kind: EventKind, path: &C) -> DecodeStream<C::Element, R>
    where
        C: CollectionPathType,
        C::Element: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.observe_collection(kind, path, move |result| {
            let _ = tx.send(result);
        });
        DecodeStream {
            rx,
            reference: self.root().clone(),
            handle: Some(handle),
        }
    }
}

fn closed<T>(rendered: &str) -> DecodeError {
    DecodeError::new(
        Path::parse(rendered).unwrap_or_default(),
        type_name::<T>(),
        "nothing",
        "store dropped the observation before delivering",
    )
}
