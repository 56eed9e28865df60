//! Outbound notification queue and the worker draining it.
//!
//! Services enqueue notifications after their transaction commits. Delivery is
//! best effort: the worker posts each notification to the mail relay and only
//! logs failures, while a failed enqueue surfaces to the caller right away.
use std::sync::Mutex;
use std::time::Duration;

use failure::{Error as FailureError, Fail};
use futures::sync::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::{future, Future, Stream};
use reqwest;
use sentry::integrations::failure::capture_error;

use errors::Error;
use models::Notification;

pub trait NotificationsQueue: Send + Sync {
    /// Hands a notification over for delivery
    fn enqueue(&self, notification: Notification) -> Result<(), FailureError>;
}

/// Queue backed by an in-process unbounded channel
pub struct ChannelNotificationsQueue {
    sender: Mutex<UnboundedSender<Notification>>,
}

impl ChannelNotificationsQueue {
    pub fn new() -> (Self, UnboundedReceiver<Notification>) {
        let (sender, receiver) = unbounded();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl NotificationsQueue for ChannelNotificationsQueue {
    fn enqueue(&self, notification: Notification) -> Result<(), FailureError> {
        debug!("Enqueue {:?} notification for {}.", notification.kind, notification.recipient);
        let sender = self
            .sender
            .lock()
            .map_err(|_| format_err!("Notification queue lock is poisoned").context(Error::Notification))?;
        sender
            .unbounded_send(notification)
            .map_err(|e| format_err!("{}", e).context(Error::Notification).into())
    }
}

#[derive(Clone)]
pub struct NotificationsWorkerContext {
    pub url: String,
    pub http_client: reqwest::async::Client,
}

impl NotificationsWorkerContext {
    pub fn new(url: String, timeout: Duration) -> Result<Self, FailureError> {
        let http_client = reqwest::async::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, http_client })
    }
}

/// Drains the queue until every sender is dropped; delivery errors never stop it.
pub fn run(ctx: NotificationsWorkerContext, receiver: UnboundedReceiver<Notification>) -> impl Future<Item = (), Error = ()> {
    receiver.for_each(move |notification| {
        let recipient = notification.recipient.clone();
        let kind = notification.kind;
        deliver(ctx.clone(), notification).then(move |res| {
            match res {
                Ok(_) => {
                    info!("Delivered {:?} notification to {}", kind, recipient);
                }
                Err(err) => {
                    let err = FailureError::from(err.context(format!("Failed to deliver {:?} notification to {}", kind, recipient)));
                    error!("{:?}", &err);
                    capture_error(&err);
                }
            };

            future::ok::<_, ()>(())
        })
    })
}

fn deliver(ctx: NotificationsWorkerContext, notification: Notification) -> impl Future<Item = (), Error = FailureError> {
    let NotificationsWorkerContext { url, http_client } = ctx;

    http_client
        .post(url.as_str())
        .json(&notification)
        .send()
        .map_err(FailureError::from)
        .and_then(|res| {
            let status = res.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(format_err!("Mail relay answered with status {}", status))
            }
        })
}
