// ABOUTME: In-memory transport that replays scripted response bodies per route.
// ABOUTME: Used to drive sessions from captured streams without a backend.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use parking_lot::Mutex;

use super::{ByteStream, StreamRequest, Transport};
use crate::config::Route;
use crate::error::StreamError;

/// One scripted response.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Deliver these chunks, then close (or stay open when `hold_open`).
    Body { chunks: Vec<Vec<u8>>, hold_open: bool },
    /// Refuse the request before any body byte.
    Reject { status: u16, message: String },
}

impl Reply {
    /// Deliver `body` in pieces of at most `size` bytes, then close.
    pub fn chunked(body: impl AsRef<[u8]>, size: usize) -> Self {
        Reply::Body {
            chunks: body.as_ref().chunks(size.max(1)).map(<[u8]>::to_vec).collect(),
            hold_open: false,
        }
    }
}

/// Replays queued replies in order, recording every request it receives.
#[derive(Debug, Default)]
pub struct ReplayTransport {
    replies: Mutex<HashMap<Route, VecDeque<Reply>>>,
    requests: Mutex<Vec<StreamRequest>>,
}

impl ReplayTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next request on `route`.
    pub fn push(&self, route: Route, reply: Reply) -> &Self {
        self.replies.lock().entry(route).or_default().push_back(reply);
        self
    }

    /// Queue a body delivered as the given chunks, then closed.
    pub fn respond<I, C>(&self, route: Route, chunks: I) -> &Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        self.push(
            route,
            Reply::Body {
                chunks: chunks.into_iter().map(Into::into).collect(),
                hold_open: false,
            },
        )
    }

    /// Queue a body delivered as the given chunks, after which the connection stalls.
    pub fn respond_then_stall<I, C>(&self, route: Route, chunks: I) -> &Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        self.push(
            route,
            Reply::Body {
                chunks: chunks.into_iter().map(Into::into).collect(),
                hold_open: true,
            },
        )
    }

    /// Queue a refusal with the given status.
    pub fn reject(&self, route: Route, status: u16, message: impl Into<String>) -> &Self {
        self.push(
            route,
            Reply::Reject {
                status,
                message: message.into(),
            },
        )
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn open(&self, request: StreamRequest) -> Result<ByteStream, StreamError> {
        let route = request.route;
        self.requests.lock().push(request);

        let reply = self
            .replies
            .lock()
            .get_mut(&route)
            .and_then(VecDeque::pop_front);

        match reply {
            Some(Reply::Body { chunks, hold_open }) => {
                let body = stream::iter(chunks.into_iter().map(Ok::<Vec<u8>, StreamError>));
                if hold_open {
                    Ok(Box::pin(body.chain(stream::pending())))
                } else {
                    Ok(Box::pin(body))
                }
            }
            Some(Reply::Reject { status, message }) => Err(StreamError::Api { status, message }),
            None => Err(StreamError::Api {
                status: 404,
                message: format!("no reply scripted for {}", route.path()),
            }),
        }
    }
}
