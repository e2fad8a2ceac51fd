//! # ldapkit-client
//!
//! Asynchronous request/response correlation for LDAP v3 over any tokio
//! byte stream.
//!
//! ## Features
//!
//! - **Connection driver**: [`Connection`] splits a stream into a reader
//!   task and a writer task, so submitting a request never blocks on I/O
//! - **Correlation**: [`PendingOperations`] routes entries, references,
//!   intermediate responses and the final result to the right listener by
//!   message ID, and delivers each final result at most once
//! - **Timeouts**: per-operation response timeouts produce an ordinary
//!   `timeout` result, optionally preceded by an abandon request
//! - **Listeners**: implement [`ResponseListener`] for callbacks, or use
//!   [`AsyncRequest`] to await events over a channel
//!
//! ## Quick Start
//!
//! ```ignore
//! use ldapkit_client::{Connection, ConnectionOptions};
//! use ldapkit_core::SearchScope;
//! use ldapkit_protocol::{Filter, SearchRequest};
//! use tokio::net::TcpStream;
//!
//! let stream = TcpStream::connect("ldap.example.com:389").await?;
//! let connection = Connection::new(stream, ConnectionOptions::default());
//!
//! let search = SearchRequest::new(
//!     "dc=example,dc=com",
//!     SearchScope::SUB,
//!     Filter::parse("(uid=jdoe)")?,
//! );
//! let result = connection.submit(search, Vec::new())?.result().await?;
//! println!("{result}");
//! connection.unbind()?;
//! ```
//!
//! ## Modules
//!
//! Everything is re-exported at the crate root.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod connection;
mod error;
mod framed;
mod listener;
mod message_id;
mod pending;
mod scheduler;

pub use config::{ConnectionOptions, ConnectionOptionsBuilder, DEFAULT_RESPONSE_TIMEOUT};
pub use connection::Connection;
pub use error::{Error, Result};
pub use framed::{FramedReader, decode_frame};
pub use listener::{
    AsyncRequest, AsyncRequestId, ChannelListener, ResponseEvent, ResponseListener,
    UnsolicitedNotificationHandler,
};
pub use message_id::MessageIdGenerator;
pub use pending::{AbandonHandler, OperationProgress, PendingOperations};
pub use scheduler::{Scheduler, TimerHandle, TimerTask, TokioScheduler};
