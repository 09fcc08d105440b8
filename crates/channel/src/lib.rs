//! Chat channel integration for the storefront
//!
//! This crate is the conversational surface of Warung:
//! - **Transport** (`transport`) - bridge connection with reconnect and outbound sends
//! - **Events** (`events`) - inbound envelopes, dispatcher, message handler
//! - **Conversation** (`conversation`) - per-message pipeline: session, panel, commands, small talk
//! - **Commands** (`commands`) - keyword command router over [`commands::StorefrontCommands`]
//! - **Sessions** (`session`) - session store and flow driver for checkout and the admin panel
//! - **Checkout** (`checkout`) - cart-to-order transaction with stock reservation
//! - **Delivery** (`delivery`) - bounded notification queue drained on an interval
//! - **Replies** (`replies`) - every customer- and admin-facing text
//!
//! # Architecture
//!
//! ```text
//! Bridge → ChannelRunner → EventDispatcher → MessageHandler → Conversation
//!                                                               ├─ SessionDriver → FlowEngine
//!                                                               └─ CommandRouter → Storefront
//! NotificationQueue → DeliveryLoop → ChannelTransport::send_message
//! ```
//!
//! All state changes for one customer run under that customer's [`locks::ActorLocks`] guard.

pub mod actor;
pub mod checkout;
pub mod commands;
pub mod conversation;
pub mod delivery;
pub mod events;
pub mod locks;
pub mod replies;
pub mod session;
pub mod storefront;
pub mod transport;

pub use conversation::Conversation;
pub use delivery::{DeliveryLoop, NotificationQueue, QueueError};
pub use storefront::{StoreRepositories, Storefront};
pub use transport::{ChannelRunner, ChannelTransport, HttpBridgeTransport, ReconnectPolicy};
