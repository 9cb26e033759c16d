//! WebSocket Notification Stream
//!
//! Pushes scheduler state changes to presentation clients.
//!
//! ## Protocol
//!
//! On connect the server sends `connected`, then a `snapshot` of the
//! visible toasts and modal. Every later state change arrives as an
//! `event`. A toast or modal already in the snapshot is not announced
//! again. Clients may send `dismiss`, `dismiss_modal` or `ping`.
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8787/ws');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'event' && msg.event.type === 'toast_shown') {
//!     showToast(msg.event.notification);
//!   }
//! };
//! ```

mod handler;
mod messages;

pub use handler::websocket_handler;
pub use messages::{ClientMessage, ServerMessage};
