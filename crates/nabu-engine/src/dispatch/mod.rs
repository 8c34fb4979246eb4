//! Designated-thread dispatch.
//!
//! Every native-object mutation happens on one thread, fixed when the
//! [`Dispatcher`] is constructed. Other threads hand work over with
//! [`Dispatcher::send`] (blocking, result returned) or [`Dispatcher::post`]
//! (fire-and-forget).
//!
//! # Ordering
//!
//! All actions travel through a single FIFO queue, so actions posted from one
//! thread run in submission order. Nothing orders posts coming from different
//! threads beyond their arrival in the queue.
//!
//! # Limitations
//!
//! `send` has no timeout. If the designated thread is stuck, the caller is
//! stuck too. A panic inside a posted action is logged and otherwise lost.

mod dispatcher;
mod error;

pub use dispatcher::{DispatchLoop, DispatchThread, Dispatcher, DispatcherConfig};
pub use error::DispatchError;
