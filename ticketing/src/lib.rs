//! # Seatbook
//!
//! Seat reservations with QR ticket codes.
//!
//! - [`ReservationEngine`] books seats atomically and cancels reservations
//! - [`ValidationService`] answers "does this code admit someone?" at the door
//! - [`ReservationQueries`] serves holder overviews and the admin listing
//! - [`codes`] mints unguessable code content and renders it as a QR PNG
//! - [`channels`] deliver confirmations by email, SMS or log
//!
//! ## Wiring
//!
//! ```ignore
//! use seatbook::{BookingEnvironment, ReservationEngine, channels, codes::QrCodeGenerator};
//! use seatbook_runtime::NotificationDispatcher;
//!
//! let dispatcher = NotificationDispatcher::start(
//!     config.notifications.dispatcher(),
//!     channels::build_channels(&config),
//! );
//! let env = BookingEnvironment::new(
//!     Arc::new(SystemClock),
//!     catalog,
//!     accounts,
//!     store,
//!     Arc::new(QrCodeGenerator::default()),
//!     Arc::new(dispatcher.handle()),
//! );
//! let engine = ReservationEngine::new(env.clone());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channels;
pub mod codes;
pub mod config;
pub mod engine;
pub mod environment;
pub mod metrics;
pub mod queries;
pub mod validation;

pub use codes::{CodeError, CodeGenerator, QrCodeGenerator};
pub use config::{Config, ConfigError};
pub use engine::{ReservationEngine, ReserveRequest};
pub use environment::BookingEnvironment;
pub use queries::{HolderEventBookings, ReservationListing, ReservationQueries};
pub use validation::{
    TicketSummary, ValidationOutcome, ValidationReason, ValidationRequest, ValidationScope,
    ValidationService,
};
