//! Domain types for the reservation engine.
//!
//! Identifiers, seat selections, events as seen from the seat catalog,
//! buyer snapshots, ticket codes and the reservation entity itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event (owned by the external catalog)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a reservation, generated at commit time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Creates a new random `ReservationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ReservationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse an identifier-shaped string.
    ///
    /// Returns `None` when the text is not a UUID, so callers can fall back
    /// to treating it as code content.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text.trim()).ok().map(Self)
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the owning account (owned by the external account system)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolderId(Uuid);

impl HolderId {
    /// Creates a new random `HolderId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `HolderId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Seats
// ============================================================================

/// A seat number, valid in `[1, total_seats]` for its event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatNumber(u32);

impl SeatNumber {
    /// Creates a seat number
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Returns the raw number
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Seat category label (e.g. "diamond", "premium", "silver").
///
/// Labels are normalised to trimmed lowercase so "Silver" and "silver "
/// name the same category.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SeatCategory(String);

impl SeatCategory {
    /// Top tier
    pub const DIAMOND: &'static str = "diamond";
    /// Middle tier
    pub const PREMIUM: &'static str = "premium";
    /// Entry tier
    pub const SILVER: &'static str = "silver";

    /// Creates a normalised category label
    #[must_use]
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(label.as_ref().trim().to_lowercase())
    }

    /// Category set used when an event declares none
    #[must_use]
    pub fn default_set() -> BTreeSet<Self> {
        [Self::DIAMOND, Self::PREMIUM, Self::SILVER]
            .into_iter()
            .map(Self::new)
            .collect()
    }

    /// Label as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SeatCategory {
    fn from(label: String) -> Self {
        Self::new(label)
    }
}

impl From<&str> for SeatCategory {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<SeatCategory> for String {
    fn from(category: SeatCategory) -> Self {
        category.0
    }
}

impl fmt::Display for SeatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One requested (or reserved) seat: number plus category
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatSelection {
    /// Seat number
    pub seat_number: SeatNumber,
    /// Seat category
    pub category: SeatCategory,
}

impl SeatSelection {
    /// Creates a seat selection
    #[must_use]
    pub fn new(seat_number: u32, category: impl Into<SeatCategory>) -> Self {
        Self {
            seat_number: SeatNumber::new(seat_number),
            category: category.into(),
        }
    }
}

// ============================================================================
// Events (read-only view of the external catalog)
// ============================================================================

/// Event as returned by the seat catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Display title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Venue / location label
    pub location: String,
    /// Optional poster image
    pub image_url: Option<String>,
    /// Seat numbers are `1..=total_seats`
    pub total_seats: u32,
    /// Declared seat categories
    pub categories: BTreeSet<SeatCategory>,
}

impl Event {
    /// Whether `seat` lies in `[1, total_seats]`
    #[must_use]
    pub const fn contains_seat(&self, seat: SeatNumber) -> bool {
        seat.value() >= 1 && seat.value() <= self.total_seats
    }

    /// Whether the event declares `category`
    #[must_use]
    pub fn offers(&self, category: &SeatCategory) -> bool {
        self.categories.contains(category)
    }

    /// Display-ready subset of the event
    #[must_use]
    pub fn details(&self) -> EventDetails {
        EventDetails {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.date,
            location: self.location.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

/// Event fields shown on tickets, listings and validation results
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Event ID
    pub id: EventId,
    /// Display title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Venue / location label
    pub location: String,
    /// Optional poster image
    pub image_url: Option<String>,
}

// ============================================================================
// Buyers
// ============================================================================

/// Live account record from the external account system
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountContact {
    /// Account ID
    pub holder_id: HolderId,
    /// Display name
    pub name: String,
    /// Account email
    pub email: String,
    /// Account phone, if any
    pub phone: Option<String>,
}

/// Buyer contact details captured at booking time.
///
/// # Precedence
///
/// There is exactly one rule for combining buyer sources: fields present in
/// the snapshot win; absent fields fall back to the live account record.
/// The engine applies it once when booking (so the stored snapshot is as
/// complete as possible) and read paths apply it again with the current
/// account record, which only matters for fields that were missing at
/// booking time. A removed account therefore never erases what a
/// reservation displays.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerSnapshot {
    /// Buyer name
    pub name: Option<String>,
    /// Buyer email
    pub email: Option<String>,
    /// Buyer phone
    pub phone: Option<String>,
}

impl BuyerSnapshot {
    /// Creates a fully populated snapshot
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
            phone: Some(phone.into()),
        }
    }

    /// Applies the snapshot-wins precedence rule against a live account.
    ///
    /// Blank strings count as absent.
    #[must_use]
    pub fn with_account_fallback(self, account: Option<&AccountContact>) -> Self {
        let name = non_blank(self.name).or_else(|| account.map(|a| a.name.clone()));
        let email = non_blank(self.email).or_else(|| account.map(|a| a.email.clone()));
        let phone = non_blank(self.phone).or_else(|| account.and_then(|a| a.phone.clone()));
        Self { name, email, phone }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Ticket codes
// ============================================================================

/// Opaque, globally unique code content. This is the ticket's identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeContent(String);

impl CodeContent {
    /// Wraps an already-minted content string
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    /// Content as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A ticket code: content plus its PNG rendering
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCode {
    /// Identity of the ticket
    pub content: CodeContent,
    /// PNG bytes encoding `content`; derived, never authoritative
    pub rendered_image: Vec<u8>,
}

impl fmt::Debug for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketCode")
            .field("content", &self.content)
            .field("rendered_image", &format_args!("<{} bytes>", self.rendered_image.len()))
            .finish()
    }
}

/// One seat of a reservation together with the code minted for it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedTicket {
    /// The reserved seat
    pub seat: SeatSelection,
    /// The code minted for this seat
    pub code: TicketCode,
}

// ============================================================================
// Reservations
// ============================================================================

/// Reservation lifecycle status.
///
/// The only permitted transition is `Booked → Cancelled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Seats are held and codes are valid
    Booked,
    /// Administratively cancelled; seats are released, rows retained
    Cancelled,
}

impl ReservationStatus {
    /// Convert status to its storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse status from its storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "booked" => Some(Self::Booked),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is allowed
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!((self, next), (Self::Booked, Self::Cancelled))
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed claim on one or more seats of one event.
///
/// `tickets` pairs each seat with its code, so there is always exactly one
/// code per seat and both sequences share the request's ordering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation ID
    pub id: ReservationId,
    /// Event the seats belong to
    pub event_id: EventId,
    /// Owning account
    pub holder_id: HolderId,
    /// Seats with their codes, in request order
    pub tickets: Vec<IssuedTicket>,
    /// Buyer details captured at booking time
    pub buyer: BuyerSnapshot,
    /// Lifecycle status
    pub status: ReservationStatus,
    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Reserved seats, in request order
    pub fn seats(&self) -> impl Iterator<Item = &SeatSelection> {
        self.tickets.iter().map(|t| &t.seat)
    }

    /// Ticket codes, in seat order
    pub fn codes(&self) -> impl Iterator<Item = &TicketCode> {
        self.tickets.iter().map(|t| &t.code)
    }

    /// Reserved seat numbers, in request order
    #[must_use]
    pub fn seat_numbers(&self) -> Vec<SeatNumber> {
        self.seats().map(|s| s.seat_number).collect()
    }

    /// The ticket minted with `content`, if it belongs to this reservation
    #[must_use]
    pub fn ticket_for_code(&self, content: &str) -> Option<&IssuedTicket> {
        self.tickets.iter().find(|t| t.code.content.as_str() == content)
    }

    /// Whether the reservation currently holds its seats
    #[must_use]
    pub fn is_booked(&self) -> bool {
        self.status == ReservationStatus::Booked
    }
}
