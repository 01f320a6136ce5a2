//! Flight-desk tools for the interactive bot.
//!
//! Provides `get_available_flights` and `book_flight`, backed by a
//! [`FlightDesk`] that owns the route table and records every booking.
//!
//! ```rust
//! use std::sync::Arc;
//! use turnloop::tools::builtin::FlightDesk;
//!
//! let desk = Arc::new(FlightDesk::default());
//! assert_eq!(FlightDesk::tools(&desk).len(), 2);
//! ```

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::TurnloopError;
use crate::tools::tool::{FunctionTool, Tool};
use crate::tools::types::ToolParameters;

pub const GET_AVAILABLE_FLIGHTS: &str = "get_available_flights";
pub const BOOK_FLIGHT: &str = "book_flight";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One route served by the desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub from: String,
    pub to: String,
}

impl Flight {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A confirmed booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub from_city: String,
    pub to_city: String,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct BookFlightInput {
    from_city: String,
    to_city: String,
    date: String,
}

/// Route table plus the ledger of bookings made through `book_flight`.
#[derive(Debug)]
pub struct FlightDesk {
    flights: Vec<Flight>,
    bookings: Mutex<Vec<Booking>>,
}

impl Default for FlightDesk {
    fn default() -> Self {
        Self::new(vec![
            Flight::new("New York", "Los Angeles"),
            Flight::new("San Francisco", "Chicago"),
            Flight::new("Miami", "Seattle"),
            Flight::new("Los Angeles", "New York"),
            Flight::new("Boston", "San Francisco"),
        ])
    }
}

impl FlightDesk {
    pub fn new(flights: Vec<Flight>) -> Self {
        Self {
            flights,
            bookings: Mutex::new(Vec::new()),
        }
    }

    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    /// Snapshot of the bookings made so far, oldest first.
    pub fn bookings(&self) -> Vec<Booking> {
        match self.bookings.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Record a booking. The date must be `YYYY-MM-DD`.
    pub fn book(&self, from_city: &str, to_city: &str, date: &str) -> Result<Booking, TurnloopError> {
        let parsed = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| {
            TurnloopError::InvalidArgument(format!("date '{date}' is not in YYYY-MM-DD format"))
        })?;
        let booking = Booking {
            from_city: from_city.to_string(),
            to_city: to_city.to_string(),
            date: parsed,
        };
        self.bookings
            .lock()
            .map_err(|_| TurnloopError::ToolExecution {
                tool_name: BOOK_FLIGHT.into(),
                message: "booking ledger is unavailable".into(),
            })?
            .push(booking.clone());
        Ok(booking)
    }

    /// Both desk tools, in the order they are advertised.
    pub fn tools(desk: &Arc<Self>) -> Vec<Arc<dyn Tool>> {
        vec![available_flights_tool(desk.clone()), book_flight_tool(desk.clone())]
    }
}

/// Create the `get_available_flights` tool.
pub fn available_flights_tool(desk: Arc<FlightDesk>) -> Arc<dyn Tool> {
    Arc::new(FunctionTool::new(
        GET_AVAILABLE_FLIGHTS,
        "Get a list of available flights with their origin and destination cities.",
        ToolParameters::empty(),
        move |_args, _ctx| Ok(serde_json::to_value(desk.flights())?),
    ))
}

/// Create the `book_flight` tool.
pub fn book_flight_tool(desk: Arc<FlightDesk>) -> Arc<dyn Tool> {
    Arc::new(FunctionTool::new(
        BOOK_FLIGHT,
        "Book a flight from one city to another on a specific date.",
        ToolParameters::object()
            .string("from_city", "The city from which the flight departs.", true)
            .string("to_city", "The city to which the flight arrives.", true)
            .string("date", "The date of the flight in YYYY-MM-DD format.", true)
            .build(),
        move |args, ctx| {
            let input: BookFlightInput = args.deserialize()?;
            let booking = desk.book(&input.from_city, &input.to_city, &input.date)?;
            tracing::info!(
                call_id = %ctx.call_id,
                from = %booking.from_city,
                to = %booking.to_city,
                date = %booking.date,
                "Flight booked"
            );
            Ok(json!({
                "status": "success",
                "message": format!(
                    "Flight booked from {} to {} on {}.",
                    booking.from_city,
                    booking.to_city,
                    booking.date.format(DATE_FORMAT)
                ),
            }))
        },
    ))
}
