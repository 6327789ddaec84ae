//! Booking logic without database access: slot schedules of locations and the rules for accepting
//! or rejecting reservation requests and cancellations.
//!
//! The data_store implementations gather the state of a slot and pass it to
//! [rules::evaluate_reservation_request], so the rules are evaluated identically for the
//! PostgreSQL store and the test mock.

pub mod rules;
pub mod schedule;
