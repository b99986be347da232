//! Seat availability endpoint.

#![allow(clippy::missing_errors_doc)] // Handlers return ApiError

use super::error::ApiError;
use crate::server::state::AppState;
use crate::types::{MovieId, SeatNumber, SessionKey};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

/// Occupied seats of a session.
#[derive(Debug, Serialize, Deserialize)]
pub struct OccupiedSeatsResponse {
    /// Movie
    pub movie_id: MovieId,
    /// Session label
    pub session: SessionKey,
    /// Occupied seat numbers, ascending
    pub occupied: Vec<u8>,
    /// Seats in the hall
    pub total_seats: u8,
}

/// GET /api/v1/movies/:movie_id/sessions/:session/seats
///
/// A session nobody has booked yet answers with an empty list.
pub async fn occupied_seats(
    State(state): State<AppState>,
    Path((movie_id, session)): Path<(i64, String)>,
) -> Result<Json<OccupiedSeatsResponse>, ApiError> {
    let movie_id = MovieId::new(movie_id);
    let session = SessionKey::new(session);
    let occupied = state
        .bookings
        .occupied_seats(movie_id, session.clone())
        .await?;

    Ok(Json(OccupiedSeatsResponse {
        movie_id,
        session,
        occupied: occupied.iter().map(SeatNumber::value).collect(),
        total_seats: SeatNumber::TOTAL,
    }))
}
