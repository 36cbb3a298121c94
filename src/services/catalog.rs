use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use super::availability::AvailabilityCalculator;
use crate::cache::{CacheService, CachedAvailable};
use crate::models::{
    Movie, NewMovie, NewShowtime, NewTheater, Showtime, ShowtimeContext, Theater,
};
use crate::store::{CatalogUpdate, Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    NotFound(String),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl From<validator::ValidationErrors> for CatalogError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CatalogError::Invalid(errors.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TheaterView {
    #[serde(flatten)]
    pub theater: Theater,
    pub total_seats: i64,
}

impl From<Theater> for TheaterView {
    fn from(theater: Theater) -> Self {
        let total_seats = theater.capacity();
        Self { theater, total_seats }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeSummary {
    #[serde(flatten)]
    pub showtime: Showtime,
    pub theater_name: String,
    pub total_seats: i64,
    pub available_seats: i64,
}

/// Movies, theaters and showtimes. Writes are admin-only at the HTTP layer.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    availability: AvailabilityCalculator,
    cache: CacheService,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, availability: AvailabilityCalculator, cache: CacheService) -> Self {
        Self {
            store,
            availability,
            cache,
        }
    }

    pub async fn create_theater(&self, theater: NewTheater) -> Result<TheaterView, CatalogError> {
        theater.validate()?;
        let theater = self.store.insert_theater(theater).await?;
        info!(
            "Theater {} created: {} ({}x{})",
            theater.id, theater.name, theater.seat_rows, theater.seat_columns
        );
        Ok(theater.into())
    }

    pub async fn theaters(&self, active_only: bool) -> Result<Vec<TheaterView>, CatalogError> {
        let theaters = self.store.theaters(active_only).await?;
        Ok(theaters.into_iter().map(TheaterView::from).collect())
    }

    pub async fn theater(&self, id: i64) -> Result<TheaterView, CatalogError> {
        self.store
            .theater(id)
            .await?
            .map(TheaterView::from)
            .ok_or_else(|| CatalogError::NotFound("Theater not found".to_string()))
    }

    pub async fn set_theater_active(&self, id: i64, active: bool) -> Result<TheaterView, CatalogError> {
        let theater = self
            .store
            .set_theater_active(id, active)
            .await?
            .ok_or_else(|| CatalogError::NotFound("Theater not found".to_string()))?;
        info!("Theater {} is now {}", id, if active { "active" } else { "inactive" });
        Ok(theater.into())
    }

    /// Case-insensitive match anywhere in the name, inactive theaters included.
    pub async fn search_theaters(&self, name: &str) -> Result<Vec<TheaterView>, CatalogError> {
        let theaters = self.store.theaters_by_name(name).await?;
        Ok(theaters.into_iter().map(TheaterView::from).collect())
    }

    pub async fn count_active_theaters(&self) -> Result<i64, CatalogError> {
        Ok(self.store.count_active_theaters().await?)
    }

    /// Name and description can always change; the layout only while none of the theater's
    /// showtimes has seats.
    pub async fn update_theater(&self, id: i64, update: NewTheater) -> Result<TheaterView, CatalogError> {
        update.validate()?;
        let theater = match self.store.update_theater(id, update).await? {
            CatalogUpdate::Updated(theater) => theater,
            CatalogUpdate::NotFound => return Err(CatalogError::NotFound("Theater not found".to_string())),
            CatalogUpdate::InventoryExists => {
                return Err(CatalogError::Invalid(
                    "Theater layout cannot change once seats exist for its showtimes".to_string(),
                ))
            }
        };
        // counts taken against the old layout must not outlive it
        for context in self.store.showtimes(None).await? {
            if context.showtime.theater_id == id {
                self.cache.invalidate_showtime(context.id()).await;
            }
        }
        info!(
            "Theater {} updated: {} ({}x{})",
            theater.id, theater.name, theater.seat_rows, theater.seat_columns
        );
        Ok(theater.into())
    }

    /// Cascades through the theater's showtimes together with their seats and bookings.
    pub async fn delete_theater(&self, id: i64) -> Result<(), CatalogError> {
        let showtimes = self
            .store
            .delete_theater(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound("Theater not found".to_string()))?;
        self.invalidate_all(&showtimes).await;
        warn!("Theater {} deleted together with {} showtimes", id, showtimes.len());
        Ok(())
    }

    pub async fn create_movie(&self, movie: NewMovie) -> Result<Movie, CatalogError> {
        movie.validate()?;
        let movie = self.store.insert_movie(movie).await?;
        info!("Movie {} created: {}", movie.id, movie.title);
        Ok(movie)
    }

    pub async fn movies(&self) -> Result<Vec<Movie>, CatalogError> {
        Ok(self.store.movies().await?)
    }

    pub async fn movie(&self, id: i64) -> Result<Movie, CatalogError> {
        self.store
            .movie(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound("Movie not found".to_string()))
    }

    pub async fn update_movie(&self, id: i64, update: NewMovie) -> Result<Movie, CatalogError> {
        update.validate()?;
        let movie = self
            .store
            .update_movie(id, update)
            .await?
            .ok_or_else(|| CatalogError::NotFound("Movie not found".to_string()))?;
        info!("Movie {} updated: {}", movie.id, movie.title);
        Ok(movie)
    }

    /// Cascades like [`CatalogService::delete_theater`].
    pub async fn delete_movie(&self, id: i64) -> Result<(), CatalogError> {
        let showtimes = self
            .store
            .delete_movie(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound("Movie not found".to_string()))?;
        self.invalidate_all(&showtimes).await;
        warn!("Movie {} deleted together with {} showtimes", id, showtimes.len());
        Ok(())
    }

    pub async fn create_showtime(&self, showtime: NewShowtime) -> Result<ShowtimeSummary, CatalogError> {
        self.movie(showtime.movie_id).await?;
        let theater = self.theater(showtime.theater_id).await?.theater;
        if !theater.is_active {
            return Err(CatalogError::Invalid(format!(
                "Theater {} is not active",
                theater.name
            )));
        }

        let showtime = self.store.insert_showtime(showtime).await?;
        info!(
            "Showtime {} created: movie {} in theater {} at {}",
            showtime.id, showtime.movie_id, showtime.theater_id, showtime.starts_at
        );
        self.summarize(ShowtimeContext { showtime, theater }).await
    }

    /// Showtimes by start time, each with its live availability.
    pub async fn showtimes(&self, movie_id: Option<i64>) -> Result<Vec<ShowtimeSummary>, CatalogError> {
        let contexts = self.store.showtimes(movie_id).await?;
        try_join_all(contexts.into_iter().map(|context| self.summarize(context))).await
    }

    pub async fn showtime(&self, id: i64) -> Result<ShowtimeSummary, CatalogError> {
        let context = self.showtime_context(id).await?;
        self.summarize(context).await
    }

    pub async fn showtime_context(&self, id: i64) -> Result<ShowtimeContext, CatalogError> {
        self.store
            .showtime(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound("Showtime not found".to_string()))
    }

    /// Moving to another theater is refused once the showtime has seats, booked or not.
    pub async fn update_showtime(&self, id: i64, update: NewShowtime) -> Result<ShowtimeSummary, CatalogError> {
        let current = self.showtime_context(id).await?;
        self.movie(update.movie_id).await?;
        let theater = self.theater(update.theater_id).await?.theater;
        if theater.id != current.theater.id && !theater.is_active {
            return Err(CatalogError::Invalid(format!(
                "Theater {} is not active",
                theater.name
            )));
        }

        let context = match self.store.update_showtime(id, update).await? {
            CatalogUpdate::Updated(context) => context,
            CatalogUpdate::NotFound => return Err(CatalogError::NotFound("Showtime not found".to_string())),
            CatalogUpdate::InventoryExists => {
                return Err(CatalogError::Invalid(
                    "Showtime cannot move to another theater once its seats exist".to_string(),
                ))
            }
        };
        self.cache.invalidate_showtime(id).await;
        info!(
            "Showtime {} updated: movie {} in theater {} at {}",
            id, context.showtime.movie_id, context.showtime.theater_id, context.showtime.starts_at
        );
        self.summarize(context).await
    }

    pub async fn delete_showtime(&self, id: i64) -> Result<(), CatalogError> {
        if !self.store.delete_showtime(id).await? {
            return Err(CatalogError::NotFound("Showtime not found".to_string()));
        }
        self.cache.invalidate_showtime(id).await;
        warn!("Showtime {} deleted together with its seats and bookings", id);
        Ok(())
    }

    async fn invalidate_all(&self, showtime_ids: &[i64]) {
        for &id in showtime_ids {
            self.cache.invalidate_showtime(id).await;
        }
    }

    async fn summarize(&self, context: ShowtimeContext) -> Result<ShowtimeSummary, CatalogError> {
        let available_seats = match self.cache.lookup_available(context.id()).await {
            CachedAvailable::Hit(available) => available,
            CachedAvailable::Miss(slot) => {
                let available = self.availability.count_available(&context).await?.available;
                if let Some(slot) = slot {
                    self.cache.fill_available(slot, available).await;
                }
                available
            }
        };
        Ok(ShowtimeSummary {
            total_seats: context.capacity(),
            theater_name: context.theater.name,
            showtime: context.showtime,
            available_seats,
        })
    }
}
