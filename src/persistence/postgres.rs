//! PostgreSQL implementation of the relational stores.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::models::{EventRow, PaymentRow, TicketRow, UserRow};
use super::{EventFilter, EventPage, EventStore, PurchaseRecord, TicketStore, UserStore};
use crate::config::AppConfig;
use crate::domain::{Event, EventId, Payment, Ticket, TicketId, TicketStatus, User, UserId};
use crate::error::ApiError;

const EVENT_COLUMNS: &str = "id, organizer_id, title, description, location, start_date, end_date, \
     total_seats, available_seats, price, is_published, created_at, updated_at";

const TICKET_COLUMNS: &str = "id, user_id, event_id, ticket_number, seat_number, price, status, \
     purchased_at, created_at, updated_at";

/// Filter of the public listing. The location is a plain case-insensitive
/// substring, so `%` and `_` in it match themselves.
const PUBLISHED_EVENTS_FILTER: &str = "WHERE is_published \
     AND ($1::uuid IS NULL OR organizer_id = $1) \
     AND ($2::text IS NULL OR strpos(lower(location), lower($2)) > 0) \
     AND ($3::timestamptz IS NULL OR start_date >= $3)";

/// PostgreSQL-backed relational store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn db_err(e: sqlx::Error) -> ApiError {
    ApiError::Database(e.to_string())
}

/// Maps a unique-constraint violation on `users.email` to a conflict.
fn user_write_err(e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        return ApiError::Conflict("User with this email already exists".to_string());
    }
    db_err(e)
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Database`] if the database is unreachable.
    pub async fn connect(config: &AppConfig) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(db_err)?;
        tracing::info!(
            max_connections = config.database_max_connections,
            "postgres pool ready"
        );
        Ok(Self::new(pool))
    }

    /// Applies the embedded SQL migrations.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), ApiError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Database(e.to_string()))?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert_user(&self, user: &User) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, phone, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.phone)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(user_write_err)?;
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, ApiError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, phone, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, phone, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(User::try_from).transpose()
    }

    async fn update_user(&self, user: &User) -> Result<(), ApiError> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, phone = $5, updated_at = $6 \
             WHERE id = $1",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(user_write_err)?;
        if result.rows_affected() == 0 {
            return Err(ApiError::UserNotFound(*user.id.as_uuid()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn insert_event(&self, event: &Event) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, location, start_date, end_date, \
             total_seats, available_seats, price, is_published, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(event.id.as_uuid())
        .bind(event.organizer_id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.total_seats)
        .bind(event.available_seats)
        .bind(event.price)
        .bind(event.is_published)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_event(&self, id: EventId) -> Result<Option<Event>, ApiError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Event::from))
    }

    async fn find_events(&self, ids: &[EventId]) -> Result<Vec<Event>, ApiError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn list_published_events(&self, filter: &EventFilter) -> Result<EventPage, ApiError> {
        let organizer = filter.organizer_id.map(Uuid::from);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM events {PUBLISHED_EVENTS_FILTER}"
        ))
        .bind(organizer)
        .bind(&filter.location)
        .bind(filter.starts_after)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events {PUBLISHED_EVENTS_FILTER} \
             ORDER BY start_date ASC, id ASC LIMIT $4 OFFSET $5"
        ))
        .bind(organizer)
        .bind(&filter.location)
        .bind(filter.starts_after)
        .bind(i64::from(filter.limit))
        .bind(i64::from(filter.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(EventPage {
            events: rows.into_iter().map(Event::from).collect(),
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn update_event(&self, event: &Event) -> Result<Event, ApiError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let current = sqlx::query_as::<_, (i32, i32)>(
            "SELECT total_seats, available_seats FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(event.id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or(ApiError::EventNotFound(*event.id.as_uuid()))?;

        let (total, available) = current;
        let new_available = available + (event.total_seats - total);
        if new_available < 0 {
            return Err(ApiError::InvalidRequest(format!(
                "totalSeats cannot be lower than the {} seats already sold",
                total - available
            )));
        }

        let row = sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET title = $2, description = $3, location = $4, start_date = $5, \
             end_date = $6, total_seats = $7, available_seats = $8, price = $9, is_published = $10, \
             updated_at = $11 WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event.id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.total_seats)
        .bind(new_available)
        .bind(event.price)
        .bind(event.is_published)
        .bind(event.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(row.into())
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TicketStore for PostgresStore {
    async fn commit_purchase(&self, purchase: &PurchaseRecord) -> Result<i32, ApiError> {
        let quantity = i32::try_from(purchase.quantity)
            .map_err(|_| ApiError::InvalidRequest("quantity out of range".to_string()))?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Guarded decrement: the row is only touched if enough seats remain.
        let remaining = sqlx::query_scalar::<_, i32>(
            "UPDATE events SET available_seats = available_seats - $2, updated_at = now() \
             WHERE id = $1 AND available_seats >= $2 RETURNING available_seats",
        )
        .bind(purchase.event_id.as_uuid())
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(remaining) = remaining else {
            let available = sqlx::query_scalar::<_, i32>(
                "SELECT available_seats FROM events WHERE id = $1",
            )
            .bind(purchase.event_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
            return Err(match available {
                Some(available) => ApiError::InsufficientSeats {
                    requested: purchase.quantity,
                    available,
                },
                None => ApiError::EventNotFound(*purchase.event_id.as_uuid()),
            });
        };

        for ticket in &purchase.tickets {
            sqlx::query(
                "INSERT INTO tickets (id, user_id, event_id, ticket_number, seat_number, price, status, \
                 purchased_at, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(ticket.id.as_uuid())
            .bind(ticket.user_id.as_uuid())
            .bind(ticket.event_id.as_uuid())
            .bind(&ticket.ticket_number)
            .bind(&ticket.seat_number)
            .bind(ticket.price)
            .bind(ticket.status.as_str())
            .bind(ticket.purchased_at)
            .bind(ticket.created_at)
            .bind(ticket.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        let payment = &purchase.payment;
        sqlx::query(
            "INSERT INTO payments (id, user_id, ticket_id, amount, payment_method, transaction_id, \
             status, payment_date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(payment.id.as_uuid())
        .bind(payment.user_id.as_uuid())
        .bind(payment.ticket_id.map(Uuid::from))
        .bind(payment.amount)
        .bind(&payment.payment_method)
        .bind(&payment.transaction_id)
        .bind(payment.status.as_str())
        .bind(payment.payment_date)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(remaining)
    }

    async fn find_user_ticket(
        &self,
        ticket_id: TicketId,
        user_id: UserId,
    ) -> Result<Option<Ticket>, ApiError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 AND user_id = $2"
        ))
        .bind(ticket_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(Ticket::try_from).transpose()
    }

    async fn tickets_for_user(&self, user_id: UserId) -> Result<Vec<Ticket>, ApiError> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Ticket::try_from).collect()
    }

    async fn cancel_ticket(&self, ticket_id: TicketId) -> Result<(Ticket, i32), ApiError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 FOR UPDATE"
        ))
        .bind(ticket_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or(ApiError::TicketNotFound(*ticket_id.as_uuid()))?;
        let ticket = Ticket::try_from(row)?;
        if ticket.status == TicketStatus::Cancelled {
            return Err(ApiError::Conflict("Ticket is already cancelled".to_string()));
        }

        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "UPDATE tickets SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket_id.as_uuid())
        .bind(TicketStatus::Cancelled.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let remaining = sqlx::query_scalar::<_, i32>(
            "UPDATE events SET available_seats = LEAST(available_seats + 1, total_seats), \
             updated_at = now() WHERE id = $1 RETURNING available_seats",
        )
        .bind(ticket.event_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or(ApiError::EventNotFound(*ticket.event_id.as_uuid()))?;

        tx.commit().await.map_err(db_err)?;
        Ok((Ticket::try_from(row)?, remaining))
    }

    async fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>, ApiError> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, user_id, ticket_id, amount, payment_method, transaction_id, status, payment_date \
             FROM payments WHERE user_id = $1 ORDER BY payment_date DESC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Payment::try_from).collect()
    }
}
