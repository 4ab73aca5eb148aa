use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{StoreTx, TicketStore};
use crate::models::{Event, Reservation, User};
use crate::utils::error::AppError;

const UNIQUE_VIOLATION: &str = "23505";

const EVENT_COLUMNS: &str = "id, organizer_id, name, description, location, start_time, end_time, \
     price, total_tickets, available_tickets, created_at, updated_at";

const USER_COLUMNS: &str = "id, username, is_staff, password_hash, created_at";

const RESERVATION_COLUMNS: &str =
    "id, event_id, user_id, name, surname, quantity, canceled, created_at";

/// PostgreSQL store. Ledger transactions run at the default READ COMMITTED
/// isolation and take `FOR UPDATE` row locks on the rows they adjust.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!("Successfully connected to database");

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Failed to run migrations: {e}")))?;

        tracing::info!("Migrations run successfully");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO events (
                id, organizer_id, name, description, location, start_time, end_time,
                price, total_tickets, available_tickets, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.price)
        .bind(event.total_tickets)
        .bind(event.available_tickets)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY start_time"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    async fn list_active_reservations(&self, user_id: Uuid) -> Result<Vec<Reservation>, AppError> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE user_id = $1 AND canceled = FALSE ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn insert_user(&self, user: &User, token: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO users (id, username, is_staff, password_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(user.is_staff)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &inserted {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return Err(AppError::ValidationError(format!(
                    "Username '{}' is already taken",
                    user.username
                )));
            }
        }
        inserted?;

        insert_token(&mut *tx, user.id, token).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn add_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        insert_token(&self.pool, user_id, token).await
    }

    async fn revoke_other_tokens(&self, user_id: Uuid, keep: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM api_tokens WHERE user_id = $1 AND token <> $2")
            .bind(user_id)
            .bind(keep)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.is_staff, u.password_hash, u.created_at
            FROM api_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

async fn insert_token<'e, E>(executor: E, user_id: Uuid, token: &str) -> Result<(), AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let inserted = sqlx::query("INSERT INTO api_tokens (token, user_id) VALUES ($1, $2)")
        .bind(token)
        .bind(user_id)
        .execute(executor)
        .await;

    match inserted {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Err(AppError::ValidationError("Token is already issued".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_event(&mut self, id: Uuid) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(event)
    }

    async fn set_available_tickets(
        &mut self,
        event_id: Uuid,
        available: i32,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE events SET available_tickets = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(event_id)
        .bind(available)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Event '{}' was not found",
                event_id
            )));
        }
        Ok(())
    }

    async fn lock_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(reservation)
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, event_id, user_id, name, surname, quantity, canceled, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.event_id)
        .bind(reservation.user_id)
        .bind(&reservation.name)
        .bind(&reservation.surname)
        .bind(reservation.quantity)
        .bind(reservation.canceled)
        .bind(reservation.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET name = $2, surname = $3, quantity = $4, canceled = $5
            WHERE id = $1
            "#,
        )
        .bind(reservation.id)
        .bind(&reservation.name)
        .bind(&reservation.surname)
        .bind(reservation.quantity)
        .bind(reservation.canceled)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Reservation '{}' was not found",
                reservation.id
            )));
        }
        Ok(())
    }

    async fn delete_reservation(&mut self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let PgTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}
