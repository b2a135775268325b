use sqlx::sqlite::SqlitePool;

use crate::models::{Event, NewEvent, NewPayment, PaymentRecord};

const EVENT_COLUMNS: &str = "id, title, description, price, image_path, start_location, \
     end_location, transfer_price, transfer_time, date, active";

/// CRUD boundary over the events and payments tables. Events are only ever
/// soft-deleted; payments are append-only.
#[derive(Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn insert_event(&self, event: &NewEvent) -> Result<i64, sqlx::Error> {
        let transfer = event.transfer.as_ref();
        let result = sqlx::query(
            "INSERT INTO events (title, description, price, image_path, start_location, \
             end_location, transfer_price, transfer_time, date, active) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, TRUE)",
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.price)
        .bind(&event.image_path)
        .bind(transfer.map(|t| t.start_location.clone()))
        .bind(&event.end_location)
        .bind(transfer.map(|t| t.price))
        .bind(transfer.map(|t| t.departure))
        .bind(event.date)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn deactivate_event(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE events SET active = FALSE WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn active_events(&self) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE active = TRUE ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn active_event(&self, id: i64) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE active = TRUE AND id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Commit-time lookup of the shuttle origin. Deliberately ignores the
    /// active flag: a payment confirmed after the event was removed still
    /// has to be recorded.
    pub async fn transfer_origin(&self, id: i64) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT start_location FROM events WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(location,)| location))
    }

    pub async fn insert_payment(&self, payment: &NewPayment) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO payments (event_id, user_id, amount, is_transfer, \
             transfer_start_location, time, quantity) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(payment.event_id)
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(payment.is_transfer)
        .bind(&payment.transfer_start_location)
        .bind(payment.time)
        .bind(payment.quantity)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn payments_for_user(&self, user_id: i64) -> Result<Vec<PaymentRecord>, sqlx::Error> {
        sqlx::query_as::<_, PaymentRecord>(
            "SELECT events.title, payments.amount, payments.timestamp, payments.is_transfer, \
             payments.transfer_start_location, payments.time, payments.quantity \
             FROM payments JOIN events ON payments.event_id = events.id \
             WHERE payments.user_id = ? ORDER BY payments.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::memory_store;
    use crate::models::{NewEvent, NewPayment, TransferLeg};
    use chrono::NaiveDate;

    fn sample_event(transfer: Option<TransferLeg>) -> NewEvent {
        NewEvent {
            title: "Concerto".to_string(),
            description: "Bella serata".to_string(),
            price: 1500,
            image_path: Some("event_images/event_Concerto.jpg".to_string()),
            end_location: "Piazza".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 12, 31)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
            transfer,
        }
    }

    fn sample_leg() -> TransferLeg {
        TransferLeg {
            start_location: "Stazione".to_string(),
            departure: NaiveDate::from_ymd_opt(2025, 12, 31)
                .unwrap()
                .and_hms_opt(18, 30, 0)
                .unwrap(),
            price: 500,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_active_event() {
        let store = memory_store().await;
        let id = store.insert_event(&sample_event(None)).await.unwrap();

        let event = store.active_event(id).await.unwrap().unwrap();
        assert_eq!(event.title, "Concerto");
        assert_eq!(event.price, 1500);
        assert!(event.active);
        assert!(event.transfer_leg().is_none());
        assert!(event.start_location.is_none());
        assert!(event.transfer_time.is_none());
        assert!(event.transfer_price.is_none());
    }

    #[tokio::test]
    async fn test_transfer_columns_round_trip_as_a_unit() {
        let store = memory_store().await;
        let id = store.insert_event(&sample_event(Some(sample_leg()))).await.unwrap();

        let event = store.active_event(id).await.unwrap().unwrap();
        assert_eq!(event.transfer_leg(), Some(sample_leg()));
    }

    #[tokio::test]
    async fn test_deactivate_hides_event_from_selects() {
        let store = memory_store().await;
        let id = store.insert_event(&sample_event(None)).await.unwrap();

        store.deactivate_event(id).await.unwrap();
        assert!(store.active_event(id).await.unwrap().is_none());
        assert!(store.active_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_origin_survives_deactivation() {
        let store = memory_store().await;
        let id = store.insert_event(&sample_event(Some(sample_leg()))).await.unwrap();

        store.deactivate_event(id).await.unwrap();
        let origin = store.transfer_origin(id).await.unwrap();
        assert_eq!(origin.as_deref(), Some("Stazione"));
    }

    #[tokio::test]
    async fn test_payment_joins_event_title() {
        let store = memory_store().await;
        let event_id = store.insert_event(&sample_event(None)).await.unwrap();

        store
            .insert_payment(&NewPayment {
                event_id,
                user_id: 42,
                amount: 4500,
                is_transfer: false,
                transfer_start_location: None,
                time: sample_event(None).date,
                quantity: 3,
            })
            .await
            .unwrap();

        let records = store.payments_for_user(42).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Concerto");
        assert_eq!(records[0].amount, 4500);
        assert_eq!(records[0].quantity, 3);
        assert!(!records[0].is_transfer);

        assert!(store.payments_for_user(7).await.unwrap().is_empty());
    }
}
