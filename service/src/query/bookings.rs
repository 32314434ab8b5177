//! [`Query`] collection related to multiple [`Booking`]s.

use common::operations::By;

use crate::{domain::Booking, read};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries the [`Booking`]s history of a user, newest first.
pub type History =
    DatabaseQuery<By<Vec<Booking>, read::booking::list::Filter>>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        domain::{booking, user},
        infra::database::memory::{fixture, Memory},
        read,
        Query as _,
    };

    use super::History;

    fn at(input: &str) -> DateTime {
        DateTime::from_rfc3339(input).unwrap()
    }

    #[tokio::test]
    async fn newest_first_filtered_by_state() {
        let db = Memory::default();
        let court = fixture::court(6, 22, 200_000);
        db.insert_court(court.clone()).await;
        let user_id = user::Id::new();

        let mut older = fixture::booking(
            &court,
            at("2099-05-01T10:00:00Z"),
            at("2099-05-01T11:00:00Z"),
        );
        older.user_id = user_id;
        older.created_at = at("2099-04-01T00:00:00Z").coerce();
        let mut newer = fixture::booking(
            &court,
            at("2099-05-02T10:00:00Z"),
            at("2099-05-02T11:00:00Z"),
        );
        newer.user_id = user_id;
        newer.created_at = at("2099-04-02T00:00:00Z").coerce();
        let mut cancelled = fixture::booking(
            &court,
            at("2099-05-03T10:00:00Z"),
            at("2099-05-03T11:00:00Z"),
        );
        cancelled.user_id = user_id;
        cancelled.state = booking::State::Cancelled;
        // Another user's booking never shows up.
        let foreign = fixture::booking(
            &court,
            at("2099-05-04T10:00:00Z"),
            at("2099-05-04T11:00:00Z"),
        );
        for b in [&older, &newer, &cancelled, &foreign] {
            db.insert_booking(b.clone()).await;
        }
        let (svc, _bg) = fixture::service(db.clone());

        let history = svc
            .execute(History::by(read::booking::list::Filter {
                user_id,
                states: vec![booking::State::Pending],
                limit: 10,
            }))
            .await
            .unwrap();

        assert_eq!(
            history.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![newer.id, older.id],
        );
    }
}
