//! In-memory [`Database`] implementation used by tests.
//!
//! Mirrors the transactional semantics the commands rely upon: a
//! transaction holds the whole state exclusively and rolls every mutation
//! back unless committed.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
};

use common::{
    operations::{
        By, Commit, Insert, Lock, Perform, Select, Transact, Update,
    },
    Credits,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{booking, court, ledger, package, user, Booking, Court, Package},
    infra::{database, Database},
    read::{
        self,
        booking::{Blocking, CourtDay, OverlapWindow, SettleElapsed},
    },
};

/// State shared by the [`Memory`] database and its transactions.
#[derive(Clone, Debug, Default)]
struct State {
    /// Stored [`Court`]s.
    courts: HashMap<court::Id, Court>,

    /// Stored [`Package`]s.
    packages: HashMap<package::Id, Package>,

    /// Stored [`Booking`]s.
    bookings: HashMap<booking::Id, Booking>,

    /// Stored credit balances.
    balances: HashMap<user::Id, Credits>,
}

impl State {
    fn blocking_overlapping(&self, window: OverlapWindow) -> Vec<Blocking<Booking>> {
        let mut found = self
            .bookings
            .values()
            .filter(|b| {
                b.court_id == window.court_id
                    && b.is_blocking()
                    && Some(b.id) != window.exclude
                    && b.overlaps(
                        window.starts_at.coerce(),
                        window.ends_at.coerce(),
                    )
            })
            .cloned()
            .map(Blocking)
            .collect::<Vec<_>>();
        found.sort_by_key(|Blocking(b)| b.starts_at);
        found
    }
}

/// In-memory [`Database`].
#[derive(Clone, Debug, Default)]
pub(crate) struct Memory(Arc<Mutex<State>>);

impl Memory {
    pub(crate) async fn insert_court(&self, court: Court) {
        drop(self.0.lock().await.courts.insert(court.id, court));
    }

    pub(crate) async fn insert_package(&self, package: Package) {
        drop(self.0.lock().await.packages.insert(package.id, package));
    }

    pub(crate) async fn insert_booking(&self, booking: Booking) {
        drop(self.0.lock().await.bookings.insert(booking.id, booking));
    }

    pub(crate) async fn set_balance(&self, user_id: user::Id, amount: Credits) {
        drop(self.0.lock().await.balances.insert(user_id, amount));
    }

    pub(crate) async fn balance(&self, user_id: user::Id) -> Credits {
        self.0.lock().await.balances[&user_id]
    }

    pub(crate) async fn booking(&self, id: booking::Id) -> Option<Booking> {
        self.0.lock().await.bookings.get(&id).cloned()
    }

    pub(crate) async fn bookings(&self) -> Vec<Booking> {
        self.0.lock().await.bookings.values().cloned().collect()
    }
}

/// In-memory [`Database`] transaction.
///
/// Holds the whole [`State`] exclusively until committed or dropped;
/// dropping without [`Commit`] restores the pre-transaction snapshot.
#[derive(Clone, Debug)]
pub(crate) struct MemoryTx(Arc<StdMutex<TxInner>>);

#[derive(Debug)]
struct TxInner {
    /// Exclusive guard over the shared [`State`], [`None`] once committed.
    guard: Option<OwnedMutexGuard<State>>,

    /// Pre-transaction snapshot restored on rollback.
    snapshot: State,
}

impl TxInner {
    fn state_mut(&mut self) -> &mut State {
        self.guard.as_deref_mut().expect("transaction already committed")
    }
}

impl Drop for TxInner {
    fn drop(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            *guard = self.snapshot.clone();
        }
    }
}

impl MemoryTx {
    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(self.0.lock().unwrap().state_mut())
    }
}

impl Database<Transact> for Memory {
    type Ok = MemoryTx;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let guard = Arc::clone(&self.0).lock_owned().await;
        let snapshot = State::clone(&guard);
        Ok(MemoryTx(Arc::new(StdMutex::new(TxInner {
            guard: Some(guard),
            snapshot,
        }))))
    }
}

impl Database<Transact> for MemoryTx {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for MemoryTx {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        drop(self.0.lock().unwrap().guard.take());
        Ok(())
    }
}

impl Database<Lock<By<Court, court::Id>>> for MemoryTx {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Court, court::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // The transaction already holds the whole state exclusively.
        Ok(())
    }
}

impl Database<Select<By<Option<Court>, court::Id>>> for Memory {
    type Ok = Option<Court>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Court>, court::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.0.lock().await.courts.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Option<Package>, package::Id>>> for Memory {
    type Ok = Option<Package>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Package>, package::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.0.lock().await.packages.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Option<Booking>, booking::Id>>> for Memory {
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.0.lock().await.bookings.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Option<Booking>, booking::Id>>> for MemoryTx {
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.with(|state| state.bookings.get(&id).cloned()))
    }
}

impl Database<Select<By<Vec<Blocking<Booking>>, OverlapWindow>>> for MemoryTx {
    type Ok = Vec<Blocking<Booking>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Blocking<Booking>>, OverlapWindow>>,
    ) -> Result<Self::Ok, Self::Err> {
        let window = by.into_inner();
        Ok(self.with(|state| state.blocking_overlapping(window)))
    }
}

impl Database<Select<By<Vec<Blocking<Booking>>, CourtDay>>> for Memory {
    type Ok = Vec<Blocking<Booking>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Blocking<Booking>>, CourtDay>>,
    ) -> Result<Self::Ok, Self::Err> {
        let CourtDay { court_id, date } = by.into_inner();
        let window = OverlapWindow {
            court_id,
            starts_at: date.midnight(),
            ends_at: date.next().midnight(),
            exclude: None,
        };
        Ok(self.0.lock().await.blocking_overlapping(window))
    }
}

impl Database<Select<By<Vec<Booking>, read::booking::list::Filter>>>
    for Memory
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::list::Filter {
            user_id,
            states,
            limit,
        } = by.into_inner();
        let mut found = self
            .0
            .lock()
            .await
            .bookings
            .values()
            .filter(|b| {
                b.user_id == user_id
                    && (states.is_empty() || states.contains(&b.state))
            })
            .cloned()
            .collect::<Vec<_>>();
        found.sort_by_key(|b| std::cmp::Reverse(b.created_at));
        found.truncate(usize::try_from(limit).unwrap());
        Ok(found)
    }
}

impl Database<Select<By<Option<ledger::Balance>, user::Id>>> for Memory {
    type Ok = Option<ledger::Balance>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<ledger::Balance>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        Ok(self.0.lock().await.balances.get(&user_id).map(|&amount| {
            ledger::Balance { user_id, amount }
        }))
    }
}

impl Database<Select<By<Option<ledger::Balance>, user::Id>>> for MemoryTx {
    type Ok = Option<ledger::Balance>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<ledger::Balance>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        Ok(self.with(|state| {
            state.balances.get(&user_id).map(|&amount| ledger::Balance {
                user_id,
                amount,
            })
        }))
    }
}

impl Database<Perform<ledger::Debit>> for MemoryTx {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Perform(debit): Perform<ledger::Debit>,
    ) -> Result<Self::Ok, Self::Err> {
        let ledger::Debit { user_id, amount } = debit;
        Ok(self.with(|state| {
            let Some(balance) = state.balances.get_mut(&user_id) else {
                return false;
            };
            match balance.checked_sub(amount) {
                Some(remaining) => {
                    *balance = remaining;
                    true
                }
                None => false,
            }
        }))
    }
}

impl Database<Perform<ledger::Credit>> for MemoryTx {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Perform(credit): Perform<ledger::Credit>,
    ) -> Result<Self::Ok, Self::Err> {
        let ledger::Credit { user_id, amount } = credit;
        self.with(|state| {
            let balance = state.balances.entry(user_id).or_default();
            *balance = balance
                .checked_add(amount)
                .expect("balance overflow");
        });
        Ok(())
    }
}

impl Database<Insert<Booking>> for MemoryTx {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|state| {
            drop(state.bookings.insert(booking.id, booking));
        });
        Ok(())
    }
}

impl Database<Update<Booking>> for MemoryTx {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|state| {
            drop(state.bookings.insert(booking.id, booking));
        });
        Ok(())
    }
}

impl Database<Perform<SettleElapsed>> for Memory {
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Perform(settle): Perform<SettleElapsed>,
    ) -> Result<Self::Ok, Self::Err> {
        let SettleElapsed { before } = settle;
        let mut settled = 0;
        let mut state = self.0.lock().await;
        for booking in state.bookings.values_mut() {
            if booking.state == booking::State::Approved
                && booking.ends_at <= before
            {
                booking.state = booking::State::Completed;
                settled += 1;
            }
        }
        Ok(settled)
    }
}

pub(crate) mod fixture {
    //! Builders of test entities.

    use common::{Credits, DateTime};

    use crate::{
        domain::{booking, court, package, user, Booking, Court, Package},
        task, Config, Service,
    };

    use super::Memory;

    pub(crate) fn court(open: u8, close: u8, price_per_hour: i64) -> Court {
        Court {
            id: court::Id::new(),
            name: "Center Court".parse().unwrap(),
            hours: court::OperatingHours::new(
                court::Hour::new(open).unwrap(),
                court::Hour::new(close).unwrap(),
            )
            .unwrap(),
            price_per_hour: Credits::new(price_per_hour).unwrap(),
            owner_id: user::Id::new(),
            created_at: DateTime::now().coerce(),
        }
    }

    pub(crate) fn package(price: i64) -> Package {
        Package {
            id: package::Id::new(),
            name: "Racket rental".parse().unwrap(),
            price: Credits::new(price).unwrap(),
            duration: package::Minutes::new(60).unwrap(),
        }
    }

    /// A pending [`Booking`] of the provided [`Court`] charged one hour of
    /// its price.
    pub(crate) fn booking(
        court: &Court,
        starts_at: DateTime,
        ends_at: DateTime,
    ) -> Booking {
        Booking {
            id: booking::Id::new(),
            court_id: court.id,
            user_id: user::Id::new(),
            package_id: None,
            starts_at: starts_at.coerce(),
            ends_at: ends_at.coerce(),
            state: booking::State::Pending,
            total_amount: court.price_per_hour,
            cancellation_reason: None,
            created_at: DateTime::now().coerce(),
            approved_at: None,
        }
    }

    pub(crate) fn service(db: Memory) -> (Service<Memory>, task::Background) {
        Service::new(
            Config {
                settle_elapsed_bookings: task::settle_elapsed_bookings::Config {
                    interval: std::time::Duration::from_secs(60 * 60),
                },
            },
            db,
        )
    }
}
