//! In-memory [`Database`] implementation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use common::operations::{By, Commit, Delete, Insert, Lock, Select, Transact};
use tracerr::Traced;

use crate::{
    domain::{
        annex, complaint, contract, device, extension, handover, logistics,
        order, settlement,
        signature::{self, Challenge, Document, Target},
        user, Annex, Complaint, Contract, Device, Extension, Order,
        Settlement, User,
    },
    infra::{database, Database},
    read::device::Available,
};

/// Contents of a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// [`User`]s by their IDs.
    pub users: HashMap<user::Id, User>,

    /// [`device::Model`]s by their IDs.
    pub models: HashMap<device::ModelId, device::Model>,

    /// [`Device`]s by their IDs.
    pub devices: HashMap<device::Id, Device>,

    /// [`Order`]s by their IDs.
    pub orders: HashMap<order::Id, Order>,

    /// [`Contract`]s by their IDs.
    pub contracts: HashMap<contract::Id, Contract>,

    /// [`handover::Report`]s by their IDs.
    pub reports: HashMap<handover::Id, handover::Report>,

    /// Signature [`Challenge`]s by their targets and roles.
    pub challenges:
        HashMap<(signature::Target, signature::Role), Challenge>,

    /// [`Settlement`]s by their IDs.
    pub settlements: HashMap<settlement::Id, Settlement>,

    /// [`Extension`]s by their IDs.
    pub extensions: HashMap<extension::Id, Extension>,

    /// [`Annex`]es by their IDs.
    pub annexes: HashMap<annex::Id, Annex>,

    /// [`Complaint`]s by their IDs.
    pub complaints: HashMap<complaint::Id, Complaint>,

    /// [`logistics::Task`]s by their IDs.
    pub tasks: HashMap<logistics::Id, logistics::Task>,
}

/// In-memory [`Database`].
///
/// [`Transact`]ing takes a snapshot of the committed [`State`], which
/// replaces the committed one on [`Commit`]. [`Lock`]s are no-op.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Committed [`State`].
    committed: Arc<Mutex<State>>,

    /// [`State`] of the current transaction, if any.
    tx: Option<Arc<Mutex<State>>>,
}

impl Memory {
    /// Creates a new [`Memory`] database with the provided initial [`State`].
    #[must_use]
    pub fn new(state: State) -> Self {
        Self {
            committed: Arc::new(Mutex::new(state)),
            tx: None,
        }
    }

    /// Returns a copy of the committed [`State`].
    #[must_use]
    pub fn snapshot(&self) -> State {
        self.committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies the provided function to the current [`State`].
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let state = self.tx.as_ref().unwrap_or(&self.committed);
        f(&mut state.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        if self.tx.is_some() {
            return Ok(self.clone());
        }
        Ok(Self {
            committed: Arc::clone(&self.committed),
            tx: Some(Arc::new(Mutex::new(self.snapshot()))),
        })
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        if let Some(tx) = &self.tx {
            let state =
                tx.lock().unwrap_or_else(PoisonError::into_inner).clone();
            *self
                .committed
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = state;
        }
        Ok(())
    }
}

/// Implements [`Select`]ing by ID, [`Insert`]ing and [`Lock`]ing of the
/// provided entity stored in the provided [`State`] table.
macro_rules! impl_table {
    ($entity:ty, $id:ty, $table:ident $(, lock by $lock:ty)?) => {
        impl Database<Select<By<Option<$entity>, $id>>> for Memory {
            type Ok = Option<$entity>;
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Select(by): Select<By<Option<$entity>, $id>>,
            ) -> Result<Self::Ok, Self::Err> {
                let id = by.into_inner();
                Ok(self.with(|s| s.$table.get(&id).cloned()))
            }
        }

        impl Database<Insert<$entity>> for Memory {
            type Ok = ();
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Insert(entity): Insert<$entity>,
            ) -> Result<Self::Ok, Self::Err> {
                self.with(|s| drop(s.$table.insert(entity.id, entity)));
                Ok(())
            }
        }

        $(
            impl Database<Lock<By<$entity, $lock>>> for Memory {
                type Ok = ();
                type Err = Traced<database::Error>;

                async fn execute(
                    &self,
                    _: Lock<By<$entity, $lock>>,
                ) -> Result<Self::Ok, Self::Err> {
                    Ok(())
                }
            }
        )?
    };
}

/// Implements [`Select`]ing all the entities of an [`Order`] from the
/// provided [`State`] table, in their creation order.
macro_rules! impl_of_order {
    ($entity:ty, $table:ident) => {
        impl Database<Select<By<Vec<$entity>, order::Id>>> for Memory {
            type Ok = Vec<$entity>;
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Select(by): Select<By<Vec<$entity>, order::Id>>,
            ) -> Result<Self::Ok, Self::Err> {
                let order_id = by.into_inner();
                let mut found = self.with(|s| {
                    s.$table
                        .values()
                        .filter(|e| e.order_id == order_id)
                        .cloned()
                        .collect::<Vec<_>>()
                });
                found.sort_by_key(|e| e.created_at);
                Ok(found)
            }
        }
    };
}

impl_table!(User, user::Id, users);
impl_table!(Device, device::Id, devices);
impl_table!(Order, order::Id, orders, lock by order::Id);
impl_table!(Contract, contract::Id, contracts, lock by contract::Id);
impl_table!(handover::Report, handover::Id, reports, lock by handover::Id);
impl_table!(Settlement, settlement::Id, settlements, lock by order::Id);
impl_table!(Extension, extension::Id, extensions, lock by order::Id);
impl_table!(Annex, annex::Id, annexes, lock by annex::Id);
impl_table!(Complaint, complaint::Id, complaints, lock by complaint::Id);
impl_table!(logistics::Task, logistics::Id, tasks, lock by logistics::Id);

impl_of_order!(handover::Report, reports);
impl_of_order!(Extension, extensions);
impl_of_order!(Complaint, complaints);
impl_of_order!(logistics::Task, tasks);

impl Database<Select<By<Vec<Order>, user::Id>>> for Memory {
    type Ok = Vec<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Order>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let customer_id = by.into_inner();
        let mut orders = self.with(|s| {
            s.orders
                .values()
                .filter(|o| o.customer_id == customer_id)
                .cloned()
                .collect::<Vec<_>>()
        });
        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(orders)
    }
}

impl Database<Select<By<Option<Contract>, order::Id>>> for Memory {
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let order_id = by.into_inner();
        Ok(self.with(|s| {
            s.contracts
                .values()
                .filter(|c| c.order_id == order_id)
                .max_by_key(|c| c.created_at)
                .cloned()
        }))
    }
}

impl Database<Select<By<Option<Settlement>, order::Id>>> for Memory {
    type Ok = Option<Settlement>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Settlement>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let order_id = by.into_inner();
        Ok(self.with(|s| {
            s.settlements
                .values()
                .find(|st| st.order_id == order_id)
                .cloned()
        }))
    }
}

impl Database<Select<By<Option<Annex>, extension::Id>>> for Memory {
    type Ok = Option<Annex>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Annex>, extension::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let extension_id = by.into_inner();
        Ok(self.with(|s| {
            s.annexes
                .values()
                .find(|a| a.extension_id == extension_id)
                .cloned()
        }))
    }
}

impl<IDs> Database<Select<By<HashMap<device::ModelId, device::Model>, IDs>>>
    for Memory
where
    IDs: AsRef<[device::ModelId]>,
{
    type Ok = HashMap<device::ModelId, device::Model>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<HashMap<device::ModelId, device::Model>, IDs>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        Ok(self.with(|s| {
            ids.as_ref()
                .iter()
                .filter_map(|id| s.models.get(id).map(|m| (*id, m.clone())))
                .collect()
        }))
    }
}

impl Database<Lock<By<device::Model, device::ModelId>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<device::Model, device::ModelId>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Select<By<Vec<Available<Device>>, device::ModelId>>>
    for Memory
{
    type Ok = Vec<Available<Device>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Available<Device>>, device::ModelId>>,
    ) -> Result<Self::Ok, Self::Err> {
        let model_id = by.into_inner();
        let mut available = self.with(|s| {
            s.devices
                .values()
                .filter(|d| d.model_id == model_id)
                .filter(|d| {
                    !s.orders.values().any(|o| {
                        !o.status.is_terminal() && o.has_device(d.id)
                    })
                })
                .cloned()
                .collect::<Vec<_>>()
        });
        available.sort_by_key(|d| d.id);
        Ok(available.into_iter().map(Available).collect())
    }
}

impl
    Database<
        Select<By<Option<Challenge>, (signature::Target, signature::Role)>>,
    > for Memory
{
    type Ok = Option<Challenge>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<Challenge>, (signature::Target, signature::Role)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let key = by.into_inner();
        Ok(self.with(|s| s.challenges.get(&key).cloned()))
    }
}

impl Database<Insert<Challenge>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(challenge): Insert<Challenge>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            drop(
                s.challenges
                    .insert((challenge.target, challenge.role), challenge),
            );
        });
        Ok(())
    }
}

impl Database<Delete<By<Challenge, signature::ConsumptionDateTime>>>
    for Memory
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Challenge, signature::ConsumptionDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();
        self.with(|s| {
            s.challenges
                .retain(|_, c| c.consumed_at.map_or(true, |at| at >= deadline));
        });
        Ok(())
    }
}

impl Database<Select<By<Option<Document>, Target>>> for Memory {
    type Ok = Option<Document>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Document>, Target>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.with(|s| match by.into_inner() {
            Target::Contract(id) => {
                s.contracts.get(&id).cloned().map(Into::into)
            }
            Target::HandoverReport(id) => {
                s.reports.get(&id).cloned().map(Into::into)
            }
            Target::Annex(id) => s.annexes.get(&id).cloned().map(Into::into),
        }))
    }
}

impl Database<Insert<Document>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(doc): Insert<Document>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| match doc {
            Document::Contract(c) => drop(s.contracts.insert(c.id, c)),
            Document::HandoverReport(r) => drop(s.reports.insert(r.id, r)),
            Document::Annex(a) => drop(s.annexes.insert(a.id, a)),
        });
        Ok(())
    }
}

impl Database<Lock<By<Document, Target>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Document, Target>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}
