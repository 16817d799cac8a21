//! Test fixtures driving a [`Service`] over the in-memory infrastructure.

use std::time::Duration;

use common::{money::Currency, DateTime, Money};

use crate::{
    command::{
        confirm_order, create_order, ActivateOrder, ConfirmDelivery,
        ConfirmOrder, CreateHandoverReport, CreateOrder,
        ScheduleLogisticsTask, SendSignaturePin, SignWithPin,
        TransitLogisticsTask, UpsertSettlement,
    },
    domain::{
        device, handover, logistics, order,
        settlement::Fees,
        signature::{Blob, Target},
        user, Device, Order, Settlement, User,
    },
    infra::{database::memory::State, Memory, Outbox},
    task, Command as _, Config, Service,
};

/// Secret the [`Service`] verifies session tokens with.
pub(crate) const JWT_SECRET: &[u8] = b"secret";

/// One day.
pub(crate) const DAY: Duration = Duration::from_secs(86_400);

/// Returns the provided amount of Vietnamese Dong.
pub(crate) fn vnd(amount: i64) -> Money {
    Money {
        amount,
        currency: Currency::Vnd,
    }
}

/// Returns the [`DateTime`] the provided number of days later than now.
pub(crate) fn in_days(days: u32) -> DateTime {
    DateTime::now() + days * DAY
}

/// Creates a [`Service`] over the provided in-memory [`State`].
pub(crate) fn service(state: State) -> Service<Memory, Outbox> {
    Service {
        config: Config {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                JWT_SECRET,
            ),
            purge_signature_pins: task::purge_signature_pins::Config {
                interval: Duration::from_secs(60),
                retention: DAY,
            },
        },
        database: Memory::new(state),
        notifier: Outbox::default(),
    }
}

/// [`Service`] with a staff member, a customer and a stocked device
/// [`device::Model`].
#[derive(Debug)]
pub(crate) struct Fixture {
    pub(crate) service: Service<Memory, Outbox>,
    pub(crate) staff: User,
    pub(crate) customer: User,
    pub(crate) model: device::Model,
}

impl Fixture {
    /// Creates a new [`Fixture`] having the provided number of [`Device`]s
    /// of its [`device::Model`] in stock.
    ///
    /// A [`Device`] rents for 100 000 VND per day, holding a deposit of
    /// 1 000 000 VND.
    pub(crate) fn new(devices: usize) -> Self {
        let model = device::Model {
            id: device::ModelId::new(),
            name: device::ModelName::new("Camera").unwrap(),
            price_per_day: vnd(100_000),
            value: vnd(2_000_000),
            deposit_percent: "50".parse().unwrap(),
        };
        let staff = user(user::Role::Staff);
        let customer = user(user::Role::Customer);

        let mut state = State::default();
        for u in [&staff, &customer] {
            drop(state.users.insert(u.id, u.clone()));
        }
        for n in 0..devices {
            let device = Device {
                id: device::Id::new(),
                model_id: model.id,
                serial_number: device::SerialNumber::new(format!("CAM-{n}"))
                    .unwrap(),
                created_at: DateTime::now().coerce(),
            };
            drop(state.devices.insert(device.id, device));
        }
        drop(state.models.insert(model.id, model.clone()));

        Self {
            service: service(state),
            staff,
            customer,
            model,
        }
    }

    /// Adds the provided [`device::Model`] to the catalog.
    pub(crate) fn with_model(self, model: device::Model) -> Self {
        self.service
            .database()
            .with(|s| drop(s.models.insert(model.id, model)));
        self
    }

    /// Returns the [`Outbox`] capturing issued PINs.
    pub(crate) fn outbox(&self) -> &Outbox {
        self.service.notifier()
    }

    /// Registers one more customer.
    pub(crate) fn add_customer(&self) -> User {
        self.add_user(user::Role::Customer)
    }

    /// Registers one more staff member.
    pub(crate) fn add_staff(&self) -> User {
        self.add_user(user::Role::Staff)
    }

    fn add_user(&self, role: user::Role) -> User {
        let u = user(role);
        self.service
            .database()
            .with(|s| drop(s.users.insert(u.id, u.clone())));
        u
    }

    /// Places an [`Order`] of the provided quantity of [`Fixture::model`]
    /// starting now and lasting the provided number of days.
    pub(crate) async fn place_order(
        &self,
        quantity: i32,
        days: u32,
    ) -> Order {
        let now = DateTime::now();
        self.service
            .execute(CreateOrder {
                customer_id: self.customer.id,
                items: vec![create_order::Item {
                    model_id: self.model.id,
                    quantity: order::Quantity::new(quantity).unwrap(),
                }],
                start_at: now.coerce(),
                end_at: (now + days * DAY).coerce(),
            })
            .await
            .unwrap()
    }

    /// Confirms the provided [`Order`] by [`Fixture::staff`].
    pub(crate) async fn confirm(
        &self,
        order_id: order::Id,
    ) -> confirm_order::Output {
        self.service
            .execute(ConfirmOrder {
                order_id,
                initiator_id: self.staff.id,
            })
            .await
            .unwrap()
    }

    /// Places and confirms a three-day [`Order`].
    pub(crate) async fn confirmed_order(
        &self,
        quantity: i32,
    ) -> confirm_order::Output {
        let order = self.place_order(quantity, 3).await;
        self.confirm(order.id).await
    }

    /// Signs the provided [`Target`] by the provided [`User`] with the PIN
    /// delivered to them.
    pub(crate) async fn sign(&self, target: Target, signer: &User) {
        let contact = self
            .service
            .execute(SendSignaturePin {
                target,
                signer_id: signer.id,
            })
            .await
            .unwrap();
        let pin = self.outbox().last_pin(&contact).unwrap();
        _ = self
            .service
            .execute(SignWithPin {
                target,
                signer_id: signer.id,
                pin,
                blob: Blob::new(format!("signed by {}", signer.name)).unwrap(),
            })
            .await
            .unwrap();
    }

    /// Drives a new [`Order`] up to [`order::Status::DeliveryConfirmed`].
    pub(crate) async fn delivered_order(
        &self,
        quantity: i32,
        days: u32,
    ) -> Order {
        let order = self.place_order(quantity, days).await;
        let confirmed = self.confirm(order.id).await;
        self.sign(Target::Contract(confirmed.contract.id), &self.customer)
            .await;

        let report = self
            .service
            .execute(CreateHandoverReport {
                order_id: order.id,
                initiator_id: self.staff.id,
                phase: handover::Phase::Checkout,
                observations: vec![],
            })
            .await
            .unwrap();
        self.sign(Target::HandoverReport(report.id), &self.staff).await;
        self.sign(Target::HandoverReport(report.id), &self.customer).await;

        self.service
            .execute(ConfirmDelivery {
                order_id: order.id,
                initiator_id: self.staff.id,
            })
            .await
            .unwrap()
    }

    /// Drives a new [`Order`] up to [`order::Status::InUse`].
    pub(crate) async fn order_in_use(
        &self,
        quantity: i32,
        days: u32,
    ) -> Order {
        let order = self.delivered_order(quantity, days).await;
        self.service
            .execute(ActivateOrder {
                order_id: order.id,
                initiator_id: self.staff.id,
            })
            .await
            .unwrap()
    }

    /// Records a completed pickup of the provided [`Order`]'s devices.
    pub(crate) async fn complete_pickup(&self, order_id: order::Id) {
        let task = self
            .service
            .execute(ScheduleLogisticsTask {
                order_id,
                initiator_id: self.staff.id,
                category: logistics::Category::Pickup,
            })
            .await
            .unwrap();
        _ = self
            .service
            .execute(TransitLogisticsTask {
                task_id: task.id,
                initiator_id: self.staff.id,
                status: logistics::Status::Completed,
            })
            .await
            .unwrap();
    }

    /// Drives a new [`Order`] up to [`order::Status::InUse`] with its
    /// devices picked up.
    pub(crate) async fn returned_order(
        &self,
        quantity: i32,
        days: u32,
    ) -> Order {
        let order = self.order_in_use(quantity, days).await;
        self.complete_pickup(order.id).await;
        order
    }

    /// Creates a [`Settlement`] of a single-device returned [`Order`] with
    /// the provided damage fee.
    pub(crate) async fn settlement(&self, damage: i64) -> Settlement {
        let order = self.returned_order(1, 3).await;
        self.service
            .execute(UpsertSettlement {
                order_id: order.id,
                initiator_id: self.staff.id,
                fees: Fees {
                    damage: vnd(damage),
                    ..Fees::zero(Currency::Vnd)
                },
            })
            .await
            .unwrap()
    }
}

/// Creates a new [`User`] with the provided [`user::Role`] reachable by both
/// email and phone.
fn user(role: user::Role) -> User {
    let id = user::Id::new();
    User {
        id,
        name: user::Name::new(format!("{role} {id}")).unwrap(),
        role,
        email: user::Email::new(format!("{id}@rental.test")),
        phone: user::Phone::new("091-234-5678"),
        created_at: DateTime::now().coerce(),
    }
}
