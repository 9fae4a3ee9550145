use crate::config::SimulatorConfig;
use crate::domain::clock::{ClockRef, SystemClock};
use crate::domain::money::Money;
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{PaymentGateway, PaymentStoreBox};
use crate::error::{Entity, OrderError, Result};
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{info, instrument, warn};

const TOKEN_LEN: usize = 10;

/// Stand-in for an external payment processor.
///
/// Every call sleeps for the configured latency. Charges then succeed with the
/// configured probability and are persisted as `COMPLETED` payments; declined
/// charges persist nothing.
pub struct PaymentSimulator<R = StdRng> {
    payments: PaymentStoreBox,
    rng: Mutex<R>,
    clock: ClockRef,
    latency: Duration,
    success_rate: f64,
    sequence: AtomicU64,
}

impl PaymentSimulator<StdRng> {
    /// Creates a simulator seeded from `config.seed`, or from OS entropy.
    pub fn new(payments: PaymentStoreBox, config: &SimulatorConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(payments, config, rng, Arc::new(SystemClock))
    }
}

impl<R: RngCore + Send + 'static> PaymentSimulator<R> {
    pub fn with_rng(
        payments: PaymentStoreBox,
        config: &SimulatorConfig,
        rng: R,
        clock: ClockRef,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            payments,
            rng: Mutex::new(rng),
            clock,
            latency: config.latency,
            success_rate: config.success_rate,
            sequence: AtomicU64::new(0),
        })
    }

    /// Decides the outcome of a charge and draws the random part of its token.
    fn roll(&self) -> (bool, String) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let approved = rng.gen_bool(self.success_rate);
        let token = (&mut *rng)
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        (approved, token)
    }

    /// `mock_<millis>_<sequence>_<random>`: the clock and the per-simulator
    /// sequence keep ids apart within one process, the random part across
    /// processes.
    fn transaction_id(&self, token: &str) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "mock_{}_{}_{}",
            self.clock.now().timestamp_millis(),
            sequence,
            token
        )
    }
}

#[async_trait]
impl<R: RngCore + Send + 'static> PaymentGateway for PaymentSimulator<R> {
    #[instrument(skip(self))]
    async fn process_payment(
        &self,
        order_id: u64,
        amount: Money,
        currency: &str,
        payment_method: &str,
    ) -> Result<Payment> {
        tokio::time::sleep(self.latency).await;

        let (approved, token) = self.roll();
        if !approved {
            warn!(order_id, "Payment declined by processor");
            return Err(OrderError::PaymentDeclined(format!(
                "charge of {amount} {currency} for order {order_id} was declined"
            )));
        }

        let payment = Payment {
            id: self.payments.next_id().await?,
            order_id,
            amount,
            refunded: Money::ZERO,
            currency: currency.to_string(),
            status: PaymentStatus::Completed,
            payment_method: payment_method.to_string(),
            transaction_id: self.transaction_id(&token),
            created_at: self.clock.now(),
        };
        self.payments.store(payment.clone()).await?;

        info!(payment_id = payment.id, order_id, "Payment processed successfully");
        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn refund_payment(&self, payment_id: u64, amount: Money) -> Result<Payment> {
        tokio::time::sleep(self.latency).await;

        let mut payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or(OrderError::NotFound {
                entity: Entity::Payment,
                id: payment_id,
            })?;
        payment.record_refund(amount);
        self.payments.store(payment.clone()).await?;

        info!(payment_id, %amount, "Payment refunded successfully");
        Ok(payment)
    }
}
