//! Payment service trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use common::{InvoiceId, Money, PaymentId, TenantId};

use crate::context::SagaContext;
use crate::error::SagaError;
use crate::services::call_log::CallLog;

/// Status reported for a successful charge.
pub const PAYMENT_STATUS_SUCCESS: &str = "success";

/// Status reported for a declined charge.
pub const PAYMENT_STATUS_FAILED: &str = "failed";

/// Charge request for an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub invoice_id: InvoiceId,
    pub tenant_id: TenantId,
    pub amount: Money,
    pub currency: String,
}

/// What the payment service answered.
///
/// A declined charge is a normal answer, not a transport error: `status` is
/// something other than [`PAYMENT_STATUS_SUCCESS`] and `error_message`
/// explains why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub payment_id: Option<PaymentId>,
    pub status: String,
    pub error_message: Option<String>,
}

impl PaymentOutcome {
    /// Returns true if the status is the success marker (case-insensitive).
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case(PAYMENT_STATUS_SUCCESS)
    }
}

/// Operations of the payment service used by the sagas.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges an invoice.
    async fn process_payment(
        &self,
        ctx: &SagaContext,
        request: PaymentRequest,
    ) -> Result<PaymentOutcome, SagaError>;
}

#[derive(Debug)]
struct InMemoryPaymentState {
    payments: HashMap<PaymentId, PaymentRequest>,
    next_id: i64,
    decline: Option<String>,
    failing: HashSet<&'static str>,
    calls: CallLog,
}

impl Default for InMemoryPaymentState {
    fn default() -> Self {
        Self {
            payments: HashMap::new(),
            next_id: 1,
            decline: None,
            failing: HashSet::new(),
            calls: CallLog::new(),
        }
    }
}

/// In-memory payment service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service recording its calls into `calls`.
    pub fn with_call_log(calls: CallLog) -> Self {
        let service = Self::new();
        service.write().calls = calls;
        service
    }

    /// Makes every subsequent call to `operation` fail with a transport error.
    pub fn fail_on(&self, operation: &'static str) {
        self.write().failing.insert(operation);
    }

    /// Declines every subsequent charge with the given message.
    pub fn decline_with(&self, message: impl Into<String>) {
        self.write().decline = Some(message.into());
    }

    /// Sets the ID the next accepted payment receives.
    pub fn set_next_payment_id(&self, id: i64) {
        self.write().next_id = id;
    }

    /// Returns the number of accepted payments.
    pub fn payment_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .payments
            .len()
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryPaymentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn process_payment(
        &self,
        ctx: &SagaContext,
        request: PaymentRequest,
    ) -> Result<PaymentOutcome, SagaError> {
        if ctx.is_cancelled() {
            return Err(SagaError::Cancelled);
        }

        let mut state = self.write();
        state
            .calls
            .record(format!("payment.process_payment:{}", request.invoice_id));

        if state.failing.contains("process_payment") {
            return Err(SagaError::Payment("process_payment unavailable".to_string()));
        }

        if let Some(message) = state.decline.clone() {
            return Ok(PaymentOutcome {
                payment_id: None,
                status: PAYMENT_STATUS_FAILED.to_string(),
                error_message: Some(message),
            });
        }

        let payment_id = PaymentId::new(state.next_id);
        state.next_id += 1;
        state.payments.insert(payment_id, request);

        Ok(PaymentOutcome {
            payment_id: Some(payment_id),
            status: PAYMENT_STATUS_SUCCESS.to_string(),
            error_message: None,
        })
    }
}
