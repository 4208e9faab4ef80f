//! # Mock Gateway
//!
//! Scripted [`OrderGateway`] for exercising sessions without a backend.
//!
//! Responses are queued per operation (and per order or user). Each call consumes the front of its
//! queue, except the last response, which repeats for every later call. That matches how polling
//! keeps reading the same backend state until it changes.
//!
//! # Example
//! ```ignore
//! let mock = MockGateway::new();
//! mock.expect_list("u1".into()).return_ok(vec![]);
//! mock.expect_create()
//!     .after(Duration::from_millis(500))
//!     .return_ok(CreateOrderReceipt::default());
//!
//! let gateway: Arc<dyn OrderGateway> = Arc::new(mock.clone());
//! // Drive a session...
//! mock.verify(); // Every scripted response was served and no call went unanswered
//! ```

use crate::gateway::{GatewayError, OrderGateway};
use crate::model::{CreateOrder, CreateOrderReceipt, Order, OrderId, OrderSummary, UserId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A call observed by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Create(CreateOrder),
    Get(OrderId),
    List(UserId),
    Cancel { order_id: OrderId, user_id: UserId },
}

struct Scripted<T> {
    response: Result<T, GatewayError>,
    delay: Option<Duration>,
    served: bool,
}

struct Script<T>(VecDeque<Scripted<T>>);

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self(VecDeque::new())
    }
}

impl<T: Clone> Script<T> {
    fn next(&mut self) -> Option<(Result<T, GatewayError>, Option<Duration>)> {
        if self.0.len() > 1 {
            let scripted = self.0.pop_front()?;
            return Some((scripted.response, scripted.delay));
        }
        let last = self.0.front_mut()?;
        last.served = true;
        Some((last.response.clone(), last.delay))
    }

    fn unserved(&self) -> usize {
        self.0.iter().filter(|s| !s.served).count()
    }
}

#[derive(Default)]
struct MockState {
    creates: Script<CreateOrderReceipt>,
    orders: HashMap<OrderId, Script<Order>>,
    lists: HashMap<UserId, Script<Vec<OrderSummary>>>,
    cancels: HashMap<OrderId, Script<()>>,
    calls: Vec<GatewayCall>,
    unexpected: Vec<GatewayCall>,
}

/// A gateway with expectation tracking for fluent testing.
///
/// Clones share the same script and call log.
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    /// Creates a new mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    /// Scripts the next `create_order` response.
    pub fn expect_create(&self) -> ExpectationBuilder<CreateOrderReceipt> {
        let state = self.state.clone();
        ExpectationBuilder::new(move |scripted| {
            lock(&state).creates.0.push_back(scripted);
        })
    }

    /// Scripts the next `get_order` response for `order_id`.
    pub fn expect_get(&self, order_id: OrderId) -> ExpectationBuilder<Order> {
        let state = self.state.clone();
        ExpectationBuilder::new(move |scripted| {
            lock(&state)
                .orders
                .entry(order_id)
                .or_default()
                .0
                .push_back(scripted);
        })
    }

    /// Scripts the next `list_orders` response for `user_id`.
    pub fn expect_list(&self, user_id: UserId) -> ExpectationBuilder<Vec<OrderSummary>> {
        let state = self.state.clone();
        ExpectationBuilder::new(move |scripted| {
            lock(&state)
                .lists
                .entry(user_id)
                .or_default()
                .0
                .push_back(scripted);
        })
    }

    /// Scripts the next `cancel_order` response for `order_id`.
    pub fn expect_cancel(&self, order_id: OrderId) -> ExpectationBuilder<()> {
        let state = self.state.clone();
        ExpectationBuilder::new(move |scripted| {
            lock(&state)
                .cancels
                .entry(order_id)
                .or_default()
                .0
                .push_back(scripted);
        })
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.count(|c| matches!(c, GatewayCall::Create(_)))
    }

    pub fn get_calls(&self) -> usize {
        self.count(|c| matches!(c, GatewayCall::Get(_)))
    }

    pub fn list_calls(&self) -> usize {
        self.count(|c| matches!(c, GatewayCall::List(_)))
    }

    pub fn cancel_calls(&self) -> usize {
        self.count(|c| matches!(c, GatewayCall::Cancel { .. }))
    }

    fn count(&self, pred: impl Fn(&GatewayCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Verifies that every scripted response was served and no call arrived unscripted.
    pub fn verify(&self) {
        let state = self.lock();
        if !state.unexpected.is_empty() {
            panic!("Unexpected gateway calls: {:?}", state.unexpected);
        }
        let remaining = state.creates.unserved()
            + state.orders.values().map(Script::unserved).sum::<usize>()
            + state.lists.values().map(Script::unserved).sum::<usize>()
            + state.cancels.values().map(Script::unserved).sum::<usize>();
        if remaining > 0 {
            panic!("Not all expectations were met. {remaining} remaining");
        }
    }

    async fn serve<T: Clone + Send>(
        &self,
        call: GatewayCall,
        pick: impl FnOnce(&mut MockState) -> Option<&mut Script<T>>,
    ) -> Result<T, GatewayError> {
        let next = {
            let mut state = self.lock();
            state.calls.push(call.clone());
            let next = pick(&mut *state).and_then(Script::next);
            if next.is_none() {
                state.unexpected.push(call.clone());
            }
            next
        };

        let Some((response, delay)) = next else {
            return Err(GatewayError::Transport(format!("unscripted call: {call:?}")));
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builder for one scripted response.
pub struct ExpectationBuilder<T> {
    delay: Option<Duration>,
    push: Box<dyn FnOnce(Scripted<T>) + Send>,
}

impl<T> ExpectationBuilder<T> {
    fn new(push: impl FnOnce(Scripted<T>) + Send + 'static) -> Self {
        Self {
            delay: None,
            push: Box::new(push),
        }
    }

    /// Holds the response back for `delay` before returning it.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: T) {
        self.finish(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: GatewayError) {
        self.finish(Err(error));
    }

    fn finish(self, response: Result<T, GatewayError>) {
        (self.push)(Scripted {
            response,
            delay: self.delay,
            served: false,
        });
    }
}

#[async_trait]
impl OrderGateway for MockGateway {
    async fn create_order(&self, request: CreateOrder) -> Result<CreateOrderReceipt, GatewayError> {
        self.serve(GatewayCall::Create(request), |s| Some(&mut s.creates))
            .await
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Order, GatewayError> {
        self.serve(GatewayCall::Get(order_id.clone()), |s| {
            s.orders.get_mut(order_id)
        })
        .await
    }

    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<OrderSummary>, GatewayError> {
        self.serve(GatewayCall::List(user_id.clone()), |s| s.lists.get_mut(user_id))
            .await
    }

    async fn cancel_order(&self, order_id: &OrderId, user_id: &UserId) -> Result<(), GatewayError> {
        let call = GatewayCall::Cancel {
            order_id: order_id.clone(),
            user_id: user_id.clone(),
        };
        self.serve(call, |s| s.cancels.get_mut(order_id)).await
    }
}
