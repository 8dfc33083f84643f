//! # Re-entrancy Tests
//!
//! Most tests here use a recipient that runs code while being paid and
//! calls back into the settlement from inside [`ValueTransfer::pay`]. The
//! callback must be rejected with `ReentrantCall`, the outer call must
//! finish normally, and value must be paid exactly once. The last tests
//! check that calls from other threads wait for a payout in progress.

use std::sync::{Arc, Barrier, Weak};
use std::time::Duration as StdDuration;

use acp_escrow::{AccountBook, EscrowSettlement, TransferError, ValueTransfer};
use acp_types::*;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

type Callback = Box<dyn Fn(&EscrowSettlement) -> Result<()> + Send + Sync>;

/// An [`AccountBook`] whose `pay` runs a callback when `hooked` is paid.
struct HookedTransfer {
    book: AccountBook,
    hooked: Address,
    settlement: Mutex<Weak<EscrowSettlement>>,
    callback: Mutex<Option<Callback>>,
    /// Outcomes of every callback, in order.
    reentries: Mutex<Vec<Result<()>>>,
}

impl HookedTransfer {
    fn new(hooked: Address) -> Self {
        Self {
            book: AccountBook::new(),
            hooked,
            settlement: Mutex::new(Weak::new()),
            callback: Mutex::new(None),
            reentries: Mutex::new(Vec::new()),
        }
    }

    fn on_paid(&self, callback: impl Fn(&EscrowSettlement) -> Result<()> + Send + Sync + 'static) {
        *self.callback.lock() = Some(Box::new(callback));
    }
}

impl ValueTransfer for HookedTransfer {
    fn lock(&self, from: &Address, amount: Decimal) -> std::result::Result<(), TransferError> {
        self.book.lock(from, amount)
    }

    fn pay(&self, to: &Address, amount: Decimal) -> std::result::Result<(), TransferError> {
        if *to == self.hooked {
            let settlement = self.settlement.lock().upgrade();
            let callback = self.callback.lock().take();
            if let (Some(settlement), Some(callback)) = (settlement, callback) {
                let outcome = callback(&settlement);
                self.reentries.lock().push(outcome);
                *self.callback.lock() = Some(callback);
            }
        }
        self.book.pay(to, amount)
    }

    fn custody_balance(&self) -> Decimal {
        self.book.custody_balance()
    }
}

struct Setup {
    transfer: Arc<HookedTransfer>,
    settlement: Arc<EscrowSettlement>,
    buyer: Address,
    provider: Address,
}

/// The provider is the party that runs code when paid.
fn setup() -> Setup {
    let buyer = Address::random();
    let provider = Address::random();
    let transfer = Arc::new(HookedTransfer::new(provider));
    transfer.book.deposit(buyer, Decimal::ONE);
    transfer.book.deposit(provider, Decimal::ONE);

    let dyn_transfer: Arc<dyn ValueTransfer> = transfer.clone();
    let settlement = Arc::new(EscrowSettlement::new(EscrowConfig::default(), dyn_transfer).unwrap());
    *transfer.settlement.lock() = Arc::downgrade(&settlement);

    Setup {
        transfer,
        settlement,
        buyer,
        provider,
    }
}

fn open(s: &Setup, amount: Decimal) -> EscrowId {
    let now = Utc::now();
    s.settlement
        .open(
            &CallContext::new(s.buyer, now).with_value(amount),
            s.provider,
            now + Duration::hours(1),
            JobHash::of_str("job"),
        )
        .unwrap()
}

// =============================================================================
// ATTACK: provider refunds the escrow it is being paid for
// =============================================================================

/// Without protection the buyer would get the value back while the
/// provider keeps the release payout.
#[test]
fn callback_refund_during_release_rejected() {
    let s = setup();
    let amount = Decimal::new(5, 3);
    let id = open(&s, amount);

    let provider = s.provider;
    s.transfer
        .on_paid(move |settlement| settlement.refund(&CallContext::at_now(provider), id));

    s.settlement
        .release(&CallContext::at_now(s.buyer), id)
        .unwrap();

    let reentries = s.transfer.reentries.lock();
    assert_eq!(reentries.len(), 1);
    assert!(matches!(reentries[0], Err(AcpError::ReentrantCall)));

    assert_eq!(s.settlement.get_escrow(id).unwrap().state, EscrowState::Released);
    assert_eq!(s.transfer.book.balance(&s.buyer), Decimal::ONE - amount);
    assert_eq!(s.transfer.book.balance(&s.provider), Decimal::ONE + amount);
    s.settlement.verify_custody().unwrap();
}

// =============================================================================
// ATTACK: provider opens a fresh escrow from inside the payout
// =============================================================================
#[test]
fn callback_open_during_release_rejected() {
    let s = setup();
    let id = open(&s, Decimal::new(1, 3));

    let provider = s.provider;
    let victim = s.buyer;
    s.transfer.on_paid(move |settlement| {
        let now = Utc::now();
        settlement
            .open(
                &CallContext::new(provider, now).with_value(Decimal::new(1, 3)),
                victim,
                now + Duration::hours(1),
                JobHash::of_str("nested"),
            )
            .map(|_| ())
    });

    s.settlement
        .release(&CallContext::at_now(s.buyer), id)
        .unwrap();

    assert!(matches!(
        s.transfer.reentries.lock()[0],
        Err(AcpError::ReentrantCall)
    ));
    assert_eq!(s.settlement.escrow_count(), 1);
    s.settlement.verify_custody().unwrap();
}

// =============================================================================
// Guard is released once the outer call returns
// =============================================================================
#[test]
fn guard_released_after_outer_call() {
    let s = setup();
    let first = open(&s, Decimal::new(1, 3));
    let provider = s.provider;
    s.transfer
        .on_paid(move |settlement| settlement.refund(&CallContext::at_now(provider), first));

    s.settlement
        .refund(&CallContext::at_now(s.provider), first)
        .unwrap();
    // The provider is not paid by a refund; the callback never ran.
    assert!(s.transfer.reentries.lock().is_empty());

    let second = open(&s, Decimal::new(2, 3));
    s.settlement
        .release(&CallContext::at_now(s.buyer), second)
        .unwrap();
    let third = open(&s, Decimal::new(3, 3));

    assert!(s.settlement.is_active(third).unwrap());
    assert_eq!(s.settlement.escrow_count(), 3);
    assert_eq!(s.transfer.reentries.lock().len(), 1);
}

// =============================================================================
// Calls from other threads wait instead of failing
// =============================================================================
#[test]
fn concurrent_releases_all_settle() {
    let s = setup();
    let ids: Vec<EscrowId> = (0..16).map(|_| open(&s, Decimal::new(1, 3))).collect();

    let handles: Vec<_> = ids
        .chunks(4)
        .map(|chunk| {
            let settlement = Arc::clone(&s.settlement);
            let buyer = s.buyer;
            let chunk = chunk.to_vec();
            std::thread::spawn(move || {
                for id in chunk {
                    settlement
                        .release(&CallContext::at_now(buyer), id)
                        .expect("concurrent release must wait, not fail");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(s.settlement.active_count(), 0);
    assert_eq!(s.settlement.custody_balance(), Decimal::ZERO);
    assert_eq!(
        s.transfer.book.balance(&s.provider),
        Decimal::ONE + Decimal::new(16, 3)
    );
    s.settlement.verify_custody().unwrap();
}

// =============================================================================
// Custody check never sees a payout between custody and the books
// =============================================================================

/// An [`AccountBook`] whose `pay` lingers after the value left custody.
struct SlowTransfer {
    book: AccountBook,
    paid: Barrier,
}

impl ValueTransfer for SlowTransfer {
    fn lock(&self, from: &Address, amount: Decimal) -> std::result::Result<(), TransferError> {
        self.book.lock(from, amount)
    }

    fn pay(&self, to: &Address, amount: Decimal) -> std::result::Result<(), TransferError> {
        self.book.pay(to, amount)?;
        self.paid.wait();
        std::thread::sleep(StdDuration::from_millis(50));
        Ok(())
    }

    fn custody_balance(&self) -> Decimal {
        self.book.custody_balance()
    }
}

#[test]
fn custody_check_waits_for_payout_in_progress() {
    let buyer = Address::random();
    let provider = Address::random();
    let transfer = Arc::new(SlowTransfer {
        book: AccountBook::new(),
        paid: Barrier::new(2),
    });
    transfer.book.deposit(buyer, Decimal::ONE);
    let dyn_transfer: Arc<dyn ValueTransfer> = transfer.clone();
    let settlement = Arc::new(EscrowSettlement::new(EscrowConfig::default(), dyn_transfer).unwrap());

    let now = Utc::now();
    let id = settlement
        .open(
            &CallContext::new(buyer, now).with_value(Decimal::new(5, 3)),
            provider,
            now + Duration::hours(1),
            JobHash::of_str("job"),
        )
        .unwrap();

    let releasing = {
        let settlement = Arc::clone(&settlement);
        std::thread::spawn(move || settlement.release(&CallContext::at_now(buyer), id))
    };

    // The value has left custody but the payout is not booked yet.
    transfer.paid.wait();
    settlement
        .verify_custody()
        .expect("custody check must wait for the payout to be booked");

    releasing.join().unwrap().unwrap();
    assert_eq!(transfer.book.balance(&provider), Decimal::new(5, 3));
    settlement.verify_custody().unwrap();
}

#[test]
fn custody_check_from_inside_payout_rejected() {
    let s = setup();
    let id = open(&s, Decimal::new(1, 3));
    s.transfer.on_paid(EscrowSettlement::verify_custody);

    s.settlement
        .release(&CallContext::at_now(s.buyer), id)
        .unwrap();

    assert!(matches!(
        s.transfer.reentries.lock()[0],
        Err(AcpError::ReentrantCall)
    ));
    s.settlement.verify_custody().unwrap();
}
