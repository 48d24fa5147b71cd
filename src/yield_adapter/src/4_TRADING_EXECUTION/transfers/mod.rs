//! # Outbound Transfers
//!
//! Payouts to the Vault or a Vault-designated recipient, and refunds that
//! return transient balances when an operation is unwound.
//!
//! ICRC ledgers charge the fee on top of the amount sent, so a payout of
//! `amount` from a balance of exactly `amount` delivers `amount − fee`.

use candid::{Nat, Principal};
use crate::_3_VENUES::TokenLedger;
use crate::infrastructure::{Result, nat_zero, saturating_sub};

/// Send `amount` (gross, fee included) of `token` to `recipient`
///
/// Returns the delivered amount. Amounts that would not cover the fee are
/// kept and reported as zero.
pub async fn pay_out<L: TokenLedger + ?Sized>(
    ledger: &L,
    token: Principal,
    recipient: Principal,
    amount: &Nat,
) -> Result<Nat> {
    let fee = ledger.fee(token).await?;
    if *amount <= fee {
        if *amount > nat_zero() {
            tracing::warn!(%token, %amount, %fee, "payout does not cover ledger fee; keeping dust");
        }
        return Ok(nat_zero());
    }

    let delivered = saturating_sub(amount, &fee);
    let block = ledger.transfer(token, recipient, delivered.clone()).await?;

    tracing::info!(%token, %recipient, %delivered, %block, "payout sent");
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use crate::testkit::{p, World};

    #[test]
    fn test_payout_nets_fee() {
        let world = World::new();
        world.set_fee(p(1), 10);
        world.mint(p(1), p(50), 1_000);
        let handle = world.handle(p(50));

        let delivered = block_on(pay_out(&handle, p(1), p(60), &Nat::from(1_000u64))).unwrap();

        assert_eq!(delivered, Nat::from(990u64));
        assert_eq!(world.balance_of(p(1), p(60)), 990);
        assert_eq!(world.balance_of(p(1), p(50)), 0);
    }

    #[test]
    fn test_dust_below_fee_is_not_sent() {
        let world = World::new();
        world.set_fee(p(1), 10);
        world.mint(p(1), p(50), 10);
        let handle = world.handle(p(50));

        let delivered = block_on(pay_out(&handle, p(1), p(60), &Nat::from(10u64))).unwrap();

        assert_eq!(delivered, Nat::from(0u64));
        assert!(world.transfers().is_empty());
    }
}
