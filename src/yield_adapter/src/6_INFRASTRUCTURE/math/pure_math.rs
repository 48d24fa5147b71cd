//! Pure mathematical functions - no I/O, no async
//! All functions here must be deterministic and side-effect free

use candid::Nat;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use crate::infrastructure::errors::{Result, AdapterError, CalculationError};

/// Zero as a Nat
pub fn nat_zero() -> Nat {
    Nat::from(0u64)
}

pub fn is_zero(n: &Nat) -> bool {
    n.0.is_zero()
}

/// Multiply two Nats and divide by a third with arbitrary precision
/// Formula: (a × b) ÷ c, rounded down
pub fn multiply_and_divide(a: &Nat, b: &Nat, c: &Nat) -> Result<Nat> {
    if is_zero(c) {
        return Err(AdapterError::Calculation(CalculationError::DivisionByZero {
            operation: format!("({} × {}) ÷ {}", a, b, c),
        }));
    }

    let result = (nat_to_biguint(a) * nat_to_biguint(b)) / nat_to_biguint(c);
    Ok(biguint_to_nat(result))
}

/// `a - b`, floored at zero
pub fn saturating_sub(a: &Nat, b: &Nat) -> Nat {
    if b >= a {
        nat_zero()
    } else {
        Nat(nat_to_biguint(a) - nat_to_biguint(b))
    }
}

/// Convert a Nat to u64, erroring if it does not fit
pub fn nat_to_u64(n: &Nat, operation: &str) -> Result<u64> {
    n.0.to_u64().ok_or_else(|| {
        AdapterError::Calculation(CalculationError::Overflow {
            operation: format!("{}: {} exceeds u64", operation, n),
        })
    })
}

// ===== Helper Functions =====

fn nat_to_biguint(nat: &Nat) -> BigUint {
    nat.0.clone()
}

fn biguint_to_nat(big: BigUint) -> Nat {
    Nat::from(big)
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply_and_divide() {
        let result = multiply_and_divide(&Nat::from(100u64), &Nat::from(200u64), &Nat::from(50u64)).unwrap();
        assert_eq!(result, Nat::from(400u64));
    }

    #[test]
    fn test_division_by_zero() {
        let result = multiply_and_divide(&Nat::from(100u64), &Nat::from(200u64), &Nat::from(0u64));
        assert!(matches!(result, Err(AdapterError::Calculation(CalculationError::DivisionByZero { .. }))));
    }

    #[test]
    fn test_large_value_multiplication() {
        // 1e18-scaled exchange rates overflow u64 in the intermediate product
        let shares = Nat::from(u64::MAX);
        let rate = Nat::from(2_000_000_000_000_000_000u128);
        let scale = Nat::from(1_000_000_000_000_000_000u128);

        let result = multiply_and_divide(&shares, &rate, &scale).unwrap();
        assert!(result > Nat::from(u64::MAX));
    }

    #[test]
    fn test_multiply_and_divide_rounds_down() {
        // (3 * 7) / 2 = 10
        let result = multiply_and_divide(&Nat::from(3u64), &Nat::from(7u64), &Nat::from(2u64)).unwrap();
        assert_eq!(result, Nat::from(10u64));
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        assert_eq!(saturating_sub(&Nat::from(10u64), &Nat::from(4u64)), Nat::from(6u64));
        assert_eq!(saturating_sub(&Nat::from(4u64), &Nat::from(10u64)), Nat::from(0u64));
        assert_eq!(saturating_sub(&Nat::from(4u64), &Nat::from(4u64)), Nat::from(0u64));
    }

    #[test]
    fn test_nat_to_u64_overflow() {
        let big = Nat::from(u128::MAX);
        assert!(nat_to_u64(&big, "t").is_err());
        assert_eq!(nat_to_u64(&Nat::from(7u64), "t").unwrap(), 7);
    }
}
