//! Admin Controls Module
//!
//! Owner / Vault authorization and the owner action log.
//!
//! Security Note: the Vault is the only principal allowed to move capital
//! through the adapter; the Owner is the only principal allowed to
//! reconfigure routing, reassign the Vault or transfer ownership.

use candid::{CandidType, Deserialize, Principal};
use std::cell::RefCell;
use crate::infrastructure::{Result, AdapterError, AuthorizationError, ValidationError};
use crate::infrastructure::constants::MAX_ADMIN_LOG_ENTRIES;
use crate::types::CallContext;

/// Who may do what on one adapter
#[derive(CandidType, Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct AccessState {
    pub owner: Principal,
    pub vault: Principal,
}

/// Admin action log entry
#[derive(CandidType, Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct AdminAction {
    pub timestamp: u64,
    pub admin: Principal,
    pub action: String,
}

#[derive(Debug)]
pub struct AccessControl {
    state: RefCell<AccessState>,
    log: RefCell<Vec<AdminAction>>,
}

impl AccessControl {
    pub fn new(owner: Principal, vault: Principal) -> Self {
        Self::restore(AccessState { owner, vault }, Vec::new())
    }

    pub fn restore(state: AccessState, log: Vec<AdminAction>) -> Self {
        Self {
            state: RefCell::new(state),
            log: RefCell::new(log),
        }
    }

    pub fn owner(&self) -> Principal {
        self.state.borrow().owner
    }

    pub fn vault(&self) -> Principal {
        self.state.borrow().vault
    }

    pub fn snapshot(&self) -> AccessState {
        self.state.borrow().clone()
    }

    /// Require caller is the registered Vault
    pub fn require_vault(&self, caller: &Principal) -> Result<()> {
        if *caller == self.vault() {
            Ok(())
        } else {
            Err(AdapterError::Authorization(AuthorizationError::NotVault { caller: *caller }))
        }
    }

    /// Require caller is the Owner
    pub fn require_owner(&self, caller: &Principal) -> Result<()> {
        if *caller == self.owner() {
            Ok(())
        } else {
            Err(AdapterError::Authorization(AuthorizationError::NotOwner { caller: *caller }))
        }
    }

    /// Reassign the Vault (owner only). Returns the previous Vault.
    pub fn set_vault(&self, ctx: &CallContext, new_vault: Principal) -> Result<Principal> {
        self.require_owner(&ctx.caller)?;
        reject_anonymous(&new_vault, "vault")?;

        let previous = std::mem::replace(&mut self.state.borrow_mut().vault, new_vault);
        self.log_admin_action(ctx, format!("SET_VAULT {} -> {}", previous, new_vault));
        Ok(previous)
    }

    /// Transfer ownership (owner only). Returns the previous Owner.
    pub fn transfer_ownership(&self, ctx: &CallContext, new_owner: Principal) -> Result<Principal> {
        self.require_owner(&ctx.caller)?;
        reject_anonymous(&new_owner, "owner")?;

        let previous = std::mem::replace(&mut self.state.borrow_mut().owner, new_owner);
        self.log_admin_action(ctx, format!("TRANSFER_OWNERSHIP {} -> {}", previous, new_owner));
        Ok(previous)
    }

    /// Log an admin action
    pub fn log_admin_action(&self, ctx: &CallContext, action: String) {
        let mut log = self.log.borrow_mut();

        log.push(AdminAction {
            timestamp: ctx.now,
            admin: ctx.caller,
            action: action.clone(),
        });

        // Keep only the most recent entries
        let len = log.len();
        if len > MAX_ADMIN_LOG_ENTRIES {
            log.drain(0..(len - MAX_ADMIN_LOG_ENTRIES));
        }

        tracing::info!(admin = %ctx.caller, action = %action, "admin action");
    }

    /// Get admin action log (owner only)
    pub fn admin_log(&self, caller: &Principal) -> Result<Vec<AdminAction>> {
        self.require_owner(caller)?;
        Ok(self.log.borrow().clone())
    }

    pub fn export_log(&self) -> Vec<AdminAction> {
        self.log.borrow().clone()
    }
}

/// Reject the anonymous principal for a role that must be accountable
pub fn reject_anonymous(principal: &Principal, role: &str) -> Result<()> {
    if *principal == Principal::anonymous() {
        return Err(AdapterError::Validation(ValidationError::InvalidPrincipal {
            principal: *principal,
            role: role.to_string(),
        }));
    }
    Ok(())
}
