pub mod withdrawal_service;

pub use withdrawal_service::{DynWithdrawalService, WithdrawalService, WithdrawalServiceTrait};
