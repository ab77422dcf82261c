pub mod commission;
pub mod referral_service;

pub use commission::{LevelBreakdown, LevelPayouts, ReferralGraph};
pub use referral_service::{DynReferralService, ReferralService, ReferralServiceTrait};
