pub mod bonus_entry;
pub mod contact_claim;
pub mod member;
pub mod order_record;
pub mod referral_code;
pub mod referral_config;
pub mod referral_roster;

pub use bonus_entry::*;
pub use contact_claim::*;
pub use member::*;
pub use order_record::*;
pub use referral_code::*;
pub use referral_config::*;
pub use referral_roster::*;
