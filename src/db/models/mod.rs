pub mod entitlement;
pub mod quota;

pub use entitlement::Entitlement;
pub use quota::QuotaRecord;
