// Business logic services
pub mod drive;
pub mod jwt;
pub mod ledger;
pub mod media_gen;
pub mod nets;
pub mod paypal;
pub mod subscription;

pub use drive::DriveClient;
pub use jwt::{JwtError, JwtService};
pub use ledger::{ChargeSource, GateDecision, LedgerService};
pub use media_gen::{MediaGenClient, MediaGenError};
pub use nets::NetsClient;
pub use paypal::PayPalClient;
pub use subscription::{Plan, PlanCatalog, SubscriptionService};
