pub mod operation;
pub mod payment;
pub mod user;

pub use operation::{Direction, OperationKind, OperationRecord, MAX_AMOUNT};
pub use payment::{PaymentMethod, PaymentState, PendingPayment};
pub use user::UserProfile;
