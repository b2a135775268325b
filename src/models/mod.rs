pub mod event;
pub mod payment;

pub use event::{Event, NewEvent, TransferLeg};
pub use payment::{NewPayment, Payment, PaymentRecord, PurchaseKind};
