//! Billing engine: sequential invoice numbering and payment recording.
//!
//! A payment reactivates its membership, gets stamped with a gapless
//! invoice number, and feeds the revenue order stream. Data stored in
//! DashMap (development); swap to PostgreSQL for production.

pub mod recorder;
pub mod sequencer;

pub use recorder::{PaymentRecorder, RecordPaymentRequest};
pub use sequencer::{normalize_invoice_numbers, InvoiceSequencer};
