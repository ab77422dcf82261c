pub mod flutterwave;
pub mod payment_service;

pub use flutterwave::{DynPaymentGateway, FlutterwaveClient, PaymentGatewayTrait};
pub use payment_service::{DynPaymentService, PaymentService, PaymentServiceTrait, PaymentSettings};
